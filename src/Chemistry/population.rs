//! # Population closures
//!
//! Steady-state populations of a sibling group from macroscopic temperatures:
//! - `boltzmann`: g*exp(-(E-Emin)/kT) for any group
//! - `treanor`: non-Boltzmann vibrational ladder with a translational temperature `T0` and a
//!   vibrational (first level) temperature `T1`
//!   f(v) = g*exp(-(v*(E1-E0)*(1/T1 - 1/T0) + (E-E0)/T0)/k)
//! - `treanor_gordiets`: Treanor up to the crossover level
//!   vLimit = floor(0.5*(1 + (E1-E0)*T0/(hbar*w_anh*T1))), above it the exponential is frozen
//!   at its vLimit value and decays as vLimit/v
//!
//! Every closure renormalises the whole group to 1 and returns the population of the state
//! it was invoked on. Energies are in eV, temperatures in K.
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::Chemistry::reaction::RateCoeffParam;
use crate::Chemistry::state_graph::{StateGraph, StateId, StateType};
use crate::Chemistry::working_conditions::{TemperatureRef, WorkingConditions};
use crate::constants::{H_BAR_EV, K_B_EV};
use log::debug;

/// temperature names a population function accepts
pub const POPULATION_TEMPERATURES: [&str; 2] = ["gasTemperature", "electronTemperature"];

struct LadderLevel {
    id: StateId,
    v: u32,
    energy: f64,
    weight: f64,
}

fn vibrational_ladder(graph: &StateGraph, state: StateId) -> Result<Vec<LadderLevel>, ChemistryError> {
    let s = graph.state(state);
    if s.state_type != StateType::Vibrational {
        return Err(ChemistryError::InvalidStateType {
            state: s.name.clone(),
            expected: StateType::Vibrational.to_string(),
        });
    }
    graph
        .sibling_group(state)
        .into_iter()
        .map(|id| {
            let level = graph.state(id);
            Ok(LadderLevel {
                id,
                v: level.vib_number()?,
                energy: level.energy()?,
                weight: level.statistical_weight()?,
            })
        })
        .collect()
}

fn level_energy(graph: &StateGraph, ladder: &[LadderLevel], state: StateId, v: u32) -> Result<f64, ChemistryError> {
    ladder
        .iter()
        .find(|l| l.v == v)
        .map(|l| l.energy)
        .ok_or_else(|| {
            ChemistryError::data_missing(&graph.state(state).name, &format!("energy of level v={}", v))
        })
}

/// writes normalised weights into the group and returns the population of `state`
fn normalise(graph: &mut StateGraph, weights: &[(StateId, f64)], state: StateId) -> f64 {
    let norm: f64 = weights.iter().map(|(_, w)| w).sum();
    for (id, w) in weights {
        graph.state_mut(*id).population = w / norm;
    }
    graph.state(state).population
}

fn treanor_exponent(v: u32, energy: f64, e0: f64, e1: f64, t0: f64, t1: f64) -> f64 {
    -((v as f64) * (e1 - e0) * (1.0 / t1 - 1.0 / t0) + (energy - e0) / t0) / K_B_EV
}

/// Boltzmann distribution of the group of `state` at `temperature` (K)
pub fn boltzmann(graph: &mut StateGraph, state: StateId, temperature: f64) -> Result<f64, ChemistryError> {
    let group = graph.sibling_group(state);
    let mut levels = Vec::with_capacity(group.len());
    for id in group {
        let s = graph.state(id);
        levels.push((id, s.energy()?, s.statistical_weight()?));
    }
    let e_min = levels
        .iter()
        .map(|(_, e, _)| *e)
        .fold(f64::INFINITY, f64::min);
    let weights: Vec<(StateId, f64)> = levels
        .iter()
        .map(|(id, e, g)| (*id, g * (-(e - e_min) / (K_B_EV * temperature)).exp()))
        .collect();
    Ok(normalise(graph, &weights, state))
}

/// Treanor distribution of the vibrational group of `state`
pub fn treanor(graph: &mut StateGraph, state: StateId, t0: f64, t1: f64) -> Result<f64, ChemistryError> {
    let ladder = vibrational_ladder(graph, state)?;
    let e0 = level_energy(graph, &ladder, state, 0)?;
    let e1 = level_energy(graph, &ladder, state, 1)?;
    let weights: Vec<(StateId, f64)> = ladder
        .iter()
        .map(|l| (l.id, l.weight * treanor_exponent(l.v, l.energy, e0, e1, t0, t1).exp()))
        .collect();
    Ok(normalise(graph, &weights, state))
}

/// Treanor-Gordiets distribution of the vibrational group of `state`
pub fn treanor_gordiets(
    graph: &mut StateGraph,
    state: StateId,
    t0: f64,
    t1: f64,
) -> Result<f64, ChemistryError> {
    let ladder = vibrational_ladder(graph, state)?;
    let gas = graph.gas_of(state);
    let anharmonic = gas
        .anharmonic_frequency
        .ok_or_else(|| ChemistryError::data_missing(&gas.name, "anharmonicFrequency"))?;
    let e0 = level_energy(graph, &ladder, state, 0)?;
    let e1 = level_energy(graph, &ladder, state, 1)?;
    let v_limit = (0.5 * (1.0 + (e1 - e0) * t0 / (H_BAR_EV * anharmonic * t1))).floor() as u32;
    debug!(
        "Treanor-Gordiets crossover for {}: vLimit = {}",
        graph.state(state).name,
        v_limit
    );
    let max_v = ladder.iter().map(|l| l.v).max().unwrap_or(0);
    let frozen = if max_v > v_limit {
        let e_limit = level_energy(graph, &ladder, state, v_limit)?;
        treanor_exponent(v_limit, e_limit, e0, e1, t0, t1).exp()
    } else {
        0.0
    };
    let weights: Vec<(StateId, f64)> = ladder
        .iter()
        .map(|l| {
            let w = if l.v <= v_limit {
                l.weight * treanor_exponent(l.v, l.energy, e0, e1, t0, t1).exp()
            } else {
                l.weight * frozen * v_limit as f64 / l.v as f64
            };
            (l.id, w)
        })
        .collect();
    Ok(normalise(graph, &weights, state))
}

/// population function referenced by name from a property entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PopulationFunction {
    Boltzmann { temperature: TemperatureRef },
    Treanor { t0: TemperatureRef, t1: TemperatureRef },
    TreanorGordiets { t0: TemperatureRef, t1: TemperatureRef },
}

fn temperature_param(param: &RateCoeffParam) -> Result<TemperatureRef, ConfigError> {
    match param {
        RateCoeffParam::Number(t) => Ok(TemperatureRef::Value(*t)),
        RateCoeffParam::Name(name) => TemperatureRef::from_name(name, &POPULATION_TEMPERATURES),
    }
}

impl PopulationFunction {
    /// `boltzmannPopulation [T]`, `treanorPopulation [T0, T1]`,
    /// `treanorGordietsPopulation [T0, T1]`
    pub fn from_name(name: &str, params: &[RateCoeffParam]) -> Result<Self, ConfigError> {
        let arity = |n: usize| -> Result<(), ConfigError> {
            if params.len() == n {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameters {
                    reaction: name.to_owned(),
                    reason: format!("expected {} temperature(s), got {}", n, params.len()),
                })
            }
        };
        match name {
            "boltzmannPopulation" => {
                arity(1)?;
                Ok(PopulationFunction::Boltzmann {
                    temperature: temperature_param(&params[0])?,
                })
            }
            "treanorPopulation" => {
                arity(2)?;
                Ok(PopulationFunction::Treanor {
                    t0: temperature_param(&params[0])?,
                    t1: temperature_param(&params[1])?,
                })
            }
            "treanorGordietsPopulation" => {
                arity(2)?;
                Ok(PopulationFunction::TreanorGordiets {
                    t0: temperature_param(&params[0])?,
                    t1: temperature_param(&params[1])?,
                })
            }
            _ => Err(ConfigError::UnknownFunction {
                property: "population".to_owned(),
                function: name.to_owned(),
            }),
        }
    }

    pub fn apply(
        &self,
        graph: &mut StateGraph,
        state: StateId,
        conditions: &WorkingConditions,
    ) -> Result<f64, ChemistryError> {
        match self {
            PopulationFunction::Boltzmann { temperature } => {
                boltzmann(graph, state, temperature.resolve(conditions)?)
            }
            PopulationFunction::Treanor { t0, t1 } => {
                treanor(graph, state, t0.resolve(conditions)?, t1.resolve(conditions)?)
            }
            PopulationFunction::TreanorGordiets { t0, t1 } => {
                treanor_gordiets(graph, state, t0.resolve(conditions)?, t1.resolve(conditions)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::state_graph::StateLabels;
    use approx::assert_relative_eq;

    /// N2(X) ladder with anharmonic energies E = 0.2924 v - 0.00177 v(v+1)
    fn ladder(max_v: u32) -> (StateGraph, Vec<StateId>) {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        graph.gas_mut(0).anharmonic_frequency = Some(2.0 * 0.00177 / H_BAR_EV);
        let ids = (0..=max_v)
            .map(|v| {
                let vf = v as f64;
                graph
                    .add_state(
                        "N2",
                        StateType::Vibrational,
                        &StateLabels::vibrational("X", &v.to_string()),
                        Some(0.2924 * vf - 0.00177 * vf * (vf + 1.0)),
                        Some(1.0),
                    )
                    .unwrap()
            })
            .collect();
        (graph, ids)
    }

    fn group_sum(graph: &StateGraph, ids: &[StateId]) -> f64 {
        ids.iter().map(|id| graph.state(*id).population).sum()
    }

    #[test]
    fn test_treanor_is_normalised() {
        let (mut graph, ids) = ladder(10);
        let p = treanor(&mut graph, ids[3], 300.0, 3000.0).unwrap();
        assert_relative_eq!(group_sum(&graph, &ids), 1.0, epsilon = 1e-12);
        assert_eq!(p, graph.state(ids[3]).population);
    }

    #[test]
    fn test_treanor_equal_temperatures_is_boltzmann() {
        let (mut graph, ids) = ladder(8);
        treanor(&mut graph, ids[0], 1500.0, 1500.0).unwrap();
        let treanor_pops: Vec<f64> = ids.iter().map(|id| graph.state(*id).population).collect();

        let energies: Vec<f64> = ids.iter().map(|id| graph.state(*id).energy.unwrap()).collect();
        let raw: Vec<f64> = energies
            .iter()
            .map(|e| (-(e - energies[0]) / 1500.0 / K_B_EV).exp())
            .collect();
        let norm: f64 = raw.iter().sum();
        for (p, r) in treanor_pops.iter().zip(raw.iter()) {
            assert_relative_eq!(*p, r / norm, epsilon = 1e-14);
        }
        // the boltzmann closure gives the same group
        boltzmann(&mut graph, ids[2], 1500.0).unwrap();
        for (id, p) in ids.iter().zip(treanor_pops.iter()) {
            assert_relative_eq!(graph.state(*id).population, *p, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_treanor_overpopulates_high_levels() {
        let (mut graph, ids) = ladder(10);
        treanor(&mut graph, ids[0], 300.0, 3000.0).unwrap();
        let treanor_top = graph.state(ids[10]).population;
        boltzmann(&mut graph, ids[0], 3000.0).unwrap();
        assert!(treanor_top > graph.state(ids[10]).population);
    }

    #[test]
    fn test_treanor_gordiets_below_crossover_equals_treanor() {
        let (mut graph, ids) = ladder(5);
        // T0 == T1: vLimit = floor(0.5*(1 + 0.28886/0.00354)) = 41 > 5
        treanor(&mut graph, ids[1], 300.0, 300.0).unwrap();
        let expected: Vec<f64> = ids.iter().map(|id| graph.state(*id).population).collect();
        treanor_gordiets(&mut graph, ids[1], 300.0, 300.0).unwrap();
        for (id, p) in ids.iter().zip(expected.iter()) {
            assert_relative_eq!(graph.state(*id).population, *p, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_treanor_gordiets_tail() {
        let (mut graph, ids) = ladder(8);
        // vLimit = floor(0.5*(1 + 0.28886*300/(0.00354*3000))) = 4
        treanor_gordiets(&mut graph, ids[0], 300.0, 3000.0).unwrap();
        assert_relative_eq!(group_sum(&graph, &ids), 1.0, epsilon = 1e-12);
        let p4 = graph.state(ids[4]).population;
        for v in 5..=8 {
            assert_relative_eq!(
                graph.state(ids[v]).population,
                p4 * 4.0 / v as f64,
                epsilon = 1e-14
            );
        }
        // below the crossover the ratios are the Treanor ones
        let (mut plain, plain_ids) = ladder(8);
        treanor(&mut plain, plain_ids[0], 300.0, 3000.0).unwrap();
        let ratio = graph.state(ids[2]).population / graph.state(ids[1]).population;
        let plain_ratio = plain.state(plain_ids[2]).population / plain.state(plain_ids[1]).population;
        assert_relative_eq!(ratio, plain_ratio, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_data() {
        let (mut graph, ids) = ladder(3);
        graph.state_mut(ids[2]).statistical_weight = None;
        let err = treanor(&mut graph, ids[0], 300.0, 2000.0).unwrap_err();
        assert!(matches!(err, ChemistryError::DataMissing { ref field, .. } if field == "statisticalWeight"));

        let (mut graph, ids) = ladder(3);
        graph.gas_mut(0).anharmonic_frequency = None;
        let err = treanor_gordiets(&mut graph, ids[0], 300.0, 2000.0).unwrap_err();
        assert!(matches!(err, ChemistryError::DataMissing { ref field, .. } if field == "anharmonicFrequency"));

        let x = graph.state_by_name("N2(X)").unwrap();
        let err = treanor(&mut graph, x, 300.0, 2000.0).unwrap_err();
        assert!(matches!(err, ChemistryError::InvalidStateType { .. }));
    }

    #[test]
    fn test_ground_level_must_exist() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let ids: Vec<StateId> = (1..=3)
            .map(|v| {
                graph
                    .add_state(
                        "N2",
                        StateType::Vibrational,
                        &StateLabels::vibrational("X", &v.to_string()),
                        Some(0.29 * v as f64),
                        Some(1.0),
                    )
                    .unwrap()
            })
            .collect();
        let err = treanor(&mut graph, ids[0], 300.0, 2000.0).unwrap_err();
        assert!(matches!(err, ChemistryError::DataMissing { .. }));
    }

    #[test]
    fn test_population_function_registry() {
        let (mut graph, ids) = ladder(4);
        let mut conditions = WorkingConditions::new();
        conditions.gas_temperature = Some(400.0);
        let f = PopulationFunction::from_name(
            "treanorPopulation",
            &[
                RateCoeffParam::Name("gasTemperature".to_string()),
                RateCoeffParam::Number(2500.0),
            ],
        )
        .unwrap();
        let p = f.apply(&mut graph, ids[1], &conditions).unwrap();
        let (mut direct, direct_ids) = ladder(4);
        assert_relative_eq!(p, treanor(&mut direct, direct_ids[1], 400.0, 2500.0).unwrap());

        assert!(matches!(
            PopulationFunction::from_name(
                "treanorPopulation",
                &[RateCoeffParam::Name("wallTemperature".to_string()), RateCoeffParam::Number(1.0)]
            ),
            Err(ConfigError::UnknownTemperature { .. })
        ));
        assert!(PopulationFunction::from_name("boltzmannPopulation", &[]).is_err());
        assert!(PopulationFunction::from_name("saha", &[]).is_err());
    }
}
