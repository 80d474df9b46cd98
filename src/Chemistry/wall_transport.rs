//! # Wall transport
//!
//! ## Aim
//! First-order loss frequency of a species diffusing to the chamber wall where it sticks with
//! probability γ. The diffusion length Λ follows from the fundamental mode of the diffusion
//! equation with a Robin (partially absorbing) boundary condition
//!
//!   h = γ_tot·v_th / (2(2 − γ_tot)·D),   D = D_red / N,   v_th = sqrt(8 k_B T / (π m))
//!
//! - infinite cylinder (length 0): x·J1(x) = R·h·J0(x), x in (0, j01), Λ_r = R / x
//! - infinite slab (radius 0):     x·sin(x) = (L/2)·h·cos(x), x in (0, π/2), Λ_z = L / (2x)
//! - finite cylinder:              1/Λ² = 1/Λ_r² + 1/Λ_z²
//!
//! and the rate coefficient of one transport channel is k = (γ/γ_tot)·D_red / (N·Λ²).
//!
//! ## Main data structures
//! - `WallTransport`: evaluator of one `wallTransport` reaction (γ and temperature reference)
//! - `WallTransportCache`: engine-owned cache of the first zero of J0 and of the total
//!   sticking probability of each species, computed on first use
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::Chemistry::numerics::{bessel_j0, bessel_j1, find_root, first_bessel_zero};
use crate::Chemistry::reaction::{RateCoeffParam, Reaction};
use crate::Chemistry::state_graph::{StateGraph, StateId};
use crate::Chemistry::working_conditions::{TemperatureRef, WorkingConditions};
use crate::constants::K_B;
use log::debug;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

pub const WALL_TRANSPORT: &str = "wallTransport";
/// temperatures a wall transport reaction may refer to
pub const WALL_TEMPERATURES: [&str; 3] = ["gasTemperature", "nearWallTemperature", "wallTemperature"];
/// distance kept from the singular end of the root brackets
const BRACKET_EPSILON: f64 = 1e-12;
const ROOT_TOLERANCE: f64 = 1e-15;
const ROOT_MAX_ITER: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct WallTransportCache {
    first_bessel_zero: Option<f64>,
    total_sticking: HashMap<StateId, f64>,
    /// number of total sticking probabilities actually summed (not served from the cache)
    pub total_sticking_evaluations: usize,
}

impl WallTransportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_bessel_zero(&mut self) -> Result<f64, ChemistryError> {
        if let Some(j01) = self.first_bessel_zero {
            return Ok(j01);
        }
        let j01 = first_bessel_zero()?;
        self.first_bessel_zero = Some(j01);
        Ok(j01)
    }

    /// Sum of the sticking probabilities of every transport reaction destroying `state`.
    /// All of them must be of the wall transport type and the sum must lie in (0, 1].
    pub fn total_sticking(
        &mut self,
        graph: &StateGraph,
        reactions: &[Reaction],
        state: StateId,
    ) -> Result<f64, ChemistryError> {
        if let Some(total) = self.total_sticking.get(&state) {
            return Ok(*total);
        }
        let name = &graph.state(state).name;
        let mut total = 0.0;
        for id in &graph.state(state).reactions_destruction {
            let reaction = &reactions[*id];
            if !reaction.is_transport {
                continue;
            }
            if reaction.reaction_type != WALL_TRANSPORT {
                return Err(ConfigError::InconsistentTransportType {
                    reaction: reaction.description.clone(),
                    state: name.clone(),
                    expected: WALL_TRANSPORT.to_owned(),
                    found: reaction.reaction_type.clone(),
                }
                .into());
            }
            total += sticking_probability(reaction)?;
        }
        if !(total > 0.0 && total <= 1.0) {
            return Err(ConfigError::TotalStickingOutOfRange {
                state: name.clone(),
                value: total,
            }
            .into());
        }
        self.total_sticking_evaluations += 1;
        debug!("total sticking probability of {}: {}", name, total);
        self.total_sticking.insert(state, total);
        Ok(total)
    }
}

fn sticking_probability(reaction: &Reaction) -> Result<f64, ChemistryError> {
    let gamma = reaction
        .rate_coeff_params
        .first()
        .and_then(RateCoeffParam::as_number)
        .ok_or_else(|| ConfigError::InvalidParameters {
            reaction: reaction.description.clone(),
            reason: "the first parameter must be the sticking probability".to_owned(),
        })?;
    if !(gamma > 0.0 && gamma <= 1.0) {
        return Err(ConfigError::StickingProbabilityOutOfRange {
            reaction: reaction.description.clone(),
            value: gamma,
        }
        .into());
    }
    Ok(gamma)
}

/// mean thermal speed sqrt(8 k_B T / (π m)), m/s
pub fn thermal_velocity(temperature: f64, mass: f64) -> f64 {
    (8.0 * K_B * temperature / (PI * mass)).sqrt()
}

/// Squared diffusion length of the chamber for the Robin coefficient `h` (1/m).
/// A zero length means an infinite cylinder, a zero radius an infinite slab.
pub fn diffusion_length_squared(
    radius: f64,
    length: f64,
    h: f64,
    j01: f64,
) -> Result<f64, ChemistryError> {
    let radial = if radius > 0.0 {
        let rh = radius * h;
        let x = find_root(
            |x| x * bessel_j1(x) - rh * bessel_j0(x),
            0.0,
            j01 - BRACKET_EPSILON,
            ROOT_TOLERANCE,
            ROOT_MAX_ITER,
            "radial diffusion length",
        )?
        .x;
        Some((radius / x).powi(2))
    } else {
        None
    };
    let axial = if length > 0.0 {
        let half_lh = 0.5 * length * h;
        let x = find_root(
            |x| x * x.sin() - half_lh * x.cos(),
            0.0,
            FRAC_PI_2 - BRACKET_EPSILON,
            ROOT_TOLERANCE,
            ROOT_MAX_ITER,
            "axial diffusion length",
        )?
        .x;
        Some((length / (2.0 * x)).powi(2))
    } else {
        None
    };
    match (radial, axial) {
        (Some(r2), Some(z2)) => Ok(1.0 / (1.0 / r2 + 1.0 / z2)),
        (Some(r2), None) => Ok(r2),
        (None, Some(z2)) => Ok(z2),
        (None, None) => Err(ChemistryError::Numerics {
            context: "diffusion length".to_owned(),
            reason: "chamber radius and length are both zero".to_owned(),
        }),
    }
}

/// evaluator of one `wallTransport` reaction: `[stickingProbability, temperatureName]`
#[derive(Debug, Clone, PartialEq)]
pub struct WallTransport {
    pub sticking: f64,
    pub temperature: TemperatureRef,
}

impl WallTransport {
    pub fn from_reaction(reaction: &Reaction) -> Result<Self, ChemistryError> {
        let invalid = |reason: &str| ConfigError::InvalidParameters {
            reaction: reaction.description.clone(),
            reason: reason.to_owned(),
        };
        if !reaction.is_transport {
            return Err(invalid("wall transport needs a 'wall' reactant").into());
        }
        if reaction.reactants.len() != 1 {
            return Err(invalid("wall transport needs exactly one species lost to the wall").into());
        }
        let sticking = sticking_probability(reaction)?;
        let name = reaction
            .rate_coeff_params
            .get(1)
            .and_then(RateCoeffParam::as_name)
            .ok_or_else(|| invalid("the second parameter must be a temperature name"))?;
        let temperature = TemperatureRef::from_name(name, &WALL_TEMPERATURES)?;
        Ok(Self {
            sticking,
            temperature,
        })
    }

    /// first-order loss frequency (1/s) of the reactant of `reaction`
    pub fn rate_coeff(
        &self,
        graph: &StateGraph,
        reactions: &[Reaction],
        reaction: &Reaction,
        conditions: &WorkingConditions,
        cache: &mut WallTransportCache,
    ) -> Result<f64, ChemistryError> {
        let (state, _) = reaction.reactants[0];
        let species = graph.state(state);
        let gas = graph.gas_of(state);
        let gamma_total = cache.total_sticking(graph, reactions, state)?;
        let j01 = cache.first_bessel_zero()?;

        let mass = gas
            .mass
            .ok_or_else(|| ChemistryError::data_missing(&gas.name, "mass"))?;
        let reduced_diffusion = species
            .reduced_diff_coeff
            .ok_or_else(|| ChemistryError::data_missing(&species.name, "reducedDiffCoeff"))?
            .evaluate(conditions.gas_temperature()?);
        let gas_density = conditions.gas_density()?;
        let radius = conditions.get("chamberRadius")?;
        let length = conditions.get("chamberLength")?;
        let temperature = self.temperature.resolve(conditions)?;

        let diffusion = reduced_diffusion / gas_density;
        let h = gamma_total * thermal_velocity(temperature, mass)
            / (2.0 * (2.0 - gamma_total) * diffusion);
        let lambda2 = diffusion_length_squared(radius, length, h, j01)?;
        Ok(self.sticking / gamma_total * reduced_diffusion / (gas_density * lambda2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::network_builder::build_reactions;
    use crate::Chemistry::reaction::ChemistryEntry;
    use crate::Chemistry::state_graph::ReducedDiffusion;
    use crate::constants::AMU;
    use approx::assert_relative_eq;

    const J01: f64 = 2.404825557695773;

    fn wall(equation: &str, gamma: f64, temperature: &str) -> ChemistryEntry {
        ChemistryEntry::new(
            equation,
            WALL_TRANSPORT,
            vec![
                RateCoeffParam::Number(gamma),
                RateCoeffParam::Name(temperature.to_string()),
            ],
        )
    }

    fn setup(entries: &[ChemistryEntry]) -> (StateGraph, Vec<Reaction>) {
        let mut graph = StateGraph::new();
        graph.add_gas("N", Some(14.0 * AMU));
        graph.add_gas("N2", Some(28.0 * AMU));
        let reactions = build_reactions(&mut graph, entries).unwrap();
        let n = graph.state_by_name("N(S)").unwrap();
        graph.state_mut(n).reduced_diff_coeff = Some(ReducedDiffusion::Constant(1.5e21));
        (graph, reactions)
    }

    fn conditions(radius: f64, length: f64) -> WorkingConditions {
        WorkingConditions {
            gas_temperature: Some(300.0),
            wall_temperature: Some(320.0),
            gas_density: Some(2.4e22),
            chamber_radius: Some(radius),
            chamber_length: Some(length),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_sticking_is_cached() {
        let (graph, reactions) = setup(&[
            wall("N(S) + wall -> 0.5N2(X)", 0.3, "wallTemperature"),
            wall("N(S) + wall -> N(S,v=0)", 0.2, "wallTemperature"),
        ]);
        let n = graph.state_by_name("N(S)").unwrap();
        let mut cache = WallTransportCache::new();
        assert_relative_eq!(cache.total_sticking(&graph, &reactions, n).unwrap(), 0.5);
        assert_relative_eq!(cache.total_sticking(&graph, &reactions, n).unwrap(), 0.5);
        assert_eq!(cache.total_sticking_evaluations, 1);

        let wc = conditions(0.01, 0.0);
        let k0 = WallTransport::from_reaction(&reactions[0])
            .unwrap()
            .rate_coeff(&graph, &reactions, &reactions[0], &wc, &mut cache)
            .unwrap();
        let k1 = WallTransport::from_reaction(&reactions[1])
            .unwrap()
            .rate_coeff(&graph, &reactions, &reactions[1], &wc, &mut cache)
            .unwrap();
        assert_relative_eq!(k0 / k1, 1.5, epsilon = 1e-12);
        assert_eq!(cache.total_sticking_evaluations, 1);
    }

    #[test]
    fn test_total_sticking_out_of_range() {
        let (graph, reactions) = setup(&[
            wall("N(S) + wall -> 0.5N2(X)", 0.7, "wallTemperature"),
            wall("N(S) + wall -> N(S,v=0)", 0.6, "wallTemperature"),
        ]);
        let n = graph.state_by_name("N(S)").unwrap();
        let err = WallTransportCache::new()
            .total_sticking(&graph, &reactions, n)
            .unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::TotalStickingOutOfRange { .. })
        ));

        let (graph, reactions) = setup(&[wall("N(S) + wall -> 0.5N2(X)", 0.0, "wallTemperature")]);
        let err = WallTransportCache::new()
            .total_sticking(&graph, &reactions, n)
            .unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::StickingProbabilityOutOfRange { .. })
        ));
        assert!(WallTransport::from_reaction(&reactions[0]).is_err());
    }

    #[test]
    fn test_inconsistent_transport_types() {
        let (graph, reactions) = setup(&[
            wall("N(S) + wall -> 0.5N2(X)", 0.3, "wallTemperature"),
            ChemistryEntry::new(
                "N(S) + wall -> N(S,v=0)",
                "constantRateCoeff",
                vec![RateCoeffParam::Number(10.0)],
            ),
        ]);
        let n = graph.state_by_name("N(S)").unwrap();
        let err = WallTransportCache::new()
            .total_sticking(&graph, &reactions, n)
            .unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::InconsistentTransportType { ref found, .. }) if found == "constantRateCoeff"
        ));
    }

    #[test]
    fn test_temperature_names() {
        let (_, reactions) = setup(&[
            wall("N(S) + wall -> 0.5N2(X)", 0.3, "electronTemperature"),
            wall("N(S) + wall -> N(S,v=0)", 0.3, "nearWallTemperature"),
        ]);
        let err = WallTransport::from_reaction(&reactions[0]).unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::UnknownTemperature { .. })
        ));
        assert_eq!(
            WallTransport::from_reaction(&reactions[1]).unwrap().temperature,
            TemperatureRef::NearWall
        );
    }

    #[test]
    fn test_diffusion_limited_cylinder() {
        let radius = 0.01;
        let lambda2 = diffusion_length_squared(radius, 0.0, 1e9, J01).unwrap();
        assert_relative_eq!(lambda2, (radius / J01).powi(2), max_relative = 1e-2);
    }

    #[test]
    fn test_surface_limited_cylinder() {
        let radius = 0.01;
        let h = 1e-3;
        let lambda2 = diffusion_length_squared(radius, 0.0, h, J01).unwrap();
        assert_relative_eq!(lambda2, radius / (2.0 * h), max_relative = 1e-3);
    }

    #[test]
    fn test_slab_and_finite_cylinder() {
        let length = 0.02;
        // diffusion limited slab: Λ = L/π
        let slab = diffusion_length_squared(0.0, length, 1e9, J01).unwrap();
        assert_relative_eq!(slab, (length / PI).powi(2), max_relative = 1e-2);
        let h = 50.0;
        let radial = diffusion_length_squared(0.01, 0.0, h, J01).unwrap();
        let axial = diffusion_length_squared(0.0, length, h, J01).unwrap();
        let finite = diffusion_length_squared(0.01, length, h, J01).unwrap();
        assert_relative_eq!(1.0 / finite, 1.0 / radial + 1.0 / axial, max_relative = 1e-10);
        assert!(diffusion_length_squared(0.0, 0.0, h, J01).is_err());
    }

    #[test]
    fn test_rate_coeff_matches_closed_form() {
        let (graph, reactions) = setup(&[wall("N(S) + wall -> 0.5N2(X)", 1e-4, "wallTemperature")]);
        let wc = conditions(0.01, 0.0);
        let mut cache = WallTransportCache::new();
        let k = WallTransport::from_reaction(&reactions[0])
            .unwrap()
            .rate_coeff(&graph, &reactions, &reactions[0], &wc, &mut cache)
            .unwrap();
        // surface limited: k ≈ γ v_th / (2(2-γ)) * 2 / R
        let v_th = thermal_velocity(320.0, 14.0 * AMU);
        let expected = 1e-4 * v_th / (2.0 * (2.0 - 1e-4)) * 2.0 / 0.01;
        assert_relative_eq!(k, expected, max_relative = 1e-2);
    }

    #[test]
    fn test_missing_data() {
        let (mut graph, reactions) = setup(&[wall("N(S) + wall -> 0.5N2(X)", 0.1, "wallTemperature")]);
        let evaluator = WallTransport::from_reaction(&reactions[0]).unwrap();
        let mut cache = WallTransportCache::new();
        let mut wc = conditions(0.01, 0.0);
        wc.chamber_radius = None;
        let err = evaluator
            .rate_coeff(&graph, &reactions, &reactions[0], &wc, &mut cache)
            .unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::MissingWorkingCondition(ref n)) if n == "chamberRadius"
        ));
        let n = graph.state_by_name("N(S)").unwrap();
        graph.state_mut(n).reduced_diff_coeff = None;
        let err = evaluator
            .rate_coeff(&graph, &reactions, &reactions[0], &conditions(0.01, 0.0), &mut cache)
            .unwrap_err();
        assert!(matches!(err, ChemistryError::DataMissing { ref field, .. } if field == "reducedDiffCoeff"));
    }
}
