//! # Gas and state property entries
//!
//! Property files deliver `target = value` or `target = function(params)` records. A target
//! is a gas name (`N2`) or a state name, possibly with a trailing wildcard (`N2(X,v=*)`).
//!
//! | property | target | value |
//! |---|---|---|
//! | `mass` (kg), `fraction`, `harmonicFrequency`, `anharmonicFrequency` (rad/s), `rotationalConstant` (eV) | gas | number |
//! | `energy` (eV) | state | number, `harmonicOscillatorEnergy`, `morseOscillatorEnergy`, `rigidRotorEnergy` |
//! | `statisticalWeight` | state | number, `rotationalDegeneracy` |
//! | `population` | state | number, `boltzmannPopulation`, `treanorPopulation`, `treanorGordietsPopulation` |
//! | `reducedDiffCoeff` (m^-1 s^-1) | state | number, `powerLaw [d_ref, t_ref, exponent]` |
//!
//! Entries are applied in order, so energies and weights have to precede population functions.
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::Chemistry::population::PopulationFunction;
use crate::Chemistry::reaction::RateCoeffParam;
use crate::Chemistry::state_graph::{ReducedDiffusion, StateGraph, StateId};
use crate::Chemistry::working_conditions::WorkingConditions;
use crate::constants::H_BAR_EV;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Function {
        function: String,
        #[serde(default)]
        params: Vec<RateCoeffParam>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub target: String,
    pub property: String,
    pub value: PropertyValue,
}

impl PropertyEntry {
    pub fn number(target: &str, property: &str, value: f64) -> Self {
        Self {
            target: target.to_owned(),
            property: property.to_owned(),
            value: PropertyValue::Number(value),
        }
    }

    pub fn function(target: &str, property: &str, function: &str, params: Vec<RateCoeffParam>) -> Self {
        Self {
            target: target.to_owned(),
            property: property.to_owned(),
            value: PropertyValue::Function {
                function: function.to_owned(),
                params,
            },
        }
    }

    fn unknown_property(&self) -> ChemistryError {
        ConfigError::UnknownProperty {
            target: self.target.clone(),
            property: self.property.clone(),
        }
        .into()
    }

    fn unknown_function(&self, function: &str) -> ChemistryError {
        ConfigError::UnknownFunction {
            property: self.property.clone(),
            function: function.to_owned(),
        }
        .into()
    }
}

fn gas_property(graph: &mut StateGraph, entry: &PropertyEntry) -> Result<(), ChemistryError> {
    let gas_id = graph.gas_id(&entry.target)?;
    let value = match &entry.value {
        PropertyValue::Number(x) => *x,
        PropertyValue::Function { function, .. } => return Err(entry.unknown_function(function)),
    };
    let gas = graph.gas_mut(gas_id);
    match entry.property.as_str() {
        "mass" => gas.mass = Some(value),
        "fraction" => gas.fraction = Some(value),
        "harmonicFrequency" => gas.harmonic_frequency = Some(value),
        "anharmonicFrequency" => gas.anharmonic_frequency = Some(value),
        "rotationalConstant" => gas.rotational_constant = Some(value),
        _ => return Err(entry.unknown_property()),
    }
    Ok(())
}

/// E = hbar*w*(v + 1/2)
fn harmonic_oscillator_energy(graph: &StateGraph, id: StateId) -> Result<f64, ChemistryError> {
    let v = graph.state(id).vib_number()? as f64;
    let gas = graph.gas_of(id);
    let w = gas
        .harmonic_frequency
        .ok_or_else(|| ChemistryError::data_missing(&gas.name, "harmonicFrequency"))?;
    Ok(H_BAR_EV * w * (v + 0.5))
}

/// E = hbar*w*(v + 1/2) - hbar*wx*(v + 1/2)^2
fn morse_oscillator_energy(graph: &StateGraph, id: StateId) -> Result<f64, ChemistryError> {
    let v = graph.state(id).vib_number()? as f64;
    let gas = graph.gas_of(id);
    let wx = gas
        .anharmonic_frequency
        .ok_or_else(|| ChemistryError::data_missing(&gas.name, "anharmonicFrequency"))?;
    Ok(harmonic_oscillator_energy(graph, id)? - H_BAR_EV * wx * (v + 0.5).powi(2))
}

/// E = B*J*(J + 1)
fn rigid_rotor_energy(graph: &StateGraph, id: StateId) -> Result<f64, ChemistryError> {
    let j = graph.state(id).rot_number()? as f64;
    let gas = graph.gas_of(id);
    let b = gas
        .rotational_constant
        .ok_or_else(|| ChemistryError::data_missing(&gas.name, "rotationalConstant"))?;
    Ok(b * j * (j + 1.0))
}

fn state_property(
    graph: &mut StateGraph,
    entry: &PropertyEntry,
    conditions: &WorkingConditions,
) -> Result<(), ChemistryError> {
    let targets = graph.expand_wildcard(&entry.target)?;
    match (entry.property.as_str(), &entry.value) {
        ("energy", PropertyValue::Number(x)) => {
            for id in targets {
                graph.state_mut(id).energy = Some(*x);
            }
        }
        ("energy", PropertyValue::Function { function, .. }) => {
            let f: fn(&StateGraph, StateId) -> Result<f64, ChemistryError> = match function.as_str() {
                "harmonicOscillatorEnergy" => harmonic_oscillator_energy,
                "morseOscillatorEnergy" => morse_oscillator_energy,
                "rigidRotorEnergy" => rigid_rotor_energy,
                _ => return Err(entry.unknown_function(function)),
            };
            for id in targets {
                let energy = f(graph, id)?;
                graph.state_mut(id).energy = Some(energy);
            }
        }
        ("statisticalWeight", PropertyValue::Number(x)) => {
            for id in targets {
                graph.state_mut(id).statistical_weight = Some(*x);
            }
        }
        ("statisticalWeight", PropertyValue::Function { function, .. }) => {
            if function != "rotationalDegeneracy" {
                return Err(entry.unknown_function(function));
            }
            for id in targets {
                let j = graph.state(id).rot_number()? as f64;
                graph.state_mut(id).statistical_weight = Some(2.0 * j + 1.0);
            }
        }
        ("population", PropertyValue::Number(x)) => {
            for id in targets {
                graph.state_mut(id).population = *x;
            }
        }
        ("population", PropertyValue::Function { function, params }) => {
            let closure = PopulationFunction::from_name(function, params)?;
            // one call per sibling group: the closure renormalises the whole group
            let mut done: HashSet<StateId> = HashSet::new();
            for id in targets {
                if done.contains(&id) {
                    continue;
                }
                closure.apply(graph, id, conditions)?;
                done.extend(graph.sibling_group(id));
            }
        }
        ("reducedDiffCoeff", PropertyValue::Number(x)) => {
            for id in targets {
                graph.state_mut(id).reduced_diff_coeff = Some(ReducedDiffusion::Constant(*x));
            }
        }
        ("reducedDiffCoeff", PropertyValue::Function { function, params }) => {
            let numbers: Vec<f64> = params.iter().filter_map(RateCoeffParam::as_number).collect();
            let model = match (function.as_str(), numbers.as_slice()) {
                ("powerLaw", [d_ref, t_ref, exponent]) if params.len() == 3 => ReducedDiffusion::PowerLaw {
                    d_ref: *d_ref,
                    t_ref: *t_ref,
                    exponent: *exponent,
                },
                _ => return Err(entry.unknown_function(function)),
            };
            for id in targets {
                graph.state_mut(id).reduced_diff_coeff = Some(model);
            }
        }
        _ => return Err(entry.unknown_property()),
    }
    Ok(())
}

/// applies one property entry to the graph
pub fn apply_property(
    graph: &mut StateGraph,
    entry: &PropertyEntry,
    conditions: &WorkingConditions,
) -> Result<(), ChemistryError> {
    if entry.target.contains('(') {
        state_property(graph, entry, conditions)
    } else {
        gas_property(graph, entry)
    }
}

/// applies every entry in order
pub fn apply_properties(
    graph: &mut StateGraph,
    entries: &[PropertyEntry],
    conditions: &WorkingConditions,
) -> Result<(), ChemistryError> {
    for entry in entries {
        apply_property(graph, entry, conditions)?;
    }
    info!("{} property entries applied", entries.len());
    Ok(())
}
