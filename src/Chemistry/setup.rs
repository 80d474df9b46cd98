//! # Setup document
//!
//! One JSON document describing a chemistry job: declared gases, extra states, property
//! entries, reaction entries and the working conditions.
//!
//! ```json
//! {
//!   "gases": [{"name": "N2", "mass": 4.65e-26, "fraction": 1.0}],
//!   "states": ["N2(X,v=v[0:10])"],
//!   "properties": [{"target": "N2(X)", "property": "population", "value": 1.0}],
//!   "reactions": [{"equation": "N2(A) + wall -> N2(X)", "type": "wallTransport", "params": [1.0, "wallTemperature"]}],
//!   "workingConditions": {"gasTemperature": 300.0, "wallTemperature": 300.0}
//! }
//! ```
//! Property entries are applied after the network is built, so they may target states that
//! only appear in reactions.
use crate::Chemistry::chem_errors::{ChemistryError, ParseError};
use crate::Chemistry::chemistry::Chemistry;
use crate::Chemistry::properties::{PropertyEntry, apply_properties};
use crate::Chemistry::reaction::ChemistryEntry;
use crate::Chemistry::species_parser::{LevelExpr, Species, TemplateLabels, parse_term};
use crate::Chemistry::state_graph::{StateGraph, StateId};
use crate::Chemistry::working_conditions::WorkingConditions;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasEntry {
    pub name: String,
    /// kg
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemistrySetup {
    #[serde(default)]
    pub gases: Vec<GasEntry>,
    /// states to declare besides those named in reactions, ranges allowed (`N2(X,v=v[0:45])`)
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    #[serde(default)]
    pub reactions: Vec<ChemistryEntry>,
    #[serde(default)]
    pub working_conditions: WorkingConditions,
}

fn range_values(labels: &TemplateLabels, wanted: char) -> Vec<Option<u32>> {
    let range = labels
        .vibrational
        .iter()
        .chain(labels.rotational.iter())
        .find_map(|level| match level {
            LevelExpr::Range { var, start, end } if *var == wanted => Some((*start, *end)),
            _ => None,
        });
    match range {
        Some((start, end)) => (start..=end).map(Some).collect(),
        None => vec![None],
    }
}

/// declares the states named by `text`, expanding `v[a:b]` / `w[a:b]` ranges
pub fn declare_states(graph: &mut StateGraph, text: &str) -> Result<Vec<StateId>, ChemistryError> {
    let term = parse_term(text)?;
    let (gas, labels) = match &term.species {
        Species::State { gas, labels } => (gas, labels),
        _ => {
            return Err(ParseError::Grammar {
                text: text.to_owned(),
                expected: "a state of a declared gas".to_owned(),
            }
            .into());
        }
    };
    let mut ids = Vec::new();
    for v in range_values(labels, 'v') {
        for w in range_values(labels, 'w') {
            let concrete = labels.instantiate(v, w, text)?;
            ids.push(graph.add_state(gas, concrete.implied_type(), &concrete, None, None)?);
        }
    }
    Ok(ids)
}

impl ChemistrySetup {
    pub fn from_json_str(text: &str) -> Result<Self, ChemistryError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChemistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Builds the chemistry: gases, declared states, reaction network, properties. Populations
    /// are checked for normalisation and densities evaluated when the gas density is known.
    pub fn build(&self) -> Result<Chemistry, ChemistryError> {
        let mut graph = StateGraph::new();
        for gas in &self.gases {
            let id = graph.add_gas(&gas.name, gas.mass);
            graph.gas_mut(id).fraction = gas.fraction;
        }
        for text in &self.states {
            declare_states(&mut graph, text)?;
        }
        let mut chemistry = Chemistry::build(graph, &self.reactions)?;
        apply_properties(&mut chemistry.graph, &self.properties, &self.working_conditions)?;
        chemistry.graph.check_populations()?;
        if self.working_conditions.gas_density.is_some() {
            chemistry.update_densities(&self.working_conditions)?;
        }
        info!(
            "setup built: {} gases, {} states, {} reactions",
            chemistry.graph.gases.len(),
            chemistry.graph.len(),
            chemistry.reactions.len()
        );
        Ok(chemistry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::chem_errors::ConfigError;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SETUP: &str = r#"{
        "gases": [
            {"name": "N2", "mass": 4.6517e-26, "fraction": 0.9},
            {"name": "N", "mass": 2.3259e-26, "fraction": 0.1}
        ],
        "states": ["N2(X,v=v[0:3])"],
        "properties": [
            {"target": "N2", "property": "harmonicFrequency", "value": 4.4434e14},
            {"target": "N2", "property": "anharmonicFrequency", "value": 2.7e12},
            {"target": "N2(X)", "property": "population", "value": 1.0},
            {"target": "N(S)", "property": "population", "value": 1.0},
            {"target": "N(S)", "property": "reducedDiffCoeff", "value": 1.5e21},
            {"target": "N2(X,v=*)", "property": "energy", "value": {"function": "harmonicOscillatorEnergy"}},
            {"target": "N2(X,v=*)", "property": "statisticalWeight", "value": 1.0},
            {"target": "N2(X,v=*)", "property": "population", "value": {"function": "boltzmannPopulation", "params": ["gasTemperature"]}}
        ],
        "reactions": [
            {"equation": "N(S) + wall -> 0.5N2(X,v=0)", "type": "wallTransport", "params": [0.1, "wallTemperature"]},
            {"equation": "N2(X,v=v[1:3]) + N2(X,v=0) -> N2(X,v=v-1) + N2(X,v=0)", "type": "powerLaw", "params": [1e-22, 1.5, "gasTemperature"]}
        ],
        "workingConditions": {
            "gasTemperature": 300.0,
            "wallTemperature": 320.0,
            "gasDensity": 2.4e22,
            "chamberRadius": 0.01,
            "chamberLength": 0.0
        }
    }"#;

    #[test]
    fn test_build_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SETUP.as_bytes()).unwrap();
        let setup = ChemistrySetup::from_file(file.path()).unwrap();
        assert_eq!(setup.reactions.len(), 2);
        let mut chemistry = setup.build().unwrap();
        // N2(X) + 4 vibrational levels + N(S)
        assert_eq!(chemistry.graph.len(), 6);
        assert_eq!(chemistry.reactions.len(), 4);

        let ladder = chemistry.graph.expand_wildcard("N2(X,v=*)").unwrap();
        let sum: f64 = ladder.iter().map(|id| chemistry.graph.state(*id).population).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
        let n2x = chemistry.graph.state_by_name("N2(X)").unwrap();
        assert_relative_eq!(chemistry.graph.state(n2x).density, 0.9 * 2.4e22, max_relative = 1e-12);

        chemistry
            .evaluate_rate_coefficients(&setup.working_conditions, None)
            .unwrap();
        chemistry.compute_net_rates(&setup.working_conditions).unwrap();
        assert!(chemistry.reactions.iter().all(|r| r.net_rate.unwrap() > 0.0));
    }

    #[test]
    fn test_unnormalised_populations_are_rejected() {
        let mut setup = ChemistrySetup::from_json_str(SETUP).unwrap();
        setup.properties.retain(|p| p.target != "N(S)" || p.property != "population");
        let err = setup.build().unwrap_err();
        assert!(matches!(
            err,
            ChemistryError::Config(ConfigError::PopulationNotNormalised { ref state, .. }) if state == "N(S)"
        ));
    }

    #[test]
    fn test_declare_states() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let ids = declare_states(&mut graph, "N2(X,v=0,J=v[0:2])").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(graph.state(ids[2]).name, "N2(X,v=0,J=2)");
        assert!(declare_states(&mut graph, "wall").is_err());
        assert!(matches!(
            declare_states(&mut graph, "O2(X)").unwrap_err(),
            ChemistryError::UndeclaredGas(_)
        ));
    }
}
