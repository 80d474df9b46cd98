//! # State graph
//!
//! ## Aim
//! Hierarchical species model: gas → electronic (or ionic) → vibrational → rotational states.
//!
//! ## Main data structures and logic
//! - `StateGraph`: arena owning every `Gas` and `State`; states are addressed by dense
//!   `StateId` indices assigned in insertion order.
//! - `State`: one quantum level with population/density and parent/children links. Siblings
//!   are never stored, they are derived from the parent's children list (or from the gas'
//!   top-level list for electronic/ionic states).
//! - names follow the chemistry grammar: `N2(X)`, `N2(+,B)`, `N2(X,v=3)`, `N2(X,v=0,J=5)`, `e`
//!
//! ## Key methods
//! - `add_gas()`, `add_state()` (creates missing intermediate levels), `resolve_siblings()`,
//!   `traverse()`, `expand_wildcard()`, `check_populations()`, `evaluate_densities()`
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::constants::M_ELECTRON;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type StateId = usize;
pub type GasId = usize;

/// name of the reserved electron gas and of its single state
pub const ELECTRON: &str = "e";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateType {
    Electronic,
    Vibrational,
    Rotational,
    Ionic,
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateType::Electronic => "electronic",
            StateType::Vibrational => "vibrational",
            StateType::Rotational => "rotational",
            StateType::Ionic => "ionic",
        };
        write!(f, "{}", name)
    }
}

/// Level labels of a state as written inside the parentheses of a species token
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateLabels {
    pub ionic: bool,
    pub electronic: Option<String>,
    pub vibrational: Option<String>,
    pub rotational: Option<String>,
}

impl StateLabels {
    pub fn electronic(e: &str) -> Self {
        Self {
            electronic: Some(e.to_owned()),
            ..Default::default()
        }
    }

    pub fn vibrational(e: &str, v: &str) -> Self {
        Self {
            electronic: Some(e.to_owned()),
            vibrational: Some(v.to_owned()),
            ..Default::default()
        }
    }

    pub fn rotational(e: &str, v: &str, j: &str) -> Self {
        Self {
            electronic: Some(e.to_owned()),
            vibrational: Some(v.to_owned()),
            rotational: Some(j.to_owned()),
            ..Default::default()
        }
    }

    /// the type implied by the deepest label present
    pub fn implied_type(&self) -> StateType {
        if self.rotational.is_some() {
            StateType::Rotational
        } else if self.vibrational.is_some() {
            StateType::Vibrational
        } else if self.ionic {
            StateType::Ionic
        } else {
            StateType::Electronic
        }
    }

    fn top_level(&self) -> Self {
        Self {
            ionic: self.ionic,
            electronic: self.electronic.clone(),
            vibrational: None,
            rotational: None,
        }
    }

    fn without_rotational(&self) -> Self {
        Self {
            rotational: None,
            ..self.clone()
        }
    }

    /// state name built from the gas name and the labels
    pub fn state_name(&self, gas: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.ionic {
            parts.push("+".to_owned());
        }
        if let Some(e) = &self.electronic {
            parts.push(e.clone());
        }
        if let Some(v) = &self.vibrational {
            parts.push(format!("v={}", v));
        }
        if let Some(j) = &self.rotational {
            parts.push(format!("J={}", j));
        }
        if parts.is_empty() {
            gas.to_owned()
        } else {
            format!("{}({})", gas, parts.join(","))
        }
    }
}

/// Reduced diffusion coefficient model of a species (D*N, m^-1 s^-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReducedDiffusion {
    Constant(f64),
    /// d_ref * (T / t_ref)^exponent with T the gas temperature
    PowerLaw { d_ref: f64, t_ref: f64, exponent: f64 },
}

impl ReducedDiffusion {
    pub fn evaluate(&self, gas_temperature: f64) -> f64 {
        match self {
            ReducedDiffusion::Constant(d) => *d,
            ReducedDiffusion::PowerLaw {
                d_ref,
                t_ref,
                exponent,
            } => d_ref * (gas_temperature / t_ref).powf(*exponent),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gas {
    pub id: GasId,
    pub name: String,
    /// kg
    pub mass: Option<f64>,
    /// fraction of the total gas density
    pub fraction: Option<f64>,
    /// rad/s
    pub harmonic_frequency: Option<f64>,
    /// rad/s
    pub anharmonic_frequency: Option<f64>,
    /// eV
    pub rotational_constant: Option<f64>,
    /// top-level (electronic and ionic) states in declaration order
    pub states: Vec<StateId>,
}

impl Gas {
    fn new(id: GasId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            mass: None,
            fraction: None,
            harmonic_frequency: None,
            anharmonic_frequency: None,
            rotational_constant: None,
            states: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub name: String,
    pub state_type: StateType,
    pub gas: GasId,
    pub labels: StateLabels,
    /// eV
    pub energy: Option<f64>,
    pub statistical_weight: Option<f64>,
    pub population: f64,
    /// m^-3
    pub density: f64,
    pub reduced_diff_coeff: Option<ReducedDiffusion>,
    pub parent: Option<StateId>,
    pub children: Vec<StateId>,
    /// ids of reactions where the state is a net product
    pub reactions_creation: Vec<usize>,
    /// ids of reactions where the state is a net reactant
    pub reactions_destruction: Vec<usize>,
}

impl State {
    pub fn vib_level(&self) -> Option<&str> {
        self.labels.vibrational.as_deref()
    }

    pub fn rot_level(&self) -> Option<&str> {
        self.labels.rotational.as_deref()
    }

    /// numeric vibrational quantum number
    pub fn vib_number(&self) -> Result<u32, ChemistryError> {
        self.vib_level()
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| ChemistryError::data_missing(&self.name, "numeric vibLevel"))
    }

    /// numeric rotational quantum number
    pub fn rot_number(&self) -> Result<u32, ChemistryError> {
        self.rot_level()
            .and_then(|j| j.parse::<u32>().ok())
            .ok_or_else(|| ChemistryError::data_missing(&self.name, "numeric rotLevel"))
    }

    pub fn energy(&self) -> Result<f64, ChemistryError> {
        self.energy
            .ok_or_else(|| ChemistryError::data_missing(&self.name, "energy"))
    }

    pub fn statistical_weight(&self) -> Result<f64, ChemistryError> {
        self.statistical_weight
            .ok_or_else(|| ChemistryError::data_missing(&self.name, "statisticalWeight"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateGraph {
    pub gases: Vec<Gas>,
    pub states: Vec<State>,
    gas_index: HashMap<String, GasId>,
    state_index: HashMap<String, StateId>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// declares a gas (or updates the mass of an already declared one)
    pub fn add_gas(&mut self, name: &str, mass: Option<f64>) -> GasId {
        let id = match self.gas_index.get(name) {
            Some(id) => *id,
            None => {
                let id = self.gases.len();
                self.gases.push(Gas::new(id, name));
                self.gas_index.insert(name.to_owned(), id);
                id
            }
        };
        if mass.is_some() {
            self.gases[id].mass = mass;
        }
        id
    }

    pub fn gas_id(&self, name: &str) -> Result<GasId, ChemistryError> {
        self.gas_index
            .get(name)
            .copied()
            .ok_or_else(|| ChemistryError::UndeclaredGas(name.to_owned()))
    }

    pub fn gas(&self, id: GasId) -> &Gas {
        &self.gases[id]
    }

    pub fn gas_mut(&mut self, id: GasId) -> &mut Gas {
        &mut self.gases[id]
    }

    pub fn gas_of(&self, state: StateId) -> &Gas {
        &self.gases[self.states[state].gas]
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.state_index.get(name).copied()
    }

    pub fn state_by_name(&self, name: &str) -> Result<StateId, ChemistryError> {
        self.find_state(name)
            .ok_or_else(|| ChemistryError::UnknownState(name.to_owned()))
    }

    /// the electron pseudo-state, created on first request
    pub fn electron(&mut self) -> StateId {
        if let Some(id) = self.find_state(ELECTRON) {
            return id;
        }
        let gas = self.add_gas(ELECTRON, Some(M_ELECTRON));
        self.insert_state(gas, StateType::Electronic, StateLabels::default(), None)
    }

    pub fn is_electron(&self, state: StateId) -> bool {
        self.states[state].name == ELECTRON
    }

    /// Inserts a state of `gas` as a child of the state matching the upper labels.
    /// Missing electronic/vibrational parents are created on demand. When the electronic
    /// label is omitted it is inferred from the gas, which must then have exactly one
    /// candidate. Adding an existing state returns its id and fills the given energy/weight.
    pub fn add_state(
        &mut self,
        gas: &str,
        state_type: StateType,
        labels: &StateLabels,
        energy: Option<f64>,
        statistical_weight: Option<f64>,
    ) -> Result<StateId, ChemistryError> {
        let gas_id = self.gas_id(gas)?;
        let implied = labels.implied_type();
        if implied != state_type {
            return Err(ChemistryError::InvalidStateType {
                state: labels.state_name(gas),
                expected: state_type.to_string(),
            });
        }
        let labels = self.complete_electronic_label(gas_id, labels)?;
        let id = self.find_or_insert(gas_id, &labels)?;
        let state = &mut self.states[id];
        if energy.is_some() {
            state.energy = energy;
        }
        if statistical_weight.is_some() {
            state.statistical_weight = statistical_weight;
        }
        Ok(id)
    }

    fn complete_electronic_label(
        &self,
        gas_id: GasId,
        labels: &StateLabels,
    ) -> Result<StateLabels, ChemistryError> {
        if labels.electronic.is_some() || labels.implied_type() == StateType::Ionic {
            return Ok(labels.clone());
        }
        if labels.implied_type() == StateType::Electronic {
            return Err(ChemistryError::UnknownState(
                labels.state_name(&self.gases[gas_id].name),
            ));
        }
        let wanted = if labels.ionic {
            StateType::Ionic
        } else {
            StateType::Electronic
        };
        let candidates: Vec<StateId> = self.gases[gas_id]
            .states
            .iter()
            .copied()
            .filter(|id| self.states[*id].state_type == wanted)
            .collect();
        match candidates.as_slice() {
            [single] => {
                let mut completed = labels.clone();
                completed.electronic = self.states[*single].labels.electronic.clone();
                Ok(completed)
            }
            [] => Err(ChemistryError::UnknownState(
                labels.state_name(&self.gases[gas_id].name),
            )),
            many => Err(ChemistryError::AmbiguousState {
                labels: labels.state_name(&self.gases[gas_id].name),
                candidates: many.iter().map(|id| self.states[*id].name.clone()).collect(),
            }),
        }
    }

    fn find_or_insert(
        &mut self,
        gas_id: GasId,
        labels: &StateLabels,
    ) -> Result<StateId, ChemistryError> {
        let name = labels.state_name(&self.gases[gas_id].name);
        if let Some(id) = self.state_index.get(&name) {
            return Ok(*id);
        }
        let parent = match labels.implied_type() {
            StateType::Electronic | StateType::Ionic => None,
            StateType::Vibrational => Some(self.find_or_insert(gas_id, &labels.top_level())?),
            StateType::Rotational => {
                Some(self.find_or_insert(gas_id, &labels.without_rotational())?)
            }
        };
        Ok(self.insert_state(gas_id, labels.implied_type(), labels.clone(), parent))
    }

    fn insert_state(
        &mut self,
        gas_id: GasId,
        state_type: StateType,
        labels: StateLabels,
        parent: Option<StateId>,
    ) -> StateId {
        let id = self.states.len();
        let name = labels.state_name(&self.gases[gas_id].name);
        self.states.push(State {
            id,
            name: name.clone(),
            state_type,
            gas: gas_id,
            labels,
            energy: None,
            statistical_weight: None,
            population: 0.0,
            density: 0.0,
            reduced_diff_coeff: None,
            parent,
            children: Vec::new(),
            reactions_creation: Vec::new(),
            reactions_destruction: Vec::new(),
        });
        match parent {
            Some(p) => self.states[p].children.push(id),
            None => self.gases[gas_id].states.push(id),
        }
        self.state_index.insert(name, id);
        id
    }

    /// states sharing the parent and the type of `state` (self included), declaration order
    pub fn sibling_group(&self, state: StateId) -> Vec<StateId> {
        let s = &self.states[state];
        let pool = match s.parent {
            Some(p) => &self.states[p].children,
            None => &self.gases[s.gas].states,
        };
        pool.iter()
            .copied()
            .filter(|id| self.states[*id].state_type == s.state_type)
            .collect()
    }

    /// states sharing the parent and the type of `state`, self excluded
    pub fn resolve_siblings(&self, state: StateId) -> Vec<StateId> {
        self.sibling_group(state)
            .into_iter()
            .filter(|id| *id != state)
            .collect()
    }

    /// every state, parents before children, declaration order
    pub fn traverse(&self) -> Vec<StateId> {
        let mut order = Vec::with_capacity(self.states.len());
        for gas in &self.gases {
            let mut stack: Vec<StateId> = gas.states.iter().rev().copied().collect();
            while let Some(id) = stack.pop() {
                order.push(id);
                stack.extend(self.states[id].children.iter().rev().copied());
            }
        }
        order
    }

    /// Resolves a target name. `N2(X,v=*)` gives the vibrational children of `N2(X)`,
    /// `N2(X,v=0,J=*)` the rotational children of `N2(X,v=0)`, `N2(*)` the electronic states
    /// of `N2`; anything else must be an existing state name.
    pub fn expand_wildcard(&self, pattern: &str) -> Result<Vec<StateId>, ChemistryError> {
        let pattern = pattern.trim();
        let by_type = |parent: &str, wanted: StateType| -> Result<Vec<StateId>, ChemistryError> {
            let parent = self.state_by_name(parent)?;
            Ok(self.states[parent]
                .children
                .iter()
                .copied()
                .filter(|id| self.states[*id].state_type == wanted)
                .collect())
        };
        if let Some(stem) = pattern.strip_suffix(",J=*)") {
            return by_type(&format!("{})", stem), StateType::Rotational);
        }
        if let Some(stem) = pattern.strip_suffix(",v=*)") {
            return by_type(&format!("{})", stem), StateType::Vibrational);
        }
        if let Some(gas) = pattern.strip_suffix("(*)") {
            let gas = self.gas_id(gas)?;
            return Ok(self.gases[gas]
                .states
                .iter()
                .copied()
                .filter(|id| self.states[*id].state_type == StateType::Electronic)
                .collect());
        }
        Ok(vec![self.state_by_name(pattern)?])
    }

    /// every sibling group whose populations are expected to be normalised
    fn population_groups(&self) -> Vec<Vec<StateId>> {
        let mut groups = Vec::new();
        for gas in &self.gases {
            if gas.name == ELECTRON {
                continue;
            }
            let top: Vec<StateId> = gas
                .states
                .iter()
                .copied()
                .filter(|id| self.states[*id].state_type == StateType::Electronic)
                .collect();
            if !top.is_empty() {
                groups.push(top);
            }
        }
        for state in &self.states {
            for wanted in [StateType::Vibrational, StateType::Rotational] {
                let group: Vec<StateId> = state
                    .children
                    .iter()
                    .copied()
                    .filter(|id| self.states[*id].state_type == wanted)
                    .collect();
                if !group.is_empty() {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// checks that every group of neutral states is normalised to 1
    pub fn check_populations(&self) -> Result<(), ChemistryError> {
        for group in self.population_groups() {
            let sum: f64 = group.iter().map(|id| self.states[*id].population).sum();
            if (sum - 1.0).abs() > 1e-10 {
                return Err(ConfigError::PopulationNotNormalised {
                    state: self.states[group[0]].name.clone(),
                    sum,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Densities from populations: electronic states get fraction*N*population, children get
    /// parent density * population. Ionic top-level densities are owned by the solver and are
    /// only propagated down.
    pub fn evaluate_densities(&mut self, gas_density: f64) -> Result<(), ChemistryError> {
        for id in self.traverse() {
            let (parent, state_type, gas, population) = {
                let s = &self.states[id];
                (s.parent, s.state_type, s.gas, s.population)
            };
            let density = match (parent, state_type) {
                (Some(p), _) => self.states[p].density * population,
                (None, StateType::Electronic) if self.gases[gas].name != ELECTRON => {
                    let fraction = self.gases[gas]
                        .fraction
                        .ok_or_else(|| ChemistryError::data_missing(&self.gases[gas].name, "fraction"))?;
                    fraction * gas_density * population
                }
                _ => continue,
            };
            self.states[id].density = density;
        }
        Ok(())
    }
}
