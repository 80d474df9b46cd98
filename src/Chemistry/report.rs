//! Read-only views of the chemistry for drivers and output: serialisable snapshots of states,
//! reactions and per-state balances, and their pretty-printed tables.
use crate::Chemistry::chem_errors::ChemistryError;
use crate::Chemistry::chemistry::Chemistry;
use crate::Chemistry::reaction::Reaction;
use crate::Chemistry::state_graph::{StateGraph, StateType};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub id: usize,
    pub name: String,
    pub state_type: StateType,
    pub gas: String,
    pub energy: Option<f64>,
    pub statistical_weight: Option<f64>,
    pub population: f64,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSnapshot {
    pub id: usize,
    pub description: String,
    pub reaction_type: String,
    pub rate_coeff: Option<f64>,
    pub back_rate_coeff: Option<f64>,
    pub net_rate: Option<f64>,
}

/// creation and destruction rates of one state, m^-3 s^-1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBalance {
    pub state: String,
    pub creation: f64,
    pub destruction: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemistryReport {
    pub states: Vec<StateSnapshot>,
    pub reactions: Vec<ReactionSnapshot>,
    #[serde(default)]
    pub balances: Vec<StateBalance>,
}

pub fn state_snapshots(graph: &StateGraph) -> Vec<StateSnapshot> {
    graph
        .traverse()
        .into_iter()
        .map(|id| {
            let state = graph.state(id);
            StateSnapshot {
                id,
                name: state.name.clone(),
                state_type: state.state_type,
                gas: graph.gas_of(id).name.clone(),
                energy: state.energy,
                statistical_weight: state.statistical_weight,
                population: state.population,
                density: state.density,
            }
        })
        .collect()
}

pub fn reaction_snapshots(reactions: &[Reaction]) -> Vec<ReactionSnapshot> {
    reactions
        .iter()
        .map(|r| ReactionSnapshot {
            id: r.id,
            description: r.description.clone(),
            reaction_type: r.reaction_type.clone(),
            rate_coeff: r.rate_coeff,
            back_rate_coeff: r.back_rate_coeff,
            net_rate: r.net_rate,
        })
        .collect()
}

impl ChemistryReport {
    /// balances are included only when net rates have been computed
    pub fn from_chemistry(chemistry: &Chemistry) -> Self {
        Self {
            states: state_snapshots(&chemistry.graph),
            reactions: reaction_snapshots(&chemistry.reactions),
            balances: chemistry.state_balances().unwrap_or_default(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ChemistryError> {
        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        Ok(())
    }
}

fn optional(x: Option<f64>) -> String {
    x.map(|v| format!("{:.4e}", v)).unwrap_or_else(|| "-".to_owned())
}

fn header(names: &[&str]) -> Row {
    Row::new(names.iter().map(|n| Cell::new(n)).collect())
}

pub fn states_table(graph: &StateGraph) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["id", "state", "type", "energy, eV", "weight", "population", "density, m^-3"]));
    for s in state_snapshots(graph) {
        // children are indented under their parent
        let depth = match s.state_type {
            StateType::Electronic | StateType::Ionic => 0,
            StateType::Vibrational => 1,
            StateType::Rotational => 2,
        };
        table.add_row(Row::new(vec![
            Cell::new(&s.id.to_string()),
            Cell::new(&format!("{}{}", "  ".repeat(depth), s.name)),
            Cell::new(&s.state_type.to_string()),
            Cell::new(&optional(s.energy)),
            Cell::new(&optional(s.statistical_weight)),
            Cell::new(&format!("{:.4e}", s.population)),
            Cell::new(&format!("{:.4e}", s.density)),
        ]));
    }
    table
}

pub fn reactions_table(reactions: &[Reaction]) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["id", "reaction", "type", "k", "k back", "net rate"]));
    for r in reaction_snapshots(reactions) {
        table.add_row(Row::new(vec![
            Cell::new(&r.id.to_string()),
            Cell::new(&r.description),
            Cell::new(&r.reaction_type),
            Cell::new(&optional(r.rate_coeff)),
            Cell::new(&optional(r.back_rate_coeff)),
            Cell::new(&optional(r.net_rate)),
        ]));
    }
    table
}

pub fn print_states(graph: &StateGraph) {
    states_table(graph).printstd();
}

pub fn print_reactions(reactions: &[Reaction]) {
    reactions_table(reactions).printstd();
}
