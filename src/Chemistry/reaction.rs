//! Reaction records of the network and the structured chemistry entries they are built from.
use crate::Chemistry::state_graph::{StateGraph, StateId};
use serde::{Deserialize, Serialize};

/// stoichiometric quantities are resolved to 1/QUANTITY_SCALE
const QUANTITY_SCALE: f64 = 1e9;

/// Rounds a stoichiometric quantity to 1e-9, so that `0.1 + 0.2` is `0.3` and
/// `0.3 - 0.1 - 0.2` is exactly zero.
pub fn round_quantity(q: f64) -> f64 {
    (q * QUANTITY_SCALE).round() / QUANTITY_SCALE
}

/// literal value or symbolic name (e.g. a temperature or a collision description)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateCoeffParam {
    Number(f64),
    Name(String),
}

impl RateCoeffParam {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RateCoeffParam::Number(x) => Some(*x),
            RateCoeffParam::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            RateCoeffParam::Number(_) => None,
            RateCoeffParam::Name(n) => Some(n),
        }
    }
}

/// One chemistry-file line after the low-level text parsing:
/// `equation | reaction type | parameters | enthalpy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChemistryEntry {
    pub equation: String,
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[serde(default)]
    pub params: Vec<RateCoeffParam>,
    #[serde(default)]
    pub enthalpy: Option<f64>,
}

impl ChemistryEntry {
    pub fn new(equation: &str, reaction_type: &str, params: Vec<RateCoeffParam>) -> Self {
        Self {
            equation: equation.to_owned(),
            reaction_type: reaction_type.to_owned(),
            params,
            enthalpy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: usize,
    pub reaction_type: String,
    /// (state, stoichiometric coefficient), unique states
    pub reactants: Vec<(StateId, f64)>,
    pub products: Vec<(StateId, f64)>,
    /// species found unchanged on both sides
    pub catalysts: Vec<(StateId, f64)>,
    pub is_transport: bool,
    /// `wall` on both sides: catalysed by the surface, not a loss to it
    #[serde(default)]
    pub is_surface: bool,
    pub is_gas_stabilised: bool,
    pub is_reverse: bool,
    pub rate_coeff_params: Vec<RateCoeffParam>,
    /// eV
    pub enthalpy: Option<f64>,
    pub description: String,
    /// last evaluated forward rate coefficient
    pub rate_coeff: Option<f64>,
    /// last evaluated backward rate coefficient (reverse reactions only)
    pub back_rate_coeff: Option<f64>,
    /// last evaluated net rate, m^-3 s^-1
    pub net_rate: Option<f64>,
}

fn side_text(graph: &StateGraph, side: &[(StateId, f64)], placeholders: &[&str]) -> String {
    let mut merged: Vec<(StateId, f64)> = Vec::with_capacity(side.len());
    for (id, q) in side {
        match merged.iter_mut().find(|(s, _)| s == id) {
            Some((_, total)) => *total = round_quantity(*total + q),
            None => merged.push((*id, *q)),
        }
    }
    let mut terms: Vec<String> = merged
        .iter()
        .map(|(id, q)| {
            let name = &graph.state(*id).name;
            if *q == 1.0 {
                name.clone()
            } else {
                format!("{}{}", q, name)
            }
        })
        .collect();
    terms.extend(placeholders.iter().map(|p| p.to_string()));
    terms.join(" + ")
}

impl Reaction {
    /// builds the display string `catalysts + reactants -> catalysts + products`
    pub fn describe(&self, graph: &StateGraph) -> String {
        let mut lhs = self.catalysts.clone();
        lhs.extend(self.reactants.iter().copied());
        let mut rhs = self.catalysts.clone();
        rhs.extend(self.products.iter().copied());
        let mut placeholders_lhs = Vec::new();
        let mut placeholders_rhs = Vec::new();
        if self.is_gas_stabilised {
            placeholders_lhs.push("gas");
            placeholders_rhs.push("gas");
        }
        if self.is_transport || self.is_surface {
            placeholders_lhs.push("wall");
        }
        if self.is_surface {
            placeholders_rhs.push("wall");
        }
        let arrow = if self.is_reverse { "<->" } else { "->" };
        format!(
            "{} {} {}",
            side_text(graph, &lhs, &placeholders_lhs),
            arrow,
            side_text(graph, &rhs, &placeholders_rhs)
        )
    }

    /// net stoichiometric coefficient of `state` (products positive)
    pub fn net_coefficient(&self, state: StateId) -> f64 {
        let produced: f64 = self
            .products
            .iter()
            .filter(|(id, _)| *id == state)
            .map(|(_, q)| q)
            .sum();
        let consumed: f64 = self
            .reactants
            .iter()
            .filter(|(id, _)| *id == state)
            .map(|(_, q)| q)
            .sum();
        produced - consumed
    }

    /// quantity of `state` in the rate law of the forward direction (reactants and catalysts)
    pub fn forward_order(&self) -> impl Iterator<Item = &(StateId, f64)> {
        self.reactants.iter().chain(self.catalysts.iter())
    }

    /// quantity of `state` in the rate law of the backward direction (products and catalysts)
    pub fn backward_order(&self) -> impl Iterator<Item = &(StateId, f64)> {
        self.products.iter().chain(self.catalysts.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::state_graph::{StateLabels, StateType};

    #[test]
    fn test_params_deserialize_untagged() {
        let entry: ChemistryEntry = serde_json::from_str(
            r#"{"equation": "N(S) + wall -> 0.5N2(X)", "type": "wallTransport", "params": [0.3, "wallTemperature"]}"#,
        )
        .unwrap();
        assert_eq!(entry.reaction_type, "wallTransport");
        assert_eq!(entry.params[0], RateCoeffParam::Number(0.3));
        assert_eq!(entry.params[1].as_name(), Some("wallTemperature"));
        assert_eq!(entry.enthalpy, None);
    }

    #[test]
    fn test_describe_and_net_coefficient() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let x = graph
            .add_state("N2", StateType::Electronic, &StateLabels::electronic("X"), None, None)
            .unwrap();
        let a = graph
            .add_state("N2", StateType::Electronic, &StateLabels::electronic("A"), None, None)
            .unwrap();
        let e = graph.electron();
        let reaction = Reaction {
            id: 0,
            reaction_type: "eedfRateCoeff".to_string(),
            reactants: vec![(x, 1.0)],
            products: vec![(a, 1.0)],
            catalysts: vec![(e, 1.0)],
            is_transport: false,
            is_surface: false,
            is_gas_stabilised: false,
            is_reverse: true,
            rate_coeff_params: vec![],
            enthalpy: None,
            description: String::new(),
            rate_coeff: None,
            back_rate_coeff: None,
            net_rate: None,
        };
        assert_eq!(reaction.describe(&graph), "e + N2(X) <-> e + N2(A)");
        assert_eq!(reaction.net_coefficient(x), -1.0);
        assert_eq!(reaction.net_coefficient(a), 1.0);
        assert_eq!(reaction.net_coefficient(e), 0.0);
        assert_eq!(reaction.forward_order().count(), 2);

        let surface = Reaction {
            reactants: vec![(a, 1.0)],
            products: vec![(x, 1.0)],
            catalysts: vec![],
            is_surface: true,
            is_reverse: false,
            ..reaction
        };
        assert_eq!(surface.describe(&graph), "N2(A) + wall -> N2(X) + wall");
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(0.1 + 0.2), 0.3);
        assert_eq!(round_quantity(0.3 - 0.1 - 0.2), 0.0);
        assert_eq!(round_quantity(2.0), 2.0);
        assert_eq!(round_quantity(0.5), 0.5);
    }
}
