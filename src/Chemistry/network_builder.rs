//! # Reaction network builder
//!
//! Turns parsed chemistry entries into cross-linked `Reaction` records:
//! 1) placeholder checks (`gas` third body, `wall` surface) on the template
//! 2) range expansion: one concrete reaction per value of `v` (and of `w`, cross product)
//! 3) resolution of the species to states of the graph (missing levels are created)
//! 4) merge of duplicated states per side, catalyst extraction
//! 5) back-linking of every state to the reactions creating / destroying it
use crate::Chemistry::chem_errors::{ChemistryError, ParseError};
use crate::Chemistry::reaction::{ChemistryEntry, Reaction, round_quantity};
use crate::Chemistry::species_parser::{ParsedEquation, RangeDecl, Species, Term, parse_equation};
use crate::Chemistry::state_graph::{StateGraph, StateId};
use log::{debug, info, warn};

/// flags derived from the `gas` and `wall` placeholders of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaceholderFlags {
    is_transport: bool,
    is_surface: bool,
    is_gas_stabilised: bool,
}

/// number of `wanted` terms on a side and whether all of them have quantity 1
fn placeholder_count(side: &[Term], wanted: &Species) -> (usize, bool) {
    side.iter()
        .filter(|t| &t.species == wanted)
        .fold((0, true), |(n, unit), t| (n + 1, unit && t.quantity == 1.0))
}

fn check_placeholders(eq: &ParsedEquation) -> Result<PlaceholderFlags, ParseError> {
    let (gas_lhs, unit_lhs) = placeholder_count(&eq.reactants, &Species::Gas);
    let (gas_rhs, unit_rhs) = placeholder_count(&eq.products, &Species::Gas);
    if gas_lhs > 1 || gas_rhs > 1 || !unit_lhs || !unit_rhs {
        return Err(ParseError::UnbalancedPlaceholder {
            equation: eq.text.clone(),
        });
    }
    if (gas_lhs == 0) != (gas_rhs == 0) {
        return Err(ParseError::CreateDestroyGas {
            equation: eq.text.clone(),
        });
    }
    let (wall_lhs, _) = placeholder_count(&eq.reactants, &Species::Wall);
    let (wall_rhs, _) = placeholder_count(&eq.products, &Species::Wall);
    let other_reactants = eq
        .reactants
        .iter()
        .any(|t| !matches!(t.species, Species::Wall | Species::Gas));
    if wall_rhs > 0 && wall_lhs == 0 {
        return Err(ParseError::CreateDestroyWall {
            equation: eq.text.clone(),
        });
    }
    if wall_lhs > 0 && wall_rhs == 0 && !other_reactants {
        return Err(ParseError::CreateDestroyWall {
            equation: eq.text.clone(),
        });
    }
    Ok(PlaceholderFlags {
        is_transport: wall_lhs > 0 && wall_rhs == 0,
        is_surface: wall_lhs > 0 && wall_rhs > 0,
        is_gas_stabilised: gas_lhs == 1 && gas_rhs == 1,
    })
}

fn range_values(range: Option<RangeDecl>) -> Vec<Option<u32>> {
    match range {
        Some(r) => (r.start..=r.end).map(Some).collect(),
        None => vec![None],
    }
}

/// resolves the state terms of one side for a concrete (v, w) and merges duplicates
fn resolve_side(
    graph: &mut StateGraph,
    side: &[Term],
    v: Option<u32>,
    w: Option<u32>,
    equation: &str,
) -> Result<Vec<(StateId, f64)>, ChemistryError> {
    let mut merged: Vec<(StateId, f64)> = Vec::new();
    for term in side {
        let id = match &term.species {
            Species::Gas | Species::Wall => continue,
            Species::Electron => graph.electron(),
            Species::State { gas, labels } => {
                let labels = labels.instantiate(v, w, equation)?;
                graph.add_state(gas, labels.implied_type(), &labels, None, None)?
            }
        };
        match merged.iter_mut().find(|(s, _)| *s == id) {
            Some((_, q)) => *q = round_quantity(*q + term.quantity),
            None => merged.push((id, term.quantity)),
        }
    }
    Ok(merged)
}

/// Moves species present on both sides into the catalyst list, by the smaller of the two
/// quantities. Equal quantities remove the species from both sides; leftovers are rounded so
/// that decimal quantities cancel exactly.
pub fn extract_catalysts(
    mut reactants: Vec<(StateId, f64)>,
    mut products: Vec<(StateId, f64)>,
) -> (Vec<(StateId, f64)>, Vec<(StateId, f64)>, Vec<(StateId, f64)>) {
    let mut catalysts = Vec::new();
    for (state, q_reactant) in reactants.iter_mut() {
        if let Some((_, q_product)) = products.iter_mut().find(|(s, _)| s == state) {
            let common = q_reactant.min(*q_product);
            catalysts.push((*state, common));
            *q_reactant = round_quantity(*q_reactant - common);
            *q_product = round_quantity(*q_product - common);
        }
    }
    reactants.retain(|(_, q)| *q > 0.0);
    products.retain(|(_, q)| *q > 0.0);
    (reactants, products, catalysts)
}

/// Builds every concrete reaction of `entries`, numbered in order, and links them into the
/// states of `graph`.
pub fn build_reactions(
    graph: &mut StateGraph,
    entries: &[ChemistryEntry],
) -> Result<Vec<Reaction>, ChemistryError> {
    let mut reactions: Vec<Reaction> = Vec::new();
    for entry in entries {
        let eq = parse_equation(&entry.equation)?;
        let flags = check_placeholders(&eq)?;
        let before = reactions.len();
        for v in range_values(eq.v_range) {
            for w in range_values(eq.w_range) {
                let reactants = resolve_side(graph, &eq.reactants, v, w, &eq.text)?;
                let products = resolve_side(graph, &eq.products, v, w, &eq.text)?;
                let (reactants, products, catalysts) = extract_catalysts(reactants, products);
                if reactants.is_empty() && products.is_empty() {
                    warn!(
                        "reaction '{}' (v={:?}, w={:?}) has no net effect and is discarded",
                        eq.text, v, w
                    );
                    continue;
                }
                let mut reaction = Reaction {
                    id: reactions.len(),
                    reaction_type: entry.reaction_type.clone(),
                    reactants,
                    products,
                    catalysts,
                    is_transport: flags.is_transport,
                    is_surface: flags.is_surface,
                    is_gas_stabilised: flags.is_gas_stabilised,
                    is_reverse: eq.is_reverse,
                    rate_coeff_params: entry.params.clone(),
                    enthalpy: entry.enthalpy,
                    description: String::new(),
                    rate_coeff: None,
                    back_rate_coeff: None,
                    net_rate: None,
                };
                reaction.description = reaction.describe(graph);
                link_reaction(graph, &reaction);
                reactions.push(reaction);
            }
        }
        debug!(
            "'{}' expanded into {} reaction(s)",
            eq.text,
            reactions.len() - before
        );
    }
    info!(
        "reaction network: {} reactions from {} entries, {} states",
        reactions.len(),
        entries.len(),
        graph.len()
    );
    Ok(reactions)
}

fn link_reaction(graph: &mut StateGraph, reaction: &Reaction) {
    for (state, _) in &reaction.products {
        graph.state_mut(*state).reactions_creation.push(reaction.id);
    }
    for (state, _) in &reaction.reactants {
        graph.state_mut(*state).reactions_destruction.push(reaction.id);
    }
}
