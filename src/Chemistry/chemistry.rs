//! # Chemistry
//!
//! ## Aim
//! Facade over the state graph and the reaction network: builds the network, keeps one rate
//! coefficient evaluator per reaction, evaluates coefficients under the current working
//! conditions, and turns them into net rates and density derivatives for the driver.
//!
//! ## Main data structures
//! - `Chemistry`: owns the `StateGraph`, the `Reaction` list, their evaluators and the wall
//!   transport cache. Evaluators and reactions share the same index.
//!
//! ## Key methods
//! - `build()`: network construction, evaluator resolution and validation of the wall sticking
//!   probabilities; configuration errors are raised here
//! - `evaluate_rate_coefficients()`, `refresh_rate_coefficients()`: full / dependency driven
//!   evaluation
//! - `update_densities()`, `compute_net_rates()`, `density_derivatives()`, `state_balances()`,
//!   `stoichiometric_matrix()`
use crate::Chemistry::chem_errors::ChemistryError;
use crate::Chemistry::electron_kinetics::ElectronKinetics;
use crate::Chemistry::network_builder::build_reactions;
use crate::Chemistry::rate_coefficients::{
    Dependency, RateCoeffEnum, RateCoefficient, RateContext, RateValue,
};
use crate::Chemistry::reaction::{ChemistryEntry, Reaction};
use crate::Chemistry::report::StateBalance;
use crate::Chemistry::state_graph::{ELECTRON, StateGraph, StateId};
use crate::Chemistry::wall_transport::WallTransportCache;
use crate::Chemistry::working_conditions::WorkingConditions;
use crate::constants::K_B_EV;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct Chemistry {
    pub graph: StateGraph,
    pub reactions: Vec<Reaction>,
    evaluators: Vec<RateCoeffEnum>,
    wall_cache: WallTransportCache,
}

impl Chemistry {
    /// Expands `entries` into reactions over `graph` and resolves every evaluator.
    pub fn build(mut graph: StateGraph, entries: &[ChemistryEntry]) -> Result<Self, ChemistryError> {
        let reactions = build_reactions(&mut graph, entries)?;
        let evaluators = reactions
            .iter()
            .map(RateCoeffEnum::from_reaction)
            .collect::<Result<Vec<_>, _>>()?;
        // sticking probabilities are validated before any evaluation
        let mut wall_cache = WallTransportCache::new();
        for (reaction, evaluator) in reactions.iter().zip(&evaluators) {
            if let RateCoeffEnum::WallTransport(_) = evaluator {
                wall_cache.total_sticking(&graph, &reactions, reaction.reactants[0].0)?;
            }
        }
        info!(
            "chemistry ready: {} states, {} reactions ({} wall transport)",
            graph.len(),
            reactions.len(),
            reactions.iter().filter(|r| r.is_transport).count()
        );
        Ok(Self {
            graph,
            reactions,
            evaluators,
            wall_cache,
        })
    }

    pub fn evaluator(&self, reaction: usize) -> &RateCoeffEnum {
        &self.evaluators[reaction]
    }

    pub fn dependency(&self, reaction: usize) -> Dependency {
        self.evaluators[reaction].dependency()
    }

    pub fn wall_cache(&self) -> &WallTransportCache {
        &self.wall_cache
    }

    /// evaluates every rate coefficient
    pub fn evaluate_rate_coefficients(
        &mut self,
        conditions: &WorkingConditions,
        electron_kinetics: Option<&dyn ElectronKinetics>,
    ) -> Result<(), ChemistryError> {
        let all: Vec<usize> = (0..self.reactions.len()).collect();
        self.evaluate_selected(&all, conditions, electron_kinetics)
    }

    /// Re-evaluates the reactions whose evaluator depends on one of the `changed` inputs, and
    /// those never evaluated. Returns how many were recomputed.
    pub fn refresh_rate_coefficients(
        &mut self,
        conditions: &WorkingConditions,
        electron_kinetics: Option<&dyn ElectronKinetics>,
        changed: Dependency,
    ) -> Result<usize, ChemistryError> {
        let selected: Vec<usize> = self
            .reactions
            .iter()
            .filter(|r| r.rate_coeff.is_none() || self.evaluators[r.id].dependency().intersects(&changed))
            .map(|r| r.id)
            .collect();
        self.evaluate_selected(&selected, conditions, electron_kinetics)?;
        Ok(selected.len())
    }

    fn evaluate_selected(
        &mut self,
        selected: &[usize],
        conditions: &WorkingConditions,
        electron_kinetics: Option<&dyn ElectronKinetics>,
    ) -> Result<(), ChemistryError> {
        let mut values: Vec<(usize, RateValue)> = Vec::with_capacity(selected.len());
        {
            let mut ctx = RateContext {
                graph: &self.graph,
                reactions: &self.reactions,
                conditions,
                electron_kinetics,
                wall_cache: &mut self.wall_cache,
            };
            for id in selected {
                let value = self.evaluators[*id].evaluate(&mut ctx, &self.reactions[*id])?;
                values.push((*id, value));
            }
        }
        for (id, value) in values {
            let back = if self.reactions[id].is_reverse {
                match value.backward() {
                    Some(k) => Some(k),
                    None => Some(self.detailed_balance(id, value.forward(), conditions)?),
                }
            } else {
                None
            };
            let reaction = &mut self.reactions[id];
            reaction.rate_coeff = Some(value.forward());
            reaction.back_rate_coeff = back;
        }
        debug!("{} rate coefficients evaluated", selected.len());
        Ok(())
    }

    /// backward coefficient k_f·Πg_r/Πg_p·exp((ΣE_p − ΣE_r)/(k_B·Tg))
    fn detailed_balance(
        &self,
        reaction: usize,
        forward: f64,
        conditions: &WorkingConditions,
    ) -> Result<f64, ChemistryError> {
        let kt = K_B_EV * conditions.gas_temperature()?;
        let reaction = &self.reactions[reaction];
        let mut ratio = 1.0;
        let mut delta_energy = 0.0;
        for (id, q) in &reaction.reactants {
            let state = self.graph.state(*id);
            ratio *= state.statistical_weight()?.powf(*q);
            delta_energy -= q * state.energy()?;
        }
        for (id, q) in &reaction.products {
            let state = self.graph.state(*id);
            ratio /= state.statistical_weight()?.powf(*q);
            delta_energy += q * state.energy()?;
        }
        Ok(forward * ratio * (delta_energy / kt).exp())
    }

    /// Densities of the heavy species from the populations and the gas density; the electron
    /// density is taken from the working conditions when given.
    pub fn update_densities(&mut self, conditions: &WorkingConditions) -> Result<(), ChemistryError> {
        self.graph.evaluate_densities(conditions.gas_density()?)?;
        if let (Some(ne), Some(e)) = (conditions.electron_density, self.graph.find_state(ELECTRON)) {
            self.graph.state_mut(e).density = ne;
        }
        Ok(())
    }

    fn density_product<'a>(&self, side: impl Iterator<Item = &'a (StateId, f64)>) -> f64 {
        side.map(|(id, q)| self.graph.state(*id).density.powf(*q))
            .product()
    }

    /// Net rate of every reaction (m^-3 s^-1): k_f·Π n^ν over reactants and catalysts minus
    /// the backward term of reversible reactions; `gas` stabilised reactions are multiplied by
    /// the gas density.
    pub fn compute_net_rates(&mut self, conditions: &WorkingConditions) -> Result<(), ChemistryError> {
        let mut rates = Vec::with_capacity(self.reactions.len());
        for reaction in &self.reactions {
            let k_f = reaction
                .rate_coeff
                .ok_or_else(|| ChemistryError::data_missing(&reaction.description, "rate coefficient"))?;
            let third_body = if reaction.is_gas_stabilised {
                conditions.gas_density()?
            } else {
                1.0
            };
            let mut rate = k_f * self.density_product(reaction.forward_order());
            if let Some(k_b) = reaction.back_rate_coeff {
                rate -= k_b * self.density_product(reaction.backward_order());
            }
            rates.push(rate * third_body);
        }
        for (reaction, rate) in self.reactions.iter_mut().zip(rates) {
            reaction.net_rate = Some(rate);
        }
        Ok(())
    }

    /// states × reactions matrix of net stoichiometric coefficients (products positive)
    pub fn stoichiometric_matrix(&self) -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(self.graph.len(), self.reactions.len());
        for reaction in &self.reactions {
            for (state, q) in &reaction.products {
                matrix[(*state, reaction.id)] += q;
            }
            for (state, q) in &reaction.reactants {
                matrix[(*state, reaction.id)] -= q;
            }
        }
        matrix
    }

    fn net_rates(&self) -> Result<DVector<f64>, ChemistryError> {
        let rates = self
            .reactions
            .iter()
            .map(|r| {
                r.net_rate
                    .ok_or_else(|| ChemistryError::data_missing(&r.description, "net rate"))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(DVector::from_vec(rates))
    }

    /// dn/dt of every state (m^-3 s^-1), indexed by state id
    pub fn density_derivatives(&self) -> Result<DVector<f64>, ChemistryError> {
        Ok(self.stoichiometric_matrix() * self.net_rates()?)
    }

    /// creation / destruction totals of every state from the last net rates
    pub fn state_balances(&self) -> Result<Vec<StateBalance>, ChemistryError> {
        let rates = self.net_rates()?;
        let mut balances = Vec::with_capacity(self.graph.len());
        for id in self.graph.traverse() {
            let state = self.graph.state(id);
            let creation: f64 = state
                .reactions_creation
                .iter()
                .map(|r| self.reactions[*r].net_coefficient(id).max(0.0) * rates[*r])
                .sum();
            let destruction: f64 = state
                .reactions_destruction
                .iter()
                .map(|r| -self.reactions[*r].net_coefficient(id).min(0.0) * rates[*r])
                .sum();
            balances.push(StateBalance {
                state: state.name.clone(),
                creation,
                destruction,
                net: creation - destruction,
            });
        }
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::reaction::RateCoeffParam;
    use crate::Chemistry::state_graph::{StateLabels, StateType};
    use approx::assert_relative_eq;

    fn constant(equation: &str, k: f64) -> ChemistryEntry {
        ChemistryEntry::new(equation, "constantRateCoeff", vec![RateCoeffParam::Number(k)])
    }

    fn conditions() -> WorkingConditions {
        WorkingConditions {
            gas_temperature: Some(300.0),
            gas_density: Some(1e22),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_resolves_every_evaluator() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let err = Chemistry::build(
            graph.clone(),
            &[
                constant("N2(B) -> N2(A)", 1.0),
                ChemistryEntry::new("N2(A) -> N2(X)", "noSuchType", vec![]),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("noSuchType"));
        let chemistry = Chemistry::build(graph, &[constant("N2(B) -> N2(A)", 1.0)]).unwrap();
        assert_eq!(chemistry.evaluator(0), &RateCoeffEnum::from_reaction(&chemistry.reactions[0]).unwrap());
    }

    #[test]
    fn test_net_rates_and_derivatives() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        graph.add_gas("N", None);
        let mut chemistry = Chemistry::build(
            graph,
            &[
                constant("N2(A) + N2(A) -> N2(B) + N2(X)", 2e-16),
                constant("N(S) + N(S) + gas -> N2(X) + gas", 1e-44),
            ],
        )
        .unwrap();
        let a = chemistry.graph.state_by_name("N2(A)").unwrap();
        let b = chemistry.graph.state_by_name("N2(B)").unwrap();
        let n = chemistry.graph.state_by_name("N(S)").unwrap();
        let x = chemistry.graph.state_by_name("N2(X)").unwrap();
        chemistry.graph.state_mut(a).density = 1e17;
        chemistry.graph.state_mut(n).density = 1e20;
        let wc = conditions();
        chemistry.evaluate_rate_coefficients(&wc, None).unwrap();
        chemistry.compute_net_rates(&wc).unwrap();
        let r0 = 2e-16 * 1e34;
        let r1 = 1e-44 * 1e40 * 1e22;
        assert_relative_eq!(chemistry.reactions[0].net_rate.unwrap(), r0, max_relative = 1e-12);
        assert_relative_eq!(chemistry.reactions[1].net_rate.unwrap(), r1, max_relative = 1e-12);

        let dndt = chemistry.density_derivatives().unwrap();
        assert_relative_eq!(dndt[a], -2.0 * r0, max_relative = 1e-12);
        assert_relative_eq!(dndt[b], r0, max_relative = 1e-12);
        assert_relative_eq!(dndt[n], -2.0 * r1, max_relative = 1e-12);
        assert_relative_eq!(dndt[x], r0 + r1, max_relative = 1e-12);

        let balances = chemistry.state_balances().unwrap();
        let balance_a = balances.iter().find(|b| b.state == "N2(A)").unwrap();
        assert_relative_eq!(balance_a.destruction, 2.0 * r0, max_relative = 1e-12);
        assert_eq!(balance_a.creation, 0.0);
        assert_relative_eq!(balance_a.net, dndt[a], max_relative = 1e-12);
    }

    #[test]
    fn test_detailed_balance() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        graph
            .add_state("N2", StateType::Electronic, &StateLabels::electronic("A"), Some(6.17), Some(3.0))
            .unwrap();
        graph
            .add_state("N2", StateType::Electronic, &StateLabels::electronic("B"), Some(6.22), Some(6.0))
            .unwrap();
        let mut chemistry = Chemistry::build(graph, &[constant("N2(A) <-> N2(B)", 1e3)]).unwrap();
        let wc = conditions();
        chemistry.evaluate_rate_coefficients(&wc, None).unwrap();
        let k_b = chemistry.reactions[0].back_rate_coeff.unwrap();
        let expected = 1e3 * 0.5 * (0.05 / (K_B_EV * 300.0)).exp();
        assert_relative_eq!(k_b, expected, max_relative = 1e-12);

        let a = chemistry.graph.state_by_name("N2(A)").unwrap();
        let b = chemistry.graph.state_by_name("N2(B)").unwrap();
        // Boltzmann-distributed densities give a zero net rate
        chemistry.graph.state_mut(a).density = 3.0;
        chemistry.graph.state_mut(b).density = 6.0 * (-0.05 / (K_B_EV * 300.0)).exp();
        chemistry.compute_net_rates(&wc).unwrap();
        assert!(chemistry.reactions[0].net_rate.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_refresh_only_dependent_reactions() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let mut chemistry = Chemistry::build(
            graph,
            &[
                constant("N2(B) -> N2(A)", 1.0),
                ChemistryEntry::new(
                    "N2(A) + N2(X) -> 2N2(X)",
                    "powerLaw",
                    vec![RateCoeffParam::Number(1e-18), RateCoeffParam::Number(0.5), RateCoeffParam::Name("gasTemperature".to_string())],
                ),
            ],
        )
        .unwrap();
        let mut wc = conditions();
        assert_eq!(
            chemistry
                .refresh_rate_coefficients(&wc, None, Dependency::NONE)
                .unwrap(),
            2
        );
        wc.gas_temperature = Some(1200.0);
        assert_eq!(
            chemistry
                .refresh_rate_coefficients(&wc, None, Dependency::gas_temperature())
                .unwrap(),
            1
        );
        assert_relative_eq!(chemistry.reactions[1].rate_coeff.unwrap(), 1e-18 * 1200f64.sqrt(), max_relative = 1e-12);
        assert_eq!(
            chemistry
                .refresh_rate_coefficients(&wc, None, Dependency::electron_kinetics())
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_missing_rate_coefficient_and_densities() {
        let mut graph = StateGraph::new();
        graph.add_gas("N2", None);
        let mut chemistry = Chemistry::build(graph, &[constant("N2(B) -> N2(A)", 1.0)]).unwrap();
        let wc = conditions();
        assert!(matches!(
            chemistry.compute_net_rates(&wc).unwrap_err(),
            ChemistryError::DataMissing { .. }
        ));
        assert!(chemistry.density_derivatives().is_err());
        // N2 has no fraction yet
        assert!(chemistry.update_densities(&wc).is_err());
        chemistry.graph.gas_mut(0).fraction = Some(1.0);
        let b = chemistry.graph.state_by_name("N2(B)").unwrap();
        chemistry.graph.state_mut(b).population = 0.25;
        chemistry.update_densities(&wc).unwrap();
        assert_relative_eq!(chemistry.graph.state(b).density, 2.5e21);
    }
}
