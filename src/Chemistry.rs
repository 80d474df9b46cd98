/// eng
/// Error taxonomy of the engine: `ParseError` for reaction/state text, `ConfigError` for
/// missing or inconsistent configuration, `ChemistryError` wrapping both plus data, graph,
/// numerics and io failures.
pub mod chem_errors;
/// Working conditions of the discharge (temperatures, densities, chamber geometry) and symbolic
/// temperature references.
pub mod working_conditions;
/// Hierarchical state graph: gas → electronic/ionic → vibrational → rotational states stored in
/// an arena, siblings derived from the parent's children.
pub mod state_graph;
/// Vibrational population closures: Boltzmann, Treanor and Treanor-Gordiets. Each closure
/// renormalises the whole sibling group of the state it is called on.
pub mod population;
/// Gas and state property entries (masses, frequencies, energies, weights, populations,
/// reduced diffusion coefficients) with their named functions.
pub mod properties;
/// Reaction records and the chemistry entries they are built from.
pub mod reaction;
/// Grammar of chemistry equations and species: quantities, ions, levels, `v[a:b]`/`w[a:b]`
/// ranges and `v+k` expressions, `gas` and `wall` placeholders.
pub mod species_parser;
/// Reaction network builder:
/// 1) range expansion (cross product of `v` and `w`)
/// 2) resolution of species to states, created on demand
/// 3) duplicate merging and catalyst extraction
/// 4) placeholder validation and back-linking of states to reactions
pub mod network_builder;
/// Bessel functions J0, J1 and the bracketed root finder used by the wall transport solver.
pub mod numerics;
/// Rate coefficient evaluators behind the `RateCoefficient` trait and the registry resolving
/// them from reaction type strings.
pub mod rate_coefficients;
/// Wall loss of species by diffusion with a partially absorbing wall: diffusion length of the
/// infinite cylinder, infinite slab and finite cylinder.
pub mod wall_transport;
/// Interface to the electron kinetics (Boltzmann solver) results consumed by the chemistry.
pub mod electron_kinetics;
/// Facade: network, evaluators, net rates, density derivatives and balances.
pub mod chemistry;
/// JSON setup document of a chemistry job.
pub mod setup;
/// Snapshots and pretty-printed tables of states and reactions.
pub mod report;
