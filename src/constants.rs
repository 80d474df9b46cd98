//! Physical constants used across the chemistry engine (SI units unless the name says otherwise).
#![allow(non_upper_case_globals)]

/// Boltzmann constant, J/K
pub const K_B: f64 = 1.380649e-23;
/// Boltzmann constant, eV/K
pub const K_B_EV: f64 = 8.617333262e-5;
/// reduced Planck constant, J*s
pub const H_BAR: f64 = 1.054571817e-34;
/// reduced Planck constant, eV*s
pub const H_BAR_EV: f64 = 6.582119569e-16;
/// elementary charge, C
pub const E_CHARGE: f64 = 1.602176634e-19;
/// electron mass, kg
pub const M_ELECTRON: f64 = 9.1093837015e-31;
/// atomic mass unit, kg
pub const AMU: f64 = 1.66053906660e-27;
/// Avogadro number, 1/mol
pub const N_A: f64 = 6.02214076e23;

/// converts temperature in eV to K
pub fn ev_to_kelvin(t_ev: f64) -> f64 {
    t_ev / K_B_EV
}
