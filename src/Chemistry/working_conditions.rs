//! # Working conditions
//!
//! Macroscopic scalars of the discharge (temperatures, field, chamber geometry, gas density,
//! time). The driver writes them between solve steps; rate coefficient evaluators and
//! population closures only read them. Every value is optional so that a missing datum is
//! reported by name instead of silently replaced.
//!
//! ## Configuration format
//! ```json
//! {
//!   "gasTemperature": 300.0,
//!   "wallTemperature": 320.0,
//!   "electronTemperature": 1.5,
//!   "chamberRadius": 0.01,
//!   "chamberLength": 0.0,
//!   "gasDensity": 2.4e22
//! }
//! ```
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::constants::ev_to_kelvin;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingConditions {
    /// K
    pub gas_temperature: Option<f64>,
    /// K
    pub near_wall_temperature: Option<f64>,
    /// K
    pub wall_temperature: Option<f64>,
    /// eV
    pub electron_temperature: Option<f64>,
    /// m^-3
    pub electron_density: Option<f64>,
    /// Td
    pub reduced_field: Option<f64>,
    /// m, 0 for an infinite cylinder
    pub chamber_length: Option<f64>,
    /// m, 0 for an infinite slab
    pub chamber_radius: Option<f64>,
    /// m^-3
    pub gas_density: Option<f64>,
    /// Pa
    pub gas_pressure: Option<f64>,
    /// s
    pub current_time: Option<f64>,
}

impl WorkingConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ChemistryError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChemistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// value of a working condition by its symbolic (camelCase) name
    pub fn get(&self, name: &str) -> Result<f64, ChemistryError> {
        let value = match name {
            "gasTemperature" => self.gas_temperature,
            "nearWallTemperature" => self.near_wall_temperature,
            "wallTemperature" => self.wall_temperature,
            "electronTemperature" => self.electron_temperature,
            "electronDensity" => self.electron_density,
            "reducedField" => self.reduced_field,
            "chamberLength" => self.chamber_length,
            "chamberRadius" => self.chamber_radius,
            "gasDensity" => self.gas_density,
            "gasPressure" => self.gas_pressure,
            "currentTime" => self.current_time,
            _ => None,
        };
        value.ok_or_else(|| ConfigError::MissingWorkingCondition(name.to_owned()).into())
    }

    pub fn gas_temperature(&self) -> Result<f64, ChemistryError> {
        self.get("gasTemperature")
    }

    pub fn gas_density(&self) -> Result<f64, ChemistryError> {
        self.get("gasDensity")
    }
}

/// Reference to a temperature: a literal value in K or a symbolic working-condition name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TemperatureRef {
    Value(f64),
    Gas,
    NearWall,
    Wall,
    /// stored in eV, resolved in K
    Electron,
}

impl TemperatureRef {
    /// parses a symbolic name; `allowed` restricts which names the caller accepts
    pub fn from_name(name: &str, allowed: &[&str]) -> Result<Self, ConfigError> {
        let unknown = || ConfigError::UnknownTemperature {
            name: name.to_owned(),
            allowed: allowed.join(", "),
        };
        if !allowed.contains(&name) {
            return Err(unknown());
        }
        match name {
            "gasTemperature" => Ok(TemperatureRef::Gas),
            "nearWallTemperature" => Ok(TemperatureRef::NearWall),
            "wallTemperature" => Ok(TemperatureRef::Wall),
            "electronTemperature" => Ok(TemperatureRef::Electron),
            _ => Err(unknown()),
        }
    }

    pub fn is_gas_temperature(&self) -> bool {
        matches!(self, TemperatureRef::Gas)
    }

    /// temperature in K
    pub fn resolve(&self, conditions: &WorkingConditions) -> Result<f64, ChemistryError> {
        match self {
            TemperatureRef::Value(t) => Ok(*t),
            TemperatureRef::Gas => conditions.get("gasTemperature"),
            TemperatureRef::NearWall => conditions.get("nearWallTemperature"),
            TemperatureRef::Wall => conditions.get("wallTemperature"),
            TemperatureRef::Electron => Ok(ev_to_kelvin(conditions.get("electronTemperature")?)),
        }
    }
}
