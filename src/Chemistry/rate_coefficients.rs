//! # Rate coefficient evaluators
//!
//! ## Aim
//! Every reaction carries a type string and an ordered parameter list. The registry
//! (`RateCoeffEnum::from_reaction`) turns them into an evaluator once, at network build time,
//! so that malformed parameters are reported before the first solver iteration.
//!
//! ## Main data structures
//! - `RateCoefficient`: trait implemented by every evaluator, dispatched statically through
//!   `RateCoeffEnum` with `enum_dispatch`
//! - `RateContext`: what an evaluator may read (graph, reactions, working conditions, electron
//!   kinetics results) plus the mutable wall transport cache
//! - `Dependency`: which inputs an evaluator depends on, used to refresh only the reactions
//!   whose inputs changed
//!
//! ## Registered types
//! | type | parameters | k |
//! |---|---|---|
//! | `constantRateCoeff` | `[k]` | k |
//! | `powerLaw` | `[a, b, temperature]` | a·T^b |
//! | `arrheniusRateCoeff` | `[a, b, c, temperature]` | a·T^b·exp(−c/T) |
//! | `eedfRateCoeff` | `[collision description]` (optional) | from the electron kinetics |
//! | `wallTransport` | `[γ, temperature]` | see `wall_transport` |
use crate::Chemistry::chem_errors::{ChemistryError, ConfigError};
use crate::Chemistry::electron_kinetics::ElectronKinetics;
use crate::Chemistry::reaction::{RateCoeffParam, Reaction};
use crate::Chemistry::state_graph::StateGraph;
use crate::Chemistry::wall_transport::{WALL_TRANSPORT, WallTransport, WallTransportCache};
use crate::Chemistry::working_conditions::{TemperatureRef, WorkingConditions};
use enum_dispatch::enum_dispatch;

/// temperatures analytic rate coefficients may refer to
pub const RATE_TEMPERATURES: [&str; 4] = [
    "gasTemperature",
    "nearWallTemperature",
    "wallTemperature",
    "electronTemperature",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dependency {
    pub on_time: bool,
    pub on_densities: bool,
    pub on_gas_temperature: bool,
    pub on_electron_kinetics: bool,
}

impl Dependency {
    pub const NONE: Dependency = Dependency {
        on_time: false,
        on_densities: false,
        on_gas_temperature: false,
        on_electron_kinetics: false,
    };
    pub const ALL: Dependency = Dependency {
        on_time: true,
        on_densities: true,
        on_gas_temperature: true,
        on_electron_kinetics: true,
    };

    pub fn gas_temperature() -> Self {
        Self {
            on_gas_temperature: true,
            ..Self::NONE
        }
    }

    pub fn electron_kinetics() -> Self {
        Self {
            on_electron_kinetics: true,
            ..Self::NONE
        }
    }

    /// true when any input flagged in `self` is flagged in `changed` as well
    pub fn intersects(&self, changed: &Dependency) -> bool {
        (self.on_time && changed.on_time)
            || (self.on_densities && changed.on_densities)
            || (self.on_gas_temperature && changed.on_gas_temperature)
            || (self.on_electron_kinetics && changed.on_electron_kinetics)
    }

    fn of_temperature(temperature: &TemperatureRef) -> Self {
        match temperature {
            TemperatureRef::Value(_) => Self::NONE,
            TemperatureRef::Electron => Self::electron_kinetics(),
            TemperatureRef::Gas | TemperatureRef::NearWall | TemperatureRef::Wall => {
                Self::gas_temperature()
            }
        }
    }
}

/// A single coefficient, or the inelastic/superelastic pair of a reversible electron collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateValue {
    Single(f64),
    Pair { inelastic: f64, superelastic: f64 },
}

impl RateValue {
    pub fn forward(&self) -> f64 {
        match self {
            RateValue::Single(k) => *k,
            RateValue::Pair { inelastic, .. } => *inelastic,
        }
    }

    pub fn backward(&self) -> Option<f64> {
        match self {
            RateValue::Single(_) => None,
            RateValue::Pair { superelastic, .. } => Some(*superelastic),
        }
    }
}

pub struct RateContext<'a> {
    pub graph: &'a StateGraph,
    pub reactions: &'a [Reaction],
    pub conditions: &'a WorkingConditions,
    pub electron_kinetics: Option<&'a dyn ElectronKinetics>,
    pub wall_cache: &'a mut WallTransportCache,
}

#[enum_dispatch]
pub trait RateCoefficient {
    fn evaluate(&self, ctx: &mut RateContext<'_>, reaction: &Reaction) -> Result<RateValue, ChemistryError>;
    fn dependency(&self) -> Dependency;
}

fn invalid(reaction: &Reaction, reason: &str) -> ChemistryError {
    ConfigError::InvalidParameters {
        reaction: reaction.description.clone(),
        reason: reason.to_owned(),
    }
    .into()
}

fn number_param(reaction: &Reaction, index: usize, what: &str) -> Result<f64, ChemistryError> {
    reaction
        .rate_coeff_params
        .get(index)
        .and_then(RateCoeffParam::as_number)
        .ok_or_else(|| invalid(reaction, &format!("parameter {} ({}) must be a number", index + 1, what)))
}

fn temperature_param(reaction: &Reaction, index: usize) -> Result<TemperatureRef, ChemistryError> {
    let name = reaction
        .rate_coeff_params
        .get(index)
        .and_then(RateCoeffParam::as_name)
        .ok_or_else(|| invalid(reaction, &format!("parameter {} must be a temperature name", index + 1)))?;
    Ok(TemperatureRef::from_name(name, &RATE_TEMPERATURES)?)
}

fn expect_len(reaction: &Reaction, len: usize) -> Result<(), ChemistryError> {
    if reaction.rate_coeff_params.len() != len {
        return Err(invalid(
            reaction,
            &format!(
                "{} expects {} parameters, {} given",
                reaction.reaction_type,
                len,
                reaction.rate_coeff_params.len()
            ),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRateCoeff {
    pub value: f64,
}

impl RateCoefficient for ConstantRateCoeff {
    fn evaluate(&self, _ctx: &mut RateContext<'_>, _reaction: &Reaction) -> Result<RateValue, ChemistryError> {
        Ok(RateValue::Single(self.value))
    }

    fn dependency(&self) -> Dependency {
        Dependency::NONE
    }
}

/// a·T^b
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLaw {
    pub a: f64,
    pub b: f64,
    pub temperature: TemperatureRef,
}

impl RateCoefficient for PowerLaw {
    fn evaluate(&self, ctx: &mut RateContext<'_>, _reaction: &Reaction) -> Result<RateValue, ChemistryError> {
        let t = self.temperature.resolve(ctx.conditions)?;
        Ok(RateValue::Single(self.a * t.powf(self.b)))
    }

    fn dependency(&self) -> Dependency {
        Dependency::of_temperature(&self.temperature)
    }
}

/// a·T^b·exp(−c/T), c in K
#[derive(Debug, Clone, PartialEq)]
pub struct Arrhenius {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub temperature: TemperatureRef,
}

impl RateCoefficient for Arrhenius {
    fn evaluate(&self, ctx: &mut RateContext<'_>, _reaction: &Reaction) -> Result<RateValue, ChemistryError> {
        let t = self.temperature.resolve(ctx.conditions)?;
        Ok(RateValue::Single(self.a * t.powf(self.b) * (-self.c / t).exp()))
    }

    fn dependency(&self) -> Dependency {
        Dependency::of_temperature(&self.temperature)
    }
}

/// rate coefficient taken from the electron kinetics results, matched by collision description
#[derive(Debug, Clone, PartialEq)]
pub struct EedfRateCoeff {
    pub collision: String,
}

impl RateCoefficient for EedfRateCoeff {
    fn evaluate(&self, ctx: &mut RateContext<'_>, _reaction: &Reaction) -> Result<RateValue, ChemistryError> {
        let kinetics = ctx
            .electron_kinetics
            .ok_or_else(|| ChemistryError::data_missing(&self.collision, "electron kinetics results"))?;
        let record = kinetics
            .find_rate_coeff(&self.collision)
            .ok_or_else(|| ChemistryError::data_missing(&self.collision, "electron collision rate coefficient"))?;
        Ok(RateValue::Pair {
            inelastic: record.value[0],
            superelastic: record.value[1],
        })
    }

    fn dependency(&self) -> Dependency {
        Dependency::electron_kinetics()
    }
}

impl RateCoefficient for WallTransport {
    fn evaluate(&self, ctx: &mut RateContext<'_>, reaction: &Reaction) -> Result<RateValue, ChemistryError> {
        let k = self.rate_coeff(ctx.graph, ctx.reactions, reaction, ctx.conditions, ctx.wall_cache)?;
        Ok(RateValue::Single(k))
    }

    /// D_red(T) and N change with the gas temperature
    fn dependency(&self) -> Dependency {
        Dependency::gas_temperature()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////
// REGISTRY ////////////////////////////////////////////////////////////////////////////
#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch(RateCoefficient)]
pub enum RateCoeffEnum {
    Constant(ConstantRateCoeff),
    PowerLaw(PowerLaw),
    Arrhenius(Arrhenius),
    Eedf(EedfRateCoeff),
    WallTransport(WallTransport),
}

impl RateCoeffEnum {
    pub fn from_reaction(reaction: &Reaction) -> Result<Self, ChemistryError> {
        match reaction.reaction_type.as_str() {
            "constantRateCoeff" => {
                expect_len(reaction, 1)?;
                Ok(ConstantRateCoeff {
                    value: number_param(reaction, 0, "k")?,
                }
                .into())
            }
            "powerLaw" => {
                expect_len(reaction, 3)?;
                Ok(PowerLaw {
                    a: number_param(reaction, 0, "a")?,
                    b: number_param(reaction, 1, "b")?,
                    temperature: temperature_param(reaction, 2)?,
                }
                .into())
            }
            "arrheniusRateCoeff" => {
                expect_len(reaction, 4)?;
                Ok(Arrhenius {
                    a: number_param(reaction, 0, "a")?,
                    b: number_param(reaction, 1, "b")?,
                    c: number_param(reaction, 2, "c")?,
                    temperature: temperature_param(reaction, 3)?,
                }
                .into())
            }
            "eedfRateCoeff" => {
                let collision = match reaction.rate_coeff_params.first() {
                    None => reaction.description.clone(),
                    Some(RateCoeffParam::Name(name)) => name.clone(),
                    Some(RateCoeffParam::Number(_)) => {
                        return Err(invalid(reaction, "parameter 1 must be a collision description"));
                    }
                };
                Ok(EedfRateCoeff { collision }.into())
            }
            WALL_TRANSPORT => {
                expect_len(reaction, 2)?;
                Ok(WallTransport::from_reaction(reaction)?.into())
            }
            other => Err(ConfigError::UnknownRateCoeffType {
                reaction: reaction.description.clone(),
                reaction_type: other.to_owned(),
            }
            .into()),
        }
    }
}
