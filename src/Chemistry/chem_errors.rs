//! # Error taxonomy of the chemistry engine
//!
//! Every failure is fatal for the current job: network construction errors stop the run
//! before any solver iteration, evaluation errors are returned to the caller mid-iteration.
//! Variants carry structured context (reaction description, state name, field name); the
//! human-readable text is produced by `Display` only.
use thiserror::Error;

/// Malformed reaction or state text
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("'{text}' does not match the expected grammar: {expected}")]
    Grammar { text: String, expected: String },
    #[error("range variable '{variable}' is declared twice in reaction '{equation}'")]
    DuplicateRange { variable: char, equation: String },
    #[error("range variable '{variable}' used but not declared among reactants of '{equation}'")]
    UndeclaredRangeVariable { variable: char, equation: String },
    #[error("more than one 'gas' placeholder on one side of reaction '{equation}'")]
    UnbalancedPlaceholder { equation: String },
    #[error("reaction '{equation}' creates or destroys the 'wall' placeholder")]
    CreateDestroyWall { equation: String },
    #[error("reaction '{equation}' creates or destroys the 'gas' placeholder")]
    CreateDestroyGas { equation: String },
    #[error("level expression '{expression}' evaluates to an invalid level in '{equation}'")]
    InvalidLevel { expression: String, equation: String },
}

/// Inconsistent or missing configuration (working conditions, parameters, probabilities)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("working condition '{0}' is not defined")]
    MissingWorkingCondition(String),
    #[error("unknown temperature '{name}' (allowed: {allowed})")]
    UnknownTemperature { name: String, allowed: String },
    #[error("sticking probability {value} of reaction '{reaction}' is outside (0, 1]")]
    StickingProbabilityOutOfRange { reaction: String, value: f64 },
    #[error("total sticking probability {value} of species '{state}' is outside (0, 1]")]
    TotalStickingOutOfRange { state: String, value: f64 },
    #[error("transport reaction '{reaction}' has type '{found}' but species '{state}' is lost through '{expected}'")]
    InconsistentTransportType {
        reaction: String,
        state: String,
        expected: String,
        found: String,
    },
    #[error("unknown rate coefficient type '{reaction_type}' in reaction '{reaction}'")]
    UnknownRateCoeffType {
        reaction: String,
        reaction_type: String,
    },
    #[error("invalid parameters for reaction '{reaction}': {reason}")]
    InvalidParameters { reaction: String, reason: String },
    #[error("populations of the group of '{state}' sum to {sum} instead of 1")]
    PopulationNotNormalised { state: String, sum: f64 },
    #[error("unknown property '{property}' for '{target}'")]
    UnknownProperty { target: String, property: String },
    #[error("unknown function '{function}' for property '{property}'")]
    UnknownFunction { property: String, function: String },
}

#[derive(Debug, Error)]
pub enum ChemistryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("state '{state}' has no '{field}' defined")]
    DataMissing { state: String, field: String },
    #[error("state labels '{labels}' are ambiguous, candidates: {candidates:?}")]
    AmbiguousState {
        labels: String,
        candidates: Vec<String>,
    },
    #[error("gas '{0}' was not declared")]
    UndeclaredGas(String),
    #[error("state '{0}' does not exist")]
    UnknownState(String),
    #[error("state '{state}' is not of {expected} type")]
    InvalidStateType { state: String, expected: String },
    #[error("numerical failure in {context}: {reason}")]
    Numerics { context: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ChemistryError {
    pub fn data_missing(state: &str, field: &str) -> Self {
        ChemistryError::DataMissing {
            state: state.to_owned(),
            field: field.to_owned(),
        }
    }
}
