use std::path::PathBuf;

use thiserror::Error;

/// Any failure that aborts a flow computation.
///
/// No partial result is produced when one of these is returned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("gas property evaluation failed: {0}")]
    PropertyEvaluation(#[from] PropertyEvaluationError),
}

/// The inputs could not be interpreted.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unrecognized {kind} unit `{token}`")]
    UnknownUnit { kind: &'static str, token: String },

    #[error("unrecognized pressure tap location `{0}`")]
    UnknownTap(String),

    #[error("unrecognized gas component `{0}`")]
    UnknownComponent(String),

    #[error("malformed composition entry `{0}`, expected NAME=PERCENT")]
    MalformedComponent(String),

    #[error("missing required input `{0}`")]
    MissingField(&'static str),

    #[error("manual gas properties need z_flowing, z_base and molar_mass together")]
    IncompleteManualProperties,

    #[error("no gas properties given: supply manual values or a composition")]
    MissingGasProperties,

    #[error("could not read run file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse run file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// The inputs are understood but physically invalid for the meter equations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("{quantity} is not a finite number")]
    NotFinite { quantity: &'static str },

    #[error("{quantity} must be positive, got {value}")]
    NotPositive { quantity: &'static str, value: f64 },

    #[error("{quantity} must not be negative, got {value}")]
    Negative { quantity: &'static str, value: f64 },

    #[error("{quantity} of {kelvin} K is at or below absolute zero")]
    BelowAbsoluteZero { quantity: &'static str, kelvin: f64 },

    #[error("{quantity} = {value} is outside (0, 2]")]
    Compressibility { quantity: &'static str, value: f64 },

    #[error("bore ratio {0} is outside (0, 1)")]
    BetaOutOfRange(f64),
}

/// The gas-properties collaborator could not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyEvaluationError {
    #[error("unsupported equation of state method `{0}`")]
    UnsupportedMethod(String),

    #[error("component {component} has a negative share of {percent} %")]
    NegativeComponent { component: &'static str, percent: f64 },

    #[error("composition sums to {0} %, expected 100 %")]
    CompositionTotal(f64),

    #[error("composition rejected by the equation of state: {0}")]
    Rejected(String),

    #[error("equation of state did not converge at {pressure_bar} bar(a), {temperature_k} K")]
    NotConverged {
        pressure_bar: f64,
        temperature_k: f64,
    },
}

impl DomainError {
    pub(crate) fn require_finite(quantity: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NotFinite { quantity })
        }
    }

    pub(crate) fn require_positive(quantity: &'static str, value: f64) -> Result<f64, Self> {
        Self::require_finite(quantity, value)?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(Self::NotPositive { quantity, value })
        }
    }

    pub(crate) fn require_non_negative(quantity: &'static str, value: f64) -> Result<f64, Self> {
        Self::require_finite(quantity, value)?;
        if value >= 0.0 {
            Ok(value)
        } else {
            Err(Self::Negative { quantity, value })
        }
    }

    /// Checks an absolute temperature in kelvin.
    pub(crate) fn require_above_absolute_zero(
        quantity: &'static str,
        kelvin: f64,
    ) -> Result<f64, Self> {
        Self::require_finite(quantity, kelvin)?;
        if kelvin > 0.0 {
            Ok(kelvin)
        } else {
            Err(Self::BelowAbsoluteZero { quantity, kelvin })
        }
    }

    pub(crate) fn require_compressibility(quantity: &'static str, value: f64) -> Result<f64, Self> {
        Self::require_finite(quantity, value)?;
        if value > 0.0 && value <= 2.0 {
            Ok(value)
        } else {
            Err(Self::Compressibility { quantity, value })
        }
    }
}
