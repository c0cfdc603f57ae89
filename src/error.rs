//! Configuration errors
//!
//! Everything that can go wrong while building a circuit or loading tuning is
//! a one-time setup bug, so it surfaces here at construction time. The tick
//! path itself never fails.

use std::fmt;

/// Error returned while validating tuning or building a circuit.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A placement's track fraction is outside [0, 1).
    FractionOutOfRange {
        what: &'static str,
        index: usize,
        value: f32,
    },
    /// A length, width, height or constant is non-finite or out of range.
    InvalidValue { what: &'static str, value: f32 },
    /// A centerline or bridge path has too few distinct points.
    DegeneratePath { what: &'static str, points: usize },
    /// Corner radius does not fit inside the rectangle half-extents.
    CornerRadius { radius: f32, max: f32 },
    /// JSON could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FractionOutOfRange { what, index, value } => {
                write!(f, "{what} #{index}: track fraction {value} is outside [0, 1)")
            }
            Self::InvalidValue { what, value } => write!(f, "invalid {what}: {value}"),
            Self::DegeneratePath { what, points } => {
                write!(f, "{what} needs at least 2 distinct points, got {points}")
            }
            Self::CornerRadius { radius, max } => {
                write!(f, "corner radius {radius} exceeds the largest allowed radius {max}")
            }
            Self::Parse(msg) => write!(f, "could not parse configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Reject non-finite and non-positive values.
pub(crate) fn require_positive(what: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue { what, value })
    }
}

/// Reject non-finite and negative values.
pub(crate) fn require_non_negative(what: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue { what, value })
    }
}

/// Track fractions live in [0, 1).
pub(crate) fn require_fraction(
    what: &'static str,
    index: usize,
    value: f32,
) -> Result<f32, ConfigError> {
    if value.is_finite() && (0.0..1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::FractionOutOfRange { what, index, value })
    }
}
