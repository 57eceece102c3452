//! Error types for reviews and configuration loading

use thiserror::Error;

use crate::dimension::Dimension;

/// Errors that fail a review outright.
///
/// These are deterministic functions of bad input; retrying never helps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    /// Required dimension absent with no configured default
    #[error("missing required dimension: {0}")]
    MissingDimension(Dimension),

    /// Score or confidence outside [0, 1] (or not finite)
    #[error("{field} for dimension '{dimension}' out of range [0, 1]: {value}")]
    InvalidRange {
        dimension: Dimension,
        field: &'static str,
        value: f64,
    },
}

/// Result type for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Errors raised while loading or validating configuration.
///
/// Every variant is raised before any review can observe the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading a configuration file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A dimension has no entry in the configuration
    #[error("dimension '{0}' is not configured")]
    UnconfiguredDimension(Dimension),

    /// Negative or non-finite weight
    #[error("invalid weight for dimension '{dimension}': {value}")]
    InvalidWeight { dimension: Dimension, value: f64 },

    /// Weights do not sum to 1.0 within tolerance
    #[error("weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    /// Negative or non-finite variance scale
    #[error("invalid variance scale for dimension '{dimension}': {value}")]
    InvalidVarianceScale { dimension: Dimension, value: f64 },

    /// Configured default output outside [0, 1]
    #[error("invalid default output for dimension '{0}'")]
    InvalidDefault(Dimension),

    /// Verdict bands not ordered within [0, 1]
    #[error("invalid verdict bands: mixed_min={mixed_min}, reliable_min={reliable_min}")]
    InvalidBands { mixed_min: f64, reliable_min: f64 },

    /// Interval multiplier must be positive and finite
    #[error("invalid interval z: {0}")]
    InvalidIntervalZ(f64),

    /// Override rule cannot be evaluated
    #[error("malformed override rule '{rule}': {reason}")]
    MalformedPredicate { rule: String, reason: String },

    /// Two override rules share an id
    #[error("duplicate override rule id: {0}")]
    DuplicateRule(String),

    /// Dimension dependency is inconsistent
    #[error("invalid dimension dependency '{id}': {reason}")]
    InvalidDependency { id: String, reason: String },

    /// Audit thresholds or weights are out of range
    #[error("invalid audit setting '{setting}': {reason}")]
    InvalidAuditSetting { setting: &'static str, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
