//! Error types for schema validation, model loading and dispatch

use thiserror::Error;

/// Request-fatal dispatch failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// One or more schema features were absent from the input record
    #[error("missing required feature(s): {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
}

impl DispatchError {
    /// Names of the missing features
    pub fn missing(&self) -> &[String] {
        match self {
            DispatchError::MissingFeatures(names) => names,
        }
    }
}

/// An artifact exists but could not be turned into a classifier
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read artifact {key}: {source}")]
    Backend {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode artifact {key}: {reason}")]
    Decode { key: String, reason: String },
}

/// Invocation of a loaded classifier failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("feature vector has {actual} values, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite output ({0})")]
    NonFinite(f64),

    #[error("model produced non-binary label {0}")]
    NonBinary(i64),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Invalid target/feature schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema defines no targets")]
    Empty,

    #[error("target {0} is declared more than once")]
    DuplicateTarget(String),

    #[error("target {0} requires no features")]
    NoFeatures(String),

    #[error("target {target} lists feature {feature} more than once")]
    DuplicateFeature { target: String, feature: String },

    #[error("no model families configured")]
    NoFamilies,

    #[error("model family {0} is listed more than once")]
    DuplicateFamily(String),
}

/// Raw form input could not be turned into a feature record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("missing value for {0}")]
    Missing(String),

    #[error("Invalid input for {feature}. Please enter a number.")]
    InvalidNumber { feature: String, value: String },
}
