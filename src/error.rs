//! Error types for the burnwise modeling pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BurnwiseError>;

/// Main error type for the pipeline.
///
/// Structural problems (schema, data volume, unseen categories) abort a run.
/// Recoverable numerical problems are reported as [`PipelineWarning`] instead.
#[derive(Error, Debug)]
pub enum BurnwiseError {
    #[error("Schema error in column '{column}' ({component}): {reason}")]
    SchemaError {
        component: &'static str,
        column: String,
        reason: String,
    },

    #[error("Insufficient data for {component}: need at least {required} rows, got {actual}")]
    InsufficientData {
        component: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Unseen category '{value}' in column '{column}' (not observed during fit)")]
    UnseenCategory { column: String, value: String },

    #[error("Every cross-validation fold for {model} has a constant target; nothing to score")]
    DegenerateFold { model: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl BurnwiseError {
    /// Name of the pipeline component that raised the error
    pub fn component(&self) -> &'static str {
        match self {
            BurnwiseError::SchemaError { component, .. }
            | BurnwiseError::InsufficientData { component, .. } => component,
            BurnwiseError::UnseenCategory { .. } => "Preprocessor",
            BurnwiseError::DegenerateFold { .. } => "CrossValidator",
            BurnwiseError::TrainingError(_)
            | BurnwiseError::ModelNotFitted
            | BurnwiseError::ComputationError(_)
            | BurnwiseError::ShapeError { .. } => "ModelTrainer",
            BurnwiseError::ConfigError(_) | BurnwiseError::InvalidParameter { .. } => "Config",
            BurnwiseError::DataError(_)
            | BurnwiseError::IoError(_)
            | BurnwiseError::SerializationError(_) => "IO",
        }
    }

    pub(crate) fn invalid_parameter(
        name: impl Into<String>,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        BurnwiseError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for BurnwiseError {
    fn from(err: polars::error::PolarsError) -> Self {
        BurnwiseError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for BurnwiseError {
    fn from(err: serde_json::Error) -> Self {
        BurnwiseError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BurnwiseError {
    fn from(err: ndarray::ShapeError) -> Self {
        BurnwiseError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Numerical problems recovered locally and annotated on the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Coordinate descent ran out of iterations; the last iterate was kept
    ConvergenceWarning {
        model: String,
        iterations: usize,
        context: String,
    },
    /// A CV fold with a constant held-out target was left out of the mean
    DegenerateFold {
        model: String,
        fold: usize,
    },
}

impl PipelineWarning {
    pub fn model(&self) -> &str {
        match self {
            PipelineWarning::ConvergenceWarning { model, .. } => model,
            PipelineWarning::DegenerateFold { model, .. } => model,
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::ConvergenceWarning {
                model,
                iterations,
                context,
            } => write!(
                f,
                "{}: solver did not converge within {} iterations ({})",
                model, iterations, context
            ),
            PipelineWarning::DegenerateFold { model, fold } => write!(
                f,
                "{}: fold {} has zero target variance and was skipped",
                model, fold
            ),
        }
    }
}
