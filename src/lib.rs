//! Burnwise - calories-burned regression over gym session data
//!
//! This crate trains and compares five regression families on a cleaned
//! gym-session table and reports which one predicts `Calories_Burned` best:
//! - Feature selection into typed model frames
//! - Deterministic, seeded train/test partitioning
//! - Leakage-free preprocessing (standardization, one-hot encoding)
//! - OLS, Ridge, Lasso, ElasticNet and gradient-boosted symmetric trees
//! - k-fold cross-validated penalty selection
//! - Test-set metrics and residual diagnostics
//!
//! # Modules
//!
//! - [`data`] - Feature selection, model frames, partitioning, CSV loading
//! - [`preprocessing`] - Scaling and encoding fit on training rows only
//! - [`training`] - Model families, trainer, cross-validation
//! - [`evaluation`] - Metrics, best-model selection, residual analysis
//! - [`pipeline`] - End-to-end orchestration
//! - [`report`] - Serializable run report
//! - [`cli`] - Command-line interface

pub mod error;
pub mod config;

pub mod data;
pub mod preprocessing;
pub mod training;
pub mod evaluation;

pub mod pipeline;
pub mod report;

pub mod cli;

pub use error::{BurnwiseError, PipelineWarning, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::data::{
        DataLoader, FeatureColumn, FeatureSelector, FeatureSpec, ModelFrame, Partitioner, Split,
    };
    pub use crate::error::{BurnwiseError, PipelineWarning, Result};
    pub use crate::evaluation::{
        select_best, Evaluator, MetricsRecord, ResidualAnalysis, ResidualAnalyzer,
    };
    pub use crate::pipeline::{Pipeline, PipelineRun};
    pub use crate::preprocessing::{FittedPreprocessor, Preprocessor};
    pub use crate::report::PipelineReport;
    pub use crate::training::{
        CrossValidator, GbtConfig, ModelFamily, ModelTrainer, ModelVariant, Regressor,
        TrainedModel,
    };
}
