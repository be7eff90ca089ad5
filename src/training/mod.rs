//! Model training module
//!
//! Provides the five competing regression families behind one contract:
//! - Ordinary least squares
//! - Ridge, Lasso and ElasticNet (glmnet-style penalties)
//! - Gradient-boosted symmetric trees
//!
//! plus k-fold cross-validation for choosing penalty strengths.

mod engine;
mod models;
pub mod cross_validation;
pub mod gradient_boosting;
pub mod linear_models;

pub use cross_validation::{CVResults, CVSplit, CandidateScore, CrossValidator, GridSearchResult};
pub use engine::{FittedModel, ModelTrainer, TrainedModel};
pub use gradient_boosting::{GbtConfig, GradientBoostedTrees, SymmetricTree};
pub use linear_models::{
    ElasticNetRegression, LassoRegression, LinearFit, LinearRegression, RidgeRegression,
};
pub use models::{FitOutcome, ModelFamily, ModelVariant, Regressor};
