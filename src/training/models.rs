//! Model contract and the fixed catalogue of model families

use super::gradient_boosting::GbtConfig;
use crate::config::RegularizationGrid;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostics of a single fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitOutcome {
    /// Solver iterations (boosting rounds for tree ensembles, 1 for closed forms)
    pub iterations: usize,
    /// False when an iterative solver exhausted its budget
    pub converged: bool,
}

impl FitOutcome {
    /// Outcome of a direct (non-iterative) solve
    pub fn closed_form() -> Self {
        Self {
            iterations: 1,
            converged: true,
        }
    }
}

/// Trait for regression models operating on a preprocessed design matrix
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Normalized feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// The five competing regression families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Ols,
    Ridge,
    Lasso,
    ElasticNet,
    GradientBoostedTrees,
}

impl ModelFamily {
    pub fn all() -> [ModelFamily; 5] {
        [
            ModelFamily::Ols,
            ModelFamily::Ridge,
            ModelFamily::Lasso,
            ModelFamily::ElasticNet,
            ModelFamily::GradientBoostedTrees,
        ]
    }

    /// Display name, also the key of the metrics table
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Ols => "OLS",
            ModelFamily::Ridge => "Ridge",
            ModelFamily::Lasso => "Lasso",
            ModelFamily::ElasticNet => "ElasticNet",
            ModelFamily::GradientBoostedTrees => "GradientBoostedTrees",
        }
    }

    /// Whether the family's hyperparameters are chosen by cross-validation
    pub fn is_tuned(&self) -> bool {
        matches!(
            self,
            ModelFamily::Ridge | ModelFamily::Lasso | ModelFamily::ElasticNet
        )
    }

    /// Hyperparameter candidates in grid order.
    ///
    /// Untuned families yield exactly one candidate.
    pub fn candidates(&self, grid: &RegularizationGrid, gbt: &GbtConfig) -> Vec<ModelVariant> {
        match self {
            ModelFamily::Ols => vec![ModelVariant::Ols],
            ModelFamily::Ridge => grid
                .lambdas()
                .into_iter()
                .map(|lambda| ModelVariant::Ridge { lambda })
                .collect(),
            ModelFamily::Lasso => grid
                .lambdas()
                .into_iter()
                .map(|lambda| ModelVariant::Lasso { lambda })
                .collect(),
            ModelFamily::ElasticNet => {
                let lambdas = grid.elastic_net_lambdas();
                grid.elastic_net_alphas
                    .iter()
                    .flat_map(|&alpha| {
                        lambdas
                            .iter()
                            .map(move |&lambda| ModelVariant::ElasticNet { alpha, lambda })
                    })
                    .collect()
            }
            ModelFamily::GradientBoostedTrees => {
                vec![ModelVariant::GradientBoostedTrees(gbt.clone())]
            }
        }
    }

    /// Parse a family from its display name or snake_case key
    pub fn parse(name: &str) -> Option<Self> {
        let key = name.to_ascii_lowercase().replace(['-', '_'], "");
        match key.as_str() {
            "ols" | "linear" => Some(ModelFamily::Ols),
            "ridge" => Some(ModelFamily::Ridge),
            "lasso" => Some(ModelFamily::Lasso),
            "elasticnet" | "enet" => Some(ModelFamily::ElasticNet),
            "gradientboostedtrees" | "gbt" | "boosting" => Some(ModelFamily::GradientBoostedTrees),
            _ => None,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A model family together with concrete hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelVariant {
    Ols,
    Ridge { lambda: f64 },
    Lasso { lambda: f64 },
    /// `alpha` is the L1 share of the penalty, `lambda` its overall strength
    ElasticNet { alpha: f64, lambda: f64 },
    GradientBoostedTrees(GbtConfig),
}

impl ModelVariant {
    pub fn family(&self) -> ModelFamily {
        match self {
            ModelVariant::Ols => ModelFamily::Ols,
            ModelVariant::Ridge { .. } => ModelFamily::Ridge,
            ModelVariant::Lasso { .. } => ModelFamily::Lasso,
            ModelVariant::ElasticNet { .. } => ModelFamily::ElasticNet,
            ModelVariant::GradientBoostedTrees(_) => ModelFamily::GradientBoostedTrees,
        }
    }

    pub fn name(&self) -> &'static str {
        self.family().name()
    }

    /// Overall penalty strength of a regularized linear variant
    pub fn penalty(&self) -> Option<f64> {
        match self {
            ModelVariant::Ridge { lambda }
            | ModelVariant::Lasso { lambda }
            | ModelVariant::ElasticNet { lambda, .. } => Some(*lambda),
            _ => None,
        }
    }

    /// L1 share of an elastic net penalty
    pub fn l1_ratio(&self) -> Option<f64> {
        match self {
            ModelVariant::ElasticNet { alpha, .. } => Some(*alpha),
            _ => None,
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelVariant::Ols => write!(f, "OLS"),
            ModelVariant::Ridge { lambda } => write!(f, "Ridge(lambda={:.3e})", lambda),
            ModelVariant::Lasso { lambda } => write!(f, "Lasso(lambda={:.3e})", lambda),
            ModelVariant::ElasticNet { alpha, lambda } => {
                write!(f, "ElasticNet(alpha={}, lambda={:.3e})", alpha, lambda)
            }
            ModelVariant::GradientBoostedTrees(c) => write!(
                f,
                "GradientBoostedTrees(iterations={}, learning_rate={}, depth={})",
                c.iterations, c.learning_rate, c.depth
            ),
        }
    }
}
