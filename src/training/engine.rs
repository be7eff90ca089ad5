//! Training engine: preprocessing plus model fit behind one contract

use super::gradient_boosting::GradientBoostedTrees;
use super::linear_models::{
    ElasticNetRegression, LassoRegression, LinearRegression, RidgeRegression,
};
use super::models::{FitOutcome, ModelVariant, Regressor};
use crate::config::{PipelineConfig, SolverConfig};
use crate::data::ModelFrame;
use crate::error::Result;
use crate::preprocessing::{FittedPreprocessor, Preprocessor};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Enum to hold fitted model state per family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    LinearRegression(LinearRegression),
    RidgeRegression(RidgeRegression),
    LassoRegression(LassoRegression),
    ElasticNetRegression(ElasticNetRegression),
    GradientBoostedTrees(GradientBoostedTrees),
}

impl FittedModel {
    /// Unfitted model for `variant`
    fn for_variant(variant: &ModelVariant, solver: &SolverConfig) -> Self {
        match variant {
            ModelVariant::Ols => FittedModel::LinearRegression(LinearRegression::new()),
            ModelVariant::Ridge { lambda } => {
                FittedModel::RidgeRegression(RidgeRegression::new(*lambda))
            }
            ModelVariant::Lasso { lambda } => FittedModel::LassoRegression(
                LassoRegression::new(*lambda).with_solver(solver.max_iter, solver.tol),
            ),
            ModelVariant::ElasticNet { alpha, lambda } => FittedModel::ElasticNetRegression(
                ElasticNetRegression::new(*lambda, *alpha).with_solver(solver.max_iter, solver.tol),
            ),
            ModelVariant::GradientBoostedTrees(config) => {
                FittedModel::GradientBoostedTrees(GradientBoostedTrees::new(config.clone()))
            }
        }
    }

    fn regressor(&self) -> &dyn Regressor {
        match self {
            FittedModel::LinearRegression(m) => m,
            FittedModel::RidgeRegression(m) => m,
            FittedModel::LassoRegression(m) => m,
            FittedModel::ElasticNetRegression(m) => m,
            FittedModel::GradientBoostedTrees(m) => m,
        }
    }

    fn regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            FittedModel::LinearRegression(m) => m,
            FittedModel::RidgeRegression(m) => m,
            FittedModel::LassoRegression(m) => m,
            FittedModel::ElasticNetRegression(m) => m,
            FittedModel::GradientBoostedTrees(m) => m,
        }
    }
}

/// A model fit on one training frame, with the preprocessing state of that frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    variant: ModelVariant,
    preprocessor: FittedPreprocessor,
    model: FittedModel,
    outcome: FitOutcome,
    n_train: usize,
    training_time_secs: f64,
}

impl TrainedModel {
    pub fn name(&self) -> &'static str {
        self.variant.name()
    }

    pub fn variant(&self) -> &ModelVariant {
        &self.variant
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn outcome(&self) -> FitOutcome {
        self.outcome
    }

    pub fn n_train(&self) -> usize {
        self.n_train
    }

    pub fn training_time_secs(&self) -> f64 {
        self.training_time_secs
    }

    /// Predict through the stored preprocessor; nothing is refit
    pub fn predict(&self, frame: &ModelFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(frame)?;
        self.model.regressor().predict(&x)
    }

    /// Importances keyed by design-matrix feature name, descending
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.model.regressor().feature_importances()?;
        let mut named: Vec<(String, f64)> = self
            .preprocessor
            .feature_names()
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        named.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(named)
    }
}

/// Fits any [`ModelVariant`] on a [`ModelFrame`]
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    preprocessor: Preprocessor,
    solver: SolverConfig,
}

impl ModelTrainer {
    pub fn new(strict_categories: bool) -> Self {
        Self {
            preprocessor: Preprocessor::new(strict_categories),
            solver: SolverConfig::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.strict_categories).with_solver(config.solver.clone())
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn strict_categories(&self) -> bool {
        self.preprocessor.strict_categories()
    }

    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    /// Refit the preprocessor on `frame`, then fit `variant` on the result
    pub fn fit(&self, frame: &ModelFrame, variant: &ModelVariant) -> Result<TrainedModel> {
        let start = Instant::now();

        let preprocessor = self.preprocessor.fit(frame)?;
        let x = preprocessor.transform(frame)?;

        let mut model = FittedModel::for_variant(variant, &self.solver);
        let outcome = model.regressor_mut().fit(&x, frame.target())?;

        Ok(TrainedModel {
            variant: variant.clone(),
            preprocessor,
            model,
            outcome,
            n_train: frame.n_rows(),
            training_time_secs: start.elapsed().as_secs_f64(),
        })
    }
}
