//! Pipeline configuration

use crate::error::{BurnwiseError, Result};
use crate::training::{GbtConfig, ModelFamily};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column predicted by default
pub const DEFAULT_TARGET: &str = "Calories_Burned";

/// Predictor whitelist used when none is configured
pub const DEFAULT_PREDICTORS: [&str; 8] = [
    "Session_Duration",
    "Avg_BPM",
    "Weight",
    "Age",
    "Gender",
    "Workout_Type",
    "Workout_Frequency",
    "Experience_Level",
];

/// Default run seed
pub const DEFAULT_SEED: u64 = 42;

/// Train/test partitioning options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the training set
    pub train_fraction: f64,
    /// Preserve the target distribution by sampling within target deciles
    pub stratify: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.8,
            stratify: false,
        }
    }
}

/// Cross-validation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    pub n_folds: usize,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self { n_folds: 10 }
    }
}

/// Hyperparameter grids for the regularized linear models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizationGrid {
    /// Smallest penalty strength
    pub lambda_min: f64,
    /// Largest penalty strength
    pub lambda_max: f64,
    /// Points on the log-spaced ridge/lasso grid
    pub n_lambdas: usize,
    /// Mixing weights searched for elastic net (1.0 = pure L1)
    pub elastic_net_alphas: Vec<f64>,
    /// Points on the log-spaced elastic net lambda grid
    pub elastic_net_lambdas: usize,
}

impl Default for RegularizationGrid {
    fn default() -> Self {
        Self {
            lambda_min: 1e-4,
            lambda_max: 1.0,
            n_lambdas: 20,
            elastic_net_alphas: vec![0.25, 0.75],
            elastic_net_lambdas: 5,
        }
    }
}

impl RegularizationGrid {
    /// Ridge/lasso penalty grid, ascending
    pub fn lambdas(&self) -> Vec<f64> {
        log_space(self.lambda_min, self.lambda_max, self.n_lambdas)
    }

    /// Elastic net penalty grid, ascending
    pub fn elastic_net_lambdas(&self) -> Vec<f64> {
        log_space(self.lambda_min, self.lambda_max, self.elastic_net_lambdas)
    }
}

/// `n` points spaced evenly in log10 between `low` and `high` inclusive
pub fn log_space(low: f64, high: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![high],
        _ => {
            let (lo, hi) = (low.log10(), high.log10());
            let step = (hi - lo) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        high
                    } else {
                        10f64.powf(lo + step * i as f64)
                    }
                })
                .collect()
        }
    }
}

/// Coordinate-descent budget for lasso and elastic net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iter: usize,
    /// Stop once the summed absolute coefficient change drops below this
    pub tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Residual diagnostics options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualConfig {
    /// Outlier threshold in residual standard deviations
    pub outlier_multiplier: f64,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self {
            outlier_multiplier: 2.0,
        }
    }
}

/// Configuration for a full train/evaluate run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target column name
    pub target: String,
    /// Predictor column whitelist, in model order
    pub predictors: Vec<String>,
    /// Run seed; split, folds and boosting seeds derive from it
    pub seed: u64,
    pub split: SplitConfig,
    pub cv: CvConfig,
    pub grid: RegularizationGrid,
    pub solver: SolverConfig,
    pub gbt: GbtConfig,
    pub residuals: ResidualConfig,
    /// Reject categories unseen during fit instead of encoding them as unknown
    pub strict_categories: bool,
    /// Model families to train
    pub models: Vec<ModelFamily>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            predictors: DEFAULT_PREDICTORS.iter().map(|s| s.to_string()).collect(),
            seed: DEFAULT_SEED,
            split: SplitConfig::default(),
            cv: CvConfig::default(),
            grid: RegularizationGrid::default(),
            solver: SolverConfig::default(),
            gbt: GbtConfig::default(),
            residuals: ResidualConfig::default(),
            strict_categories: true,
            models: ModelFamily::all().to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_predictors<S: AsRef<str>>(mut self, predictors: &[S]) -> Self {
        self.predictors = predictors.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.split.train_fraction = fraction;
        self
    }

    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.split.stratify = stratify;
        self
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.cv.n_folds = n_folds;
        self
    }

    pub fn with_gbt(mut self, gbt: GbtConfig) -> Self {
        self.gbt = gbt;
        self
    }

    /// Coordinate-descent budget for lasso and elastic net
    pub fn with_solver(mut self, max_iter: usize, tol: f64) -> Self {
        self.solver = SolverConfig { max_iter, tol };
        self
    }

    pub fn with_strict_categories(mut self, strict: bool) -> Self {
        self.strict_categories = strict;
        self
    }

    pub fn with_models(mut self, models: &[ModelFamily]) -> Self {
        self.models = models.to_vec();
        self
    }

    pub fn with_outlier_multiplier(mut self, multiplier: f64) -> Self {
        self.residuals.outlier_multiplier = multiplier;
        self
    }

    /// Seed used by the cross-validation fold shuffler
    pub fn cv_seed(&self) -> u64 {
        self.seed.wrapping_add(1)
    }

    /// Seed used by gradient boosting unless the boosting config pins one
    pub fn gbt_seed(&self) -> u64 {
        self.gbt.random_state.unwrap_or_else(|| self.seed.wrapping_add(2))
    }

    /// Check every option for a usable value
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(BurnwiseError::ConfigError("target column name is empty".into()));
        }
        if self.predictors.is_empty() {
            return Err(BurnwiseError::ConfigError("predictor list is empty".into()));
        }
        let f = self.split.train_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(BurnwiseError::invalid_parameter(
                "split.train_fraction",
                f,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.cv.n_folds < 2 {
            return Err(BurnwiseError::invalid_parameter(
                "cv.n_folds",
                self.cv.n_folds,
                "at least 2 folds are required",
            ));
        }
        let g = &self.grid;
        if !(g.lambda_min > 0.0) || g.lambda_min > g.lambda_max {
            return Err(BurnwiseError::invalid_parameter(
                "grid.lambda_min",
                g.lambda_min,
                "must be positive and no larger than lambda_max",
            ));
        }
        if g.n_lambdas == 0 || g.elastic_net_lambdas == 0 {
            return Err(BurnwiseError::ConfigError(
                "regularization grids need at least one lambda".into(),
            ));
        }
        if g.elastic_net_alphas.is_empty() {
            return Err(BurnwiseError::ConfigError(
                "elastic net needs at least one mixing weight".into(),
            ));
        }
        if let Some(a) = g.elastic_net_alphas.iter().find(|a| !(**a > 0.0 && **a <= 1.0)) {
            return Err(BurnwiseError::invalid_parameter(
                "grid.elastic_net_alphas",
                a,
                "mixing weights must lie in (0, 1]",
            ));
        }
        if self.solver.max_iter == 0 || !(self.solver.tol > 0.0) {
            return Err(BurnwiseError::ConfigError(
                "solver needs a positive iteration budget and tolerance".into(),
            ));
        }
        if !(self.residuals.outlier_multiplier > 0.0) {
            return Err(BurnwiseError::invalid_parameter(
                "residuals.outlier_multiplier",
                self.residuals.outlier_multiplier,
                "must be positive",
            ));
        }
        if self.models.is_empty() {
            return Err(BurnwiseError::ConfigError("no model families selected".into()));
        }
        self.gbt.validate()
    }

    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
