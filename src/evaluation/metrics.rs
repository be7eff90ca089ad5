//! Out-of-sample regression metrics and best-model selection

use crate::data::ModelFrame;
use crate::error::{BurnwiseError, PipelineWarning, Result};
use crate::training::TrainedModel;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// R-squared around the mean of `y_true`; 0 when `y_true` is constant
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Ok(Self {
            rmse: (ss_res / n).sqrt(),
            mae,
            r2,
            n_samples: y_true.len(),
        })
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(BurnwiseError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(BurnwiseError::InsufficientData {
            component: "Evaluator",
            required: 1,
            actual: 0,
        });
    }
    Ok(())
}

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mse = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mse.sqrt())
}

/// One row of the metrics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub model: String,
    /// Hyperparameters the final model was fit with
    pub hyperparameters: String,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,
}

impl MetricsRecord {
    pub fn new(model: impl Into<String>, metrics: &RegressionMetrics) -> Self {
        Self {
            model: model.into(),
            hyperparameters: String::new(),
            rmse: metrics.rmse,
            mae: metrics.mae,
            r2: metrics.r2,
            warnings: Vec::new(),
        }
    }

    pub fn with_hyperparameters(mut self, hyperparameters: impl Into<String>) -> Self {
        self.hyperparameters = hyperparameters.into();
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<PipelineWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Best record: lowest RMSE, ties broken by the higher R².
/// Remaining ties keep the earliest record.
pub fn select_best(records: &[MetricsRecord]) -> Option<&MetricsRecord> {
    records.iter().fold(None, |best: Option<&MetricsRecord>, rec| match best {
        None => Some(rec),
        Some(b) => {
            let better = rec.rmse < b.rmse || (rec.rmse == b.rmse && rec.r2 > b.r2);
            if better {
                Some(rec)
            } else {
                Some(b)
            }
        }
    })
}

/// Scores final models on the held-out test frame
#[derive(Debug, Clone, Default)]
pub struct Evaluator;

/// Test-set metrics and predictions of one model
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub record: MetricsRecord,
    pub predictions: Array1<f64>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Predict `test` through the model's own preprocessor and score it
    pub fn evaluate_model(&self, model: &TrainedModel, test: &ModelFrame) -> Result<ModelEvaluation> {
        let predictions = model.predict(test)?;
        let metrics = RegressionMetrics::compute(test.target(), &predictions)?;

        tracing::info!(
            model = model.name(),
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "Evaluated on test set"
        );

        Ok(ModelEvaluation {
            record: MetricsRecord::new(model.name(), &metrics)
                .with_hyperparameters(model.variant().to_string()),
            predictions,
        })
    }

    /// One evaluation per model, in input order
    pub fn evaluate(&self, models: &[TrainedModel], test: &ModelFrame) -> Result<Vec<ModelEvaluation>> {
        models.iter().map(|m| self.evaluate_model(m, test)).collect()
    }
}
