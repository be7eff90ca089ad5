//! Serializable summary of a pipeline run

use crate::config::PipelineConfig;
use crate::error::{PipelineWarning, Result};
use crate::evaluation::{MetricsRecord, ResidualAnalysis};
use crate::training::{GridSearchResult, ModelFamily, ModelVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sizes of the train/test partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub stratified: bool,
}

/// Cross-validated RMSE of one grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub hyperparameters: ModelVariant,
    pub mean_rmse: f64,
    pub std_rmse: f64,
    pub folds_scored: usize,
}

/// Grid search outcome for one tuned family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSummary {
    pub family: ModelFamily,
    pub selected: ModelVariant,
    pub cv_rmse: f64,
    pub candidates: Vec<CandidateSummary>,
}

impl CvSummary {
    pub fn from_search(search: &GridSearchResult) -> Self {
        Self {
            family: search.family,
            selected: search.best.clone(),
            cv_rmse: search.best_score,
            candidates: search
                .candidates
                .iter()
                .map(|c| CandidateSummary {
                    hyperparameters: c.variant.clone(),
                    mean_rmse: c.results.mean_score,
                    std_rmse: c.results.std_score,
                    folds_scored: c.results.n_folds,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything a run reports: metrics table, best model, residual diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub generated_at: DateTime<Utc>,
    /// Configuration the run used
    pub config: PipelineConfig,
    pub split: SplitSummary,
    /// Design-matrix columns of the best model
    pub feature_names: Vec<String>,
    pub cross_validation: Vec<CvSummary>,
    /// One test-set record per trained family, in configured order
    pub metrics: Vec<MetricsRecord>,
    pub best_model: MetricsRecord,
    pub residuals: ResidualAnalysis,
    /// Importances of the best model, descending
    pub feature_importances: Vec<FeatureImportance>,
    pub warnings: Vec<PipelineWarning>,
    pub elapsed_secs: f64,
}

impl PipelineReport {
    pub fn metrics_for(&self, model: &str) -> Option<&MetricsRecord> {
        self.metrics.iter().find(|m| m.model == model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the report as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Plain-text rendering for terminals and logs
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Burnwise Training Report ===\n\n");
        out.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        out.push_str(&format!("Target:    {}\n", self.config.target));
        out.push_str(&format!("Seed:      {}\n\n", self.config.seed));

        out.push_str("--- Data ---\n");
        out.push_str(&format!("Rows:      {}\n", self.split.n_rows));
        out.push_str(&format!("Train:     {}\n", self.split.n_train));
        out.push_str(&format!("Test:      {}\n\n", self.split.n_test));

        if !self.cross_validation.is_empty() {
            out.push_str(&format!(
                "--- Cross-Validation ({} folds) ---\n",
                self.config.cv.n_folds
            ));
            for cv in &self.cross_validation {
                out.push_str(&format!(
                    "  {:<22} {:<36} CV RMSE {:.4}\n",
                    cv.family.name(),
                    cv.selected.to_string(),
                    cv.cv_rmse
                ));
            }
            out.push('\n');
        }

        out.push_str("--- Test Metrics ---\n");
        out.push_str(&format!(
            "  {:<22} {:>10} {:>10} {:>8}\n",
            "Model", "RMSE", "MAE", "R²"
        ));
        for m in &self.metrics {
            let marker = if m.model == self.best_model.model { "*" } else { " " };
            out.push_str(&format!(
                "{} {:<22} {:>10.4} {:>10.4} {:>8.4}\n",
                marker, m.model, m.rmse, m.mae, m.r2
            ));
        }
        out.push('\n');

        let summary = &self.residuals.summary;
        out.push_str(&format!("--- Residuals ({}) ---\n", self.best_model.model));
        out.push_str(&format!("Mean:      {:.4}\n", summary.mean));
        out.push_str(&format!("Std dev:   {:.4}\n", summary.std_dev));
        out.push_str(&format!(
            "Outliers:  {} beyond ±{:.4}\n",
            summary.outlier_count, summary.threshold
        ));
        out.push_str(&format!(
            "Shape:     {} (skew {:.3}), {} (excess kurtosis {:.3})\n\n",
            summary.skew_shape, summary.skewness, summary.tail_shape, summary.excess_kurtosis
        ));

        if !self.feature_importances.is_empty() {
            out.push_str("--- Feature Importance ---\n");
            for f in &self.feature_importances {
                out.push_str(&format!("  {:<28} {:.4}\n", f.feature, f.importance));
            }
            out.push('\n');
        }

        if !self.warnings.is_empty() {
            out.push_str("--- Warnings ---\n");
            for w in &self.warnings {
                out.push_str(&format!("  {}\n", w));
            }
        }

        out
    }
}
