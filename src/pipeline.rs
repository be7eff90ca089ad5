//! End-to-end train/evaluate run

use crate::config::PipelineConfig;
use crate::data::{FeatureSelector, FeatureSpec, ModelFrame, Partitioner, Split};
use crate::error::{BurnwiseError, PipelineWarning, Result};
use crate::evaluation::{select_best, Evaluator, MetricsRecord, ResidualAnalyzer};
use crate::report::{CvSummary, FeatureImportance, PipelineReport, SplitSummary};
use crate::training::{
    CrossValidator, GridSearchResult, ModelFamily, ModelTrainer, ModelVariant, TrainedModel,
};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::time::Instant;

/// Everything a run produces: the fitted models plus the serializable report
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub split: Split,
    /// Final model per family, in configured order
    pub models: Vec<TrainedModel>,
    pub report: PipelineReport,
}

impl PipelineRun {
    pub fn model(&self, name: &str) -> Option<&TrainedModel> {
        self.models.iter().find(|m| m.name() == name)
    }

    pub fn best_model(&self) -> Option<&TrainedModel> {
        self.model(&self.report.best_model.model)
    }
}

/// Final fit of one family plus what its search produced
struct FamilyOutcome {
    model: TrainedModel,
    search: Option<GridSearchResult>,
    warnings: Vec<PipelineWarning>,
}

/// Feature selection, partitioning, training, evaluation and residual analysis
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on a cleaned session table
    pub fn run(&self, df: &DataFrame) -> Result<PipelineRun> {
        let spec = FeatureSpec::from_config(&self.config)?;
        let frame = FeatureSelector::new(spec).select(df)?;
        self.run_frame(&frame)
    }

    /// Run on an already selected frame
    pub fn run_frame(&self, frame: &ModelFrame) -> Result<PipelineRun> {
        let start = Instant::now();
        let config = &self.config;

        let split = Partitioner::from_config(config).split(frame.target())?;
        if split.n_train() < config.cv.n_folds {
            return Err(BurnwiseError::InsufficientData {
                component: "Partitioner",
                required: config.cv.n_folds,
                actual: split.n_train(),
            });
        }
        let train = frame.take(&split.train_indices);
        let test = frame.take(&split.test_indices);

        tracing::info!(
            rows = frame.n_rows(),
            train = split.n_train(),
            test = split.n_test(),
            seed = config.seed,
            "Starting pipeline"
        );

        let outcomes: Vec<FamilyOutcome> = config
            .models
            .par_iter()
            .map(|&family| self.train_family(family, &train))
            .collect::<Result<Vec<_>>>()?;

        let evaluator = Evaluator::new();
        let mut metrics = Vec::with_capacity(outcomes.len());
        let mut predictions = Vec::with_capacity(outcomes.len());
        let mut warnings = Vec::new();
        let mut cross_validation = Vec::new();
        for outcome in &outcomes {
            let evaluation = evaluator.evaluate_model(&outcome.model, &test)?;
            metrics.push(evaluation.record.with_warnings(outcome.warnings.clone()));
            predictions.push(evaluation.predictions);
            warnings.extend(outcome.warnings.iter().cloned());
            if let Some(search) = &outcome.search {
                cross_validation.push(CvSummary::from_search(search));
            }
        }

        let best_idx = best_index(&metrics)?;
        let best = &outcomes[best_idx].model;
        tracing::info!(
            model = best.name(),
            rmse = metrics[best_idx].rmse,
            r2 = metrics[best_idx].r2,
            "Selected best model"
        );

        let residuals = ResidualAnalyzer::new(config.residuals.outlier_multiplier).analyze(
            &split.test_indices,
            test.target(),
            &predictions[best_idx],
        )?;

        let feature_importances = best
            .feature_importances()
            .unwrap_or_default()
            .into_iter()
            .map(|(feature, importance)| FeatureImportance {
                feature,
                importance,
            })
            .collect();

        let report = PipelineReport {
            generated_at: chrono::Utc::now(),
            config: config.clone(),
            split: SplitSummary {
                n_rows: frame.n_rows(),
                n_train: split.n_train(),
                n_test: split.n_test(),
                stratified: config.split.stratify,
            },
            feature_names: best.preprocessor().feature_names().to_vec(),
            cross_validation,
            best_model: metrics[best_idx].clone(),
            metrics,
            residuals,
            feature_importances,
            warnings,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        Ok(PipelineRun {
            split,
            models: outcomes.into_iter().map(|o| o.model).collect(),
            report,
        })
    }

    fn train_family(&self, family: ModelFamily, train: &ModelFrame) -> Result<FamilyOutcome> {
        let config = &self.config;
        let trainer = ModelTrainer::from_config(config);
        let candidates = family.candidates(&config.grid, &config.gbt);

        let (variant, search) = if family.is_tuned() {
            let search = CrossValidator::from_config(config)
                .with_trainer(trainer.clone())
                .grid_search(train, family, &candidates)?;
            (search.best.clone(), Some(search))
        } else {
            let variant = candidates.into_iter().next().ok_or_else(|| {
                BurnwiseError::ConfigError(format!("no configuration for {}", family))
            })?;
            (self.seeded(variant), None)
        };

        let model = trainer.fit(train, &variant)?;
        let mut warnings = search.as_ref().map(|s| s.warnings.clone()).unwrap_or_default();
        if !model.outcome().converged {
            warnings.push(PipelineWarning::ConvergenceWarning {
                model: family.name().to_string(),
                iterations: model.outcome().iterations,
                context: format!("final refit with {}", variant),
            });
        }
        for warning in &warnings {
            tracing::warn!(model = family.name(), "{}", warning);
        }

        tracing::info!(
            model = family.name(),
            variant = %variant,
            iterations = model.outcome().iterations,
            secs = model.training_time_secs(),
            "Trained final model"
        );

        Ok(FamilyOutcome {
            model,
            search,
            warnings,
        })
    }

    /// Pin the boosting seed to the one derived from the run seed
    fn seeded(&self, variant: ModelVariant) -> ModelVariant {
        match variant {
            ModelVariant::GradientBoostedTrees(mut gbt) => {
                gbt.random_state = Some(self.config.gbt_seed());
                ModelVariant::GradientBoostedTrees(gbt)
            }
            other => other,
        }
    }
}

fn best_index(metrics: &[MetricsRecord]) -> Result<usize> {
    let best = select_best(metrics)
        .ok_or_else(|| BurnwiseError::ConfigError("no model families selected".into()))?;
    Ok(metrics
        .iter()
        .position(|m| std::ptr::eq(m, best))
        .unwrap_or(0))
}
