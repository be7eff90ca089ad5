//! K-fold cross-validation and grid search

use super::engine::ModelTrainer;
use super::models::{ModelFamily, ModelVariant};
use crate::config::PipelineConfig;
use crate::data::ModelFrame;
use crate::error::{BurnwiseError, PipelineWarning, Result};
use crate::evaluation::rmse;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single train/validation split of the training partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each scored fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: f64::NAN,
                std_score: f64::NAN,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance =
            scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
        }
    }
}

/// Validation RMSE of one grid candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub variant: ModelVariant,
    pub results: CVResults,
    /// Fold fits whose solver ran out of iterations
    pub unconverged_fits: usize,
}

/// Outcome of searching one family's grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub family: ModelFamily,
    pub best: ModelVariant,
    pub best_score: f64,
    /// Every candidate, in grid order
    pub candidates: Vec<CandidateScore>,
    pub warnings: Vec<PipelineWarning>,
}

/// Seeded k-fold splitter and grid searcher
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_folds: usize,
    random_state: u64,
    trainer: ModelTrainer,
}

impl CrossValidator {
    pub fn new(n_folds: usize, random_state: u64) -> Self {
        Self {
            n_folds,
            random_state,
            trainer: ModelTrainer::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.cv.n_folds, config.cv_seed()).with_trainer(ModelTrainer::from_config(config))
    }

    /// Trainer used for every fold fit
    pub fn with_trainer(mut self, trainer: ModelTrainer) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Shuffle `0..n_samples` and cut it into `n_folds` folds whose sizes
    /// differ by at most one
    pub fn k_fold_split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_folds;
        if n_splits < 2 {
            return Err(BurnwiseError::invalid_parameter(
                "n_folds",
                n_splits,
                "at least 2 folds are required",
            ));
        }
        if n_samples < n_splits {
            return Err(BurnwiseError::InsufficientData {
                component: "CrossValidator",
                required: n_splits,
                actual: n_samples,
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        indices.shuffle(&mut rng);

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let mut test_indices = indices[current..current + fold_size].to_vec();
            let mut train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();
            test_indices.sort_unstable();
            train_indices.sort_unstable();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }

    /// Score every candidate by mean validation RMSE and pick the lowest.
    ///
    /// Ties go to the stronger penalty (larger lambda, then larger L1 share).
    /// Folds whose held-out target is constant are skipped.
    pub fn grid_search(
        &self,
        frame: &ModelFrame,
        family: ModelFamily,
        candidates: &[ModelVariant],
    ) -> Result<GridSearchResult> {
        if candidates.is_empty() {
            return Err(BurnwiseError::ConfigError(format!(
                "no hyperparameter candidates for {}",
                family
            )));
        }

        let splits = self.k_fold_split(frame.n_rows())?;
        let mut warnings = Vec::new();
        let mut folds = Vec::with_capacity(splits.len());
        for split in splits {
            let held_out = frame.take(&split.test_indices);
            if has_zero_variance(held_out.target().as_slice().unwrap_or(&[])) {
                tracing::warn!(model = family.name(), fold = split.fold_idx, "Skipping degenerate fold");
                warnings.push(PipelineWarning::DegenerateFold {
                    model: family.name().to_string(),
                    fold: split.fold_idx,
                });
                continue;
            }
            folds.push((frame.take(&split.train_indices), held_out));
        }
        if folds.is_empty() {
            return Err(BurnwiseError::DegenerateFold {
                model: family.name().to_string(),
            });
        }

        let scores: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|variant| self.score_candidate(variant, &folds))
            .collect::<Result<Vec<_>>>()?;

        let best_idx = select_candidate(&scores).ok_or_else(|| {
            BurnwiseError::TrainingError(format!("no candidate for {} produced a finite score", family))
        })?;
        let best = scores[best_idx].variant.clone();
        let best_score = scores[best_idx].results.mean_score;

        let total_fits: usize = scores.iter().map(|s| s.results.n_folds).sum();
        let unconverged: usize = scores.iter().map(|s| s.unconverged_fits).sum();
        if unconverged > 0 {
            warnings.push(PipelineWarning::ConvergenceWarning {
                model: family.name().to_string(),
                iterations: self.trainer_budget(),
                context: format!("{} of {} cross-validation fits", unconverged, total_fits),
            });
        }

        tracing::info!(
            model = family.name(),
            candidates = scores.len(),
            folds = folds.len(),
            selected = %best,
            cv_rmse = best_score,
            "Grid search complete"
        );

        Ok(GridSearchResult {
            family,
            best,
            best_score,
            candidates: scores,
            warnings,
        })
    }

    fn trainer_budget(&self) -> usize {
        self.trainer.solver().max_iter
    }

    fn score_candidate(
        &self,
        variant: &ModelVariant,
        folds: &[(ModelFrame, ModelFrame)],
    ) -> Result<CandidateScore> {
        let mut fold_scores = Vec::with_capacity(folds.len());
        let mut unconverged_fits = 0;
        for (train, valid) in folds {
            let model = self.trainer.fit(train, variant)?;
            if !model.outcome().converged {
                unconverged_fits += 1;
            }
            let preds = model.predict(valid)?;
            fold_scores.push(rmse(valid.target(), &preds)?);
        }
        let results = CVResults::from_scores(fold_scores);
        tracing::debug!(
            candidate = %variant,
            mean_rmse = results.mean_score,
            std_rmse = results.std_score,
            "Scored candidate"
        );
        Ok(CandidateScore {
            variant: variant.clone(),
            results,
            unconverged_fits,
        })
    }
}

fn has_zero_variance(values: &[f64]) -> bool {
    match values.first() {
        Some(&first) => values.iter().all(|&v| v == first),
        None => true,
    }
}

/// Preference order among equally scored candidates: larger penalty first,
/// then larger L1 share
fn simplicity(a: &ModelVariant, b: &ModelVariant) -> Ordering {
    let key = |v: &ModelVariant| (v.penalty().unwrap_or(0.0), v.l1_ratio().unwrap_or(0.0));
    let (pa, la) = key(a);
    let (pb, lb) = key(b);
    pb.total_cmp(&pa).then(lb.total_cmp(&la))
}

/// Index of the lowest finite mean RMSE; ties resolved by [`simplicity`]
fn select_candidate(scores: &[CandidateScore]) -> Option<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| simplicity(&scores[a].variant, &scores[b].variant).then(a.cmp(&b)));

    let mut best: Option<usize> = None;
    for idx in order {
        let score = scores[idx].results.mean_score;
        if !score.is_finite() {
            continue;
        }
        match best {
            Some(b) if scores[b].results.mean_score <= score => {}
            _ => best = Some(idx),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureColumn;

    fn linear_frame(n: usize) -> ModelFrame {
        let x: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64 / 10.0).collect();
        let z: Vec<f64> = (0..n).map(|i| ((i * 53) % 89) as f64).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 17) % 7) as f64 - 3.0).collect();
        let y: Vec<f64> = (0..n).map(|i| 3.0 * x[i] - 0.5 * z[i] + noise[i]).collect();
        ModelFrame::new(
            "y",
            y,
            vec![
                FeatureColumn::numeric("x", x),
                FeatureColumn::numeric("z", z),
            ],
        )
        .unwrap()
    }

    fn score(variant: ModelVariant, mean: f64) -> CandidateScore {
        CandidateScore {
            variant,
            results: CVResults::from_scores(vec![mean, mean]),
            unconverged_fits: 0,
        }
    }

    #[test]
    fn test_k_fold_fifty_rows_ten_folds() {
        let cv = CrossValidator::new(10, 42);
        let splits = cv.k_fold_split(50).unwrap();

        assert_eq!(splits.len(), 10);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 5);
            assert_eq!(split.train_indices.len(), 45);
            assert!(split
                .test_indices
                .iter()
                .all(|i| !split.train_indices.contains(i)));
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_uneven_fold_sizes() {
        let splits = CrossValidator::new(4, 1).k_fold_split(10).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn test_folds_are_seeded() {
        let a = CrossValidator::new(5, 9).k_fold_split(40).unwrap();
        let b = CrossValidator::new(5, 9).k_fold_split(40).unwrap();
        let c = CrossValidator::new(5, 10).k_fold_split(40).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        assert!(CrossValidator::new(10, 1).k_fold_split(9).is_err());
        assert!(CrossValidator::new(1, 1).k_fold_split(9).is_err());
    }

    #[test]
    fn test_tie_prefers_largest_penalty() {
        let scores = vec![
            score(ModelVariant::Ridge { lambda: 0.01 }, 2.0),
            score(ModelVariant::Ridge { lambda: 0.1 }, 1.5),
            score(ModelVariant::Ridge { lambda: 1.0 }, 1.5),
            score(ModelVariant::Ridge { lambda: 10.0 }, 1.7),
        ];
        assert_eq!(select_candidate(&scores), Some(2));
    }

    #[test]
    fn test_tie_prefers_larger_l1_share() {
        let scores = vec![
            score(ModelVariant::ElasticNet { alpha: 0.25, lambda: 0.1 }, 1.0),
            score(ModelVariant::ElasticNet { alpha: 0.75, lambda: 0.1 }, 1.0),
        ];
        assert_eq!(select_candidate(&scores), Some(1));
    }

    #[test]
    fn test_grid_search_is_deterministic() {
        let frame = linear_frame(80);
        let candidates: Vec<ModelVariant> = [1e-4, 1e-2, 1.0, 10.0]
            .iter()
            .map(|&lambda| ModelVariant::Ridge { lambda })
            .collect();
        let cv = CrossValidator::new(5, 3);
        let a = cv.grid_search(&frame, ModelFamily::Ridge, &candidates).unwrap();
        let b = cv.grid_search(&frame, ModelFamily::Ridge, &candidates).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.candidates.len(), 4);
        assert!(a.candidates.iter().all(|c| c.results.n_folds == 5));
        // heavy shrinkage hurts a strong linear signal
        assert_ne!(a.best, ModelVariant::Ridge { lambda: 10.0 });
    }

    #[test]
    fn test_degenerate_folds() {
        let n = 20;
        let constant = ModelFrame::new(
            "y",
            vec![5.0; n],
            vec![FeatureColumn::numeric("x", (0..n).map(|i| i as f64).collect())],
        )
        .unwrap();
        let err = CrossValidator::new(4, 0)
            .grid_search(&constant, ModelFamily::Ols, &[ModelVariant::Ols])
            .unwrap_err();
        assert!(matches!(err, BurnwiseError::DegenerateFold { .. }));
        assert_eq!(err.component(), "CrossValidator");
    }

    #[test]
    fn test_single_degenerate_fold_is_skipped() {
        // two folds of two rows; rows 0 and 1 share a target value
        let frame = ModelFrame::new(
            "y",
            vec![1.0, 1.0, 2.0, 7.0],
            vec![FeatureColumn::numeric("x", vec![0.0, 1.0, 2.0, 3.0])],
        )
        .unwrap();
        let cv = CrossValidator::new(2, 0);
        let splits = cv.k_fold_split(4).unwrap();
        let degenerate = splits
            .iter()
            .filter(|s| {
                let t: Vec<f64> = s.test_indices.iter().map(|&i| frame.target()[i]).collect();
                has_zero_variance(&t)
            })
            .count();

        // only rows 0 and 1 share a value, so at least one fold survives
        assert!(degenerate <= 1);
        let result = cv
            .grid_search(&frame, ModelFamily::Ols, &[ModelVariant::Ols])
            .unwrap();
        assert_eq!(result.warnings.len(), degenerate);
        assert_eq!(result.candidates[0].results.n_folds, 2 - degenerate);
    }
}
