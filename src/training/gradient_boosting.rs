//! Gradient boosting over symmetric (oblivious) trees
//!
//! Every level of a tree applies the same `(feature, border)` split to all
//! nodes, so a tree of depth `d` is `d` splits plus `2^d` leaf values.
//! Candidate borders are feature quantiles computed once per fit; rows are
//! pre-binned against them so split search runs on histograms.

use super::models::{FitOutcome, Regressor};
use crate::error::{BurnwiseError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbtConfig {
    /// Boosting rounds
    pub iterations: usize,
    pub learning_rate: f64,
    /// Levels per symmetric tree
    pub depth: usize,
    /// L2 regularization on leaf values
    pub l2_leaf_reg: f64,
    /// Row fraction sampled (without replacement) per round
    pub subsample: f64,
    /// Maximum candidate borders per feature
    pub border_count: usize,
    /// Seed for row sampling; `None` derives one from the run seed
    pub random_state: Option<u64>,
}

impl Default for GbtConfig {
    fn default() -> Self {
        Self {
            iterations: 500,
            learning_rate: 0.05,
            depth: 6,
            l2_leaf_reg: 3.0,
            subsample: 0.8,
            border_count: 254,
            random_state: None,
        }
    }
}

impl GbtConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.iterations",
                self.iterations,
                "at least one boosting round is required",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.learning_rate",
                self.learning_rate,
                "must lie in (0, 1]",
            ));
        }
        if !(1..=16).contains(&self.depth) {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.depth",
                self.depth,
                "must lie in 1..=16",
            ));
        }
        if !(self.l2_leaf_reg >= 0.0) {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.l2_leaf_reg",
                self.l2_leaf_reg,
                "must be non-negative",
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.subsample",
                self.subsample,
                "must lie in (0, 1]",
            ));
        }
        if !(1..=u16::MAX as usize - 1).contains(&self.border_count) {
            return Err(BurnwiseError::invalid_parameter(
                "gbt.border_count",
                self.border_count,
                "must lie in 1..65535",
            ));
        }
        Ok(())
    }
}

/// Candidate split points of one feature: distinct values at evenly spaced
/// quantiles. A row goes right at a border when its value is strictly greater.
fn quantile_borders(values: &[f64], border_count: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    if sorted.len() < 2 {
        return Vec::new();
    }

    // the largest value can never send anything right
    let usable = &sorted[..sorted.len() - 1];
    if usable.len() <= border_count {
        return usable.to_vec();
    }

    let mut borders: Vec<f64> = (1..=border_count)
        .map(|q| usable[(q * usable.len() / (border_count + 1)).min(usable.len() - 1)])
        .collect();
    borders.dedup();
    borders
}

/// Number of borders strictly below `value`
#[inline]
fn bin_of(borders: &[f64], value: f64) -> u16 {
    borders.partition_point(|&b| b < value) as u16
}

/// Symmetric tree: one `(feature, threshold)` per level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetricTree {
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    pub fn depth(&self) -> usize {
        self.splits.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    fn predict_row(&self, row: ndarray::ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        for &(feature, threshold) in &self.splits {
            idx = idx * 2 + usize::from(row[feature] > threshold);
        }
        self.leaf_values[idx]
    }
}

/// Split selected at one level, in bin space
struct LevelSplit {
    feature: usize,
    border: usize,
    gain: f64,
}

/// Feature-major binned view of the training matrix
struct BinnedMatrix {
    borders: Vec<Vec<f64>>,
    bins: Vec<Vec<u16>>,
}

impl BinnedMatrix {
    fn new(x: &Array2<f64>, border_count: usize) -> Self {
        let (borders, bins): (Vec<_>, Vec<_>) = x
            .columns()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|col| {
                let values: Vec<f64> = col.iter().copied().collect();
                let borders = quantile_borders(&values, border_count);
                let bins: Vec<u16> = values.iter().map(|&v| bin_of(&borders, v)).collect();
                (borders, bins)
            })
            .unzip();
        Self { borders, bins }
    }

    fn n_features(&self) -> usize {
        self.borders.len()
    }
}

/// Best split at the current level across all features.
///
/// `leaf_of[i]` is the current leaf of sampled row `rows[i]`.
fn best_level_split(
    binned: &BinnedMatrix,
    gradients: &[f64],
    rows: &[usize],
    leaf_of: &[usize],
    n_leaves: usize,
    l2: f64,
) -> Option<LevelSplit> {
    let candidates: Vec<Option<LevelSplit>> = (0..binned.n_features())
        .into_par_iter()
        .map(|feature| {
            let n_borders = binned.borders[feature].len();
            if n_borders == 0 {
                return None;
            }
            let n_bins = n_borders + 1;
            let bins = &binned.bins[feature];

            // (gradient sum, hessian sum) per (leaf, bin); squared loss has unit hessians
            let mut hist = vec![(0.0f64, 0.0f64); n_leaves * n_bins];
            for (k, &row) in rows.iter().enumerate() {
                let cell = &mut hist[leaf_of[k] * n_bins + bins[row] as usize];
                cell.0 += gradients[row];
                cell.1 += 1.0;
            }

            let totals: Vec<(f64, f64)> = (0..n_leaves)
                .map(|leaf| {
                    hist[leaf * n_bins..(leaf + 1) * n_bins]
                        .iter()
                        .fold((0.0, 0.0), |(g, h), &(cg, ch)| (g + cg, h + ch))
                })
                .collect();

            let mut left = vec![(0.0f64, 0.0f64); n_leaves];
            let mut best: Option<LevelSplit> = None;
            for border in 0..n_borders {
                let mut gain = 0.0;
                for leaf in 0..n_leaves {
                    let (cg, ch) = hist[leaf * n_bins + border];
                    left[leaf].0 += cg;
                    left[leaf].1 += ch;
                    let (lg, lh) = left[leaf];
                    let (g, h) = totals[leaf];
                    let (rg, rh) = (g - lg, h - lh);
                    gain += lg * lg / (lh + l2) + rg * rg / (rh + l2) - g * g / (h + l2);
                }
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(LevelSplit {
                        feature,
                        border,
                        gain,
                    });
                }
            }
            best
        })
        .collect();

    // sequential reduction keeps ties on the lowest feature index
    candidates.into_iter().flatten().fold(None, |acc, cand| match acc {
        Some(best) if best.gain >= cand.gain => Some(best),
        _ => Some(cand),
    })
}

/// Gradient-boosted symmetric trees for squared-error regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub config: GbtConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoostedTrees {
    pub fn new(config: GbtConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[SymmetricTree] {
        &self.trees
    }

    fn build_tree(
        &self,
        binned: &BinnedMatrix,
        gradients: &[f64],
        rows: &[usize],
        gains: &mut [f64],
    ) -> SymmetricTree {
        let l2 = self.config.l2_leaf_reg;
        let mut splits = Vec::with_capacity(self.config.depth);
        let mut leaf_of = vec![0usize; rows.len()];
        let mut n_leaves = 1usize;

        for _ in 0..self.config.depth {
            let Some(split) = best_level_split(binned, gradients, rows, &leaf_of, n_leaves, l2)
            else {
                break;
            };
            let bins = &binned.bins[split.feature];
            for (k, &row) in rows.iter().enumerate() {
                let right = usize::from(bins[row] as usize > split.border);
                leaf_of[k] = leaf_of[k] * 2 + right;
            }
            n_leaves *= 2;
            gains[split.feature] += split.gain;
            splits.push((split.feature, binned.borders[split.feature][split.border]));
        }

        let mut sums = vec![(0.0f64, 0.0f64); n_leaves];
        for (k, &row) in rows.iter().enumerate() {
            sums[leaf_of[k]].0 += gradients[row];
            sums[leaf_of[k]].1 += 1.0;
        }
        let leaf_values = sums
            .iter()
            .map(|&(g, h)| if h > 0.0 { -g / (h + l2) } else { 0.0 })
            .collect();

        SymmetricTree {
            splits,
            leaf_values,
        }
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome> {
        let n = x.nrows();
        if n == 0 {
            return Err(BurnwiseError::TrainingError("Empty dataset".into()));
        }
        if n != y.len() {
            return Err(BurnwiseError::ShapeError {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.config.validate()?;

        let seed = self.config.random_state.unwrap_or(0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let binned = BinnedMatrix::new(x, self.config.border_count);

        self.n_features = x.ncols();
        self.trees.clear();
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = vec![self.base_prediction; n];
        let mut gains = vec![0.0; self.n_features];

        let sample_size = ((n as f64 * self.config.subsample).ceil() as usize).clamp(1, n);
        let mut all_rows: Vec<usize> = (0..n).collect();

        for _ in 0..self.config.iterations {
            let gradients: Vec<f64> = predictions
                .iter()
                .zip(y.iter())
                .map(|(&p, &yi)| p - yi)
                .collect();

            let rows: Vec<usize> = if sample_size < n {
                all_rows.shuffle(&mut rng);
                let mut sub = all_rows[..sample_size].to_vec();
                sub.sort_unstable();
                sub
            } else {
                all_rows.clone()
            };

            let tree = self.build_tree(&binned, &gradients, &rows, &mut gains);

            for (i, pred) in predictions.iter_mut().enumerate() {
                let mut idx = 0usize;
                for &(feature, threshold) in &tree.splits {
                    idx = idx * 2 + usize::from(x[[i, feature]] > threshold);
                }
                *pred += self.config.learning_rate * tree.leaf_values[idx];
            }
            self.trees.push(tree);
        }

        let total: f64 = gains.iter().sum();
        self.feature_importances = if total > 0.0 {
            gains.iter().map(|g| g / total).collect()
        } else {
            gains
        };

        tracing::debug!(
            trees = self.trees.len(),
            rows = n,
            features = self.n_features,
            "Boosting finished"
        );

        Ok(FitOutcome {
            iterations: self.trees.len(),
            converged: true,
        })
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(BurnwiseError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(BurnwiseError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let lr = self.config.learning_rate;
        let preds: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                self.base_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| lr * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect();
        Ok(Array1::from_vec(preds))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.feature_importances.is_empty() {
            None
        } else {
            Some(Array1::from_vec(self.feature_importances.clone()))
        }
    }
}
