//! Deterministic train/test partitioning

use crate::config::PipelineConfig;
use crate::error::{BurnwiseError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Number of target quantile buckets used by stratified splitting
const STRATA: usize = 10;

/// Disjoint train/test row indices covering every row, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl Split {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// Seeded splitter; the same seed always yields the same [`Split`]
#[derive(Debug, Clone)]
pub struct Partitioner {
    train_fraction: f64,
    stratify: bool,
    seed: u64,
    min_rows: usize,
}

impl Partitioner {
    pub fn new(train_fraction: f64, seed: u64) -> Self {
        Self {
            train_fraction,
            stratify: false,
            seed,
            min_rows: 2,
        }
    }

    /// Partitioner for a run: requires at least two rows per CV fold
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.split.train_fraction, config.seed)
            .with_stratify(config.split.stratify)
            .with_min_rows(2 * config.cv.n_folds)
    }

    /// Sample within target deciles instead of over all rows at once
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows.max(2);
        self
    }

    /// Number of training rows for `n` rows: ceil(fraction * n)
    pub fn train_size(&self, n: usize) -> usize {
        let raw = self.train_fraction * n as f64;
        // 0.7 * 10 must give 7, not ceil(7.000000000000001)
        if (raw - raw.round()).abs() < 1e-9 {
            raw.round() as usize
        } else {
            raw.ceil() as usize
        }
    }

    /// Partition rows given the target column
    pub fn split(&self, target: &Array1<f64>) -> Result<Split> {
        let n = target.len();
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(BurnwiseError::invalid_parameter(
                "train_fraction",
                self.train_fraction,
                "must lie strictly between 0 and 1",
            ));
        }
        if n < self.min_rows {
            return Err(BurnwiseError::InsufficientData {
                component: "Partitioner",
                required: self.min_rows,
                actual: n,
            });
        }

        let n_train = self.train_size(n);
        if n_train == 0 || n_train >= n {
            return Err(BurnwiseError::InsufficientData {
                component: "Partitioner",
                required: n + 1,
                actual: n,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let (mut train_indices, mut test_indices) = if self.stratify {
            self.stratified(target, n_train, &mut rng)
        } else {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let test = indices.split_off(n_train);
            (indices, test)
        };

        train_indices.sort_unstable();
        test_indices.sort_unstable();

        tracing::debug!(
            n_train = train_indices.len(),
            n_test = test_indices.len(),
            stratified = self.stratify,
            "Partitioned dataset"
        );

        Ok(Split {
            train_indices,
            test_indices,
        })
    }

    /// Bucket rows by target rank, then draw a largest-remainder quota from
    /// each bucket so the train total stays exactly `n_train`.
    fn stratified(
        &self,
        target: &Array1<f64>,
        n_train: usize,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<usize>, Vec<usize>) {
        let n = target.len();
        let n_buckets = STRATA.min(n);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| target[a].total_cmp(&target[b]).then(a.cmp(&b)));

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); n_buckets];
        for (rank, &row) in order.iter().enumerate() {
            buckets[rank * n_buckets / n].push(row);
        }
        for bucket in &mut buckets {
            bucket.shuffle(rng);
        }

        let exact: Vec<f64> = buckets
            .iter()
            .map(|b| b.len() as f64 * self.train_fraction)
            .collect();
        let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

        // stable sort over a shuffled order: equal remainders fall to the rng
        let mut by_remainder: Vec<usize> = (0..n_buckets).collect();
        by_remainder.shuffle(rng);
        by_remainder.sort_by(|&a, &b| {
            let ra = exact[a] - exact[a].floor();
            let rb = exact[b] - exact[b].floor();
            rb.total_cmp(&ra)
        });

        let mut assigned: usize = quotas.iter().sum();
        while assigned < n_train {
            let before = assigned;
            for &b in &by_remainder {
                if assigned == n_train {
                    break;
                }
                if quotas[b] < buckets[b].len() {
                    quotas[b] += 1;
                    assigned += 1;
                }
            }
            if assigned == before {
                break;
            }
        }

        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n - n_train);
        for (bucket, &quota) in buckets.iter().zip(quotas.iter()) {
            train.extend_from_slice(&bucket[..quota]);
            test.extend_from_slice(&bucket[quota..]);
        }
        (train, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(n: usize) -> Array1<f64> {
        // skewed, continuous target
        Array1::from_iter((0..n).map(|i| 300.0 + (i as f64).powf(1.5)))
    }

    fn assert_partition(split: &Split, n: usize) {
        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_disjoint_and_covers_all_rows() {
        for n in [20, 37, 100, 973] {
            let split = Partitioner::new(0.8, 42).split(&target(n)).unwrap();
            assert_partition(&split, n);
            let expected = 0.8 * n as f64;
            assert!((split.n_train() as f64 - expected).abs() <= 1.0);
        }
    }

    #[test]
    fn test_train_size_is_ceiling() {
        let p = Partitioner::new(0.8, 1);
        assert_eq!(p.train_size(100), 80);
        assert_eq!(p.train_size(37), 30);
        assert_eq!(Partitioner::new(0.7, 1).train_size(10), 7);
    }

    #[test]
    fn test_same_seed_same_split() {
        let y = target(250);
        let a = Partitioner::new(0.8, 7).split(&y).unwrap();
        let b = Partitioner::new(0.8, 7).split(&y).unwrap();
        let c = Partitioner::new(0.8, 8).split(&y).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_stratified_split_balances_deciles() {
        let n = 200;
        let y = target(n);
        let split = Partitioner::new(0.8, 3)
            .with_stratify(true)
            .split(&y)
            .unwrap();
        assert_partition(&split, n);
        assert_eq!(split.n_train(), 160);

        // target is increasing in row index, so each block of 20 rows is a decile
        for decile in 0..10 {
            let in_train = split
                .train_indices
                .iter()
                .filter(|&&i| i / 20 == decile)
                .count();
            assert_eq!(in_train, 16, "decile {decile}");
        }
    }

    #[test]
    fn test_stratified_split_uneven_sizes() {
        let n = 57;
        let split = Partitioner::new(0.75, 11)
            .with_stratify(true)
            .split(&target(n))
            .unwrap();
        assert_partition(&split, n);
        assert_eq!(split.n_train(), 43);
    }

    #[test]
    fn test_stratified_ties_do_not_favor_low_deciles() {
        // ten buckets of three rows at p = 0.5: every remainder is 0.5
        let n = 30;
        let y = target(n);
        let lowest_in_train: Vec<usize> = (0..20)
            .map(|seed| {
                let split = Partitioner::new(0.5, seed)
                    .with_stratify(true)
                    .split(&y)
                    .unwrap();
                assert_partition(&split, n);
                assert_eq!(split.n_train(), 15);
                for bucket in 0..10 {
                    let in_train = split.train_indices.iter().filter(|&&i| i / 3 == bucket).count();
                    assert!((1..=2).contains(&in_train), "bucket {bucket}");
                }
                split.train_indices.iter().filter(|&&i| i < 3).count()
            })
            .collect();

        assert!(lowest_in_train.contains(&1));
        assert!(lowest_in_train.contains(&2));
    }

    #[test]
    fn test_too_few_rows() {
        let err = Partitioner::new(0.8, 42)
            .with_min_rows(20)
            .split(&target(19))
            .unwrap_err();
        assert!(matches!(
            err,
            BurnwiseError::InsufficientData {
                component: "Partitioner",
                required: 20,
                actual: 19
            }
        ));
    }

    #[test]
    fn test_fraction_leaving_empty_test_set() {
        let err = Partitioner::new(0.99, 42).split(&target(20)).unwrap_err();
        assert!(matches!(err, BurnwiseError::InsufficientData { .. }));
    }
}
