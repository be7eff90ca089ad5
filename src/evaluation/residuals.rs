//! Residual diagnostics for the selected model

use crate::error::{BurnwiseError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Residual of one test row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    /// Row index into the full dataset
    pub row: usize,
    pub actual: f64,
    pub predicted: f64,
    /// `actual - predicted`
    pub residual: f64,
    pub is_outlier: bool,
}

/// Direction of residual asymmetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewShape {
    RightSkewed,
    LeftSkewed,
    ApproximatelySymmetric,
}

impl SkewShape {
    pub fn from_skewness(skewness: f64) -> Self {
        if skewness > 0.5 {
            SkewShape::RightSkewed
        } else if skewness < -0.5 {
            SkewShape::LeftSkewed
        } else {
            SkewShape::ApproximatelySymmetric
        }
    }
}

impl fmt::Display for SkewShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkewShape::RightSkewed => "right-skewed (model under-predicts large values)",
            SkewShape::LeftSkewed => "left-skewed (model over-predicts large values)",
            SkewShape::ApproximatelySymmetric => "approximately symmetric",
        })
    }
}

/// Tail weight relative to a normal distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailShape {
    Leptokurtic,
    Platykurtic,
    Mesokurtic,
}

impl TailShape {
    pub fn from_excess_kurtosis(kurtosis: f64) -> Self {
        if kurtosis > 1.0 {
            TailShape::Leptokurtic
        } else if kurtosis < -1.0 {
            TailShape::Platykurtic
        } else {
            TailShape::Mesokurtic
        }
    }
}

impl fmt::Display for TailShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TailShape::Leptokurtic => "leptokurtic (heavier tails than normal)",
            TailShape::Platykurtic => "platykurtic (lighter tails than normal)",
            TailShape::Mesokurtic => "mesokurtic (close to normal tails)",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Absolute residual above which a row is flagged
    pub threshold: f64,
    pub outlier_count: usize,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub skew_shape: SkewShape,
    pub tail_shape: TailShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualAnalysis {
    pub records: Vec<ResidualRecord>,
    pub summary: ResidualSummary,
}

impl ResidualAnalysis {
    pub fn outliers(&self) -> impl Iterator<Item = &ResidualRecord> {
        self.records.iter().filter(|r| r.is_outlier)
    }
}

/// Flags residuals beyond `multiplier` sample standard deviations
#[derive(Debug, Clone)]
pub struct ResidualAnalyzer {
    multiplier: f64,
}

impl Default for ResidualAnalyzer {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl ResidualAnalyzer {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Analyze predictions for the rows `rows` of the dataset
    pub fn analyze(
        &self,
        rows: &[usize],
        actual: &Array1<f64>,
        predicted: &Array1<f64>,
    ) -> Result<ResidualAnalysis> {
        let n = actual.len();
        if predicted.len() != n || rows.len() != n {
            return Err(BurnwiseError::ShapeError {
                expected: format!("{} rows, actuals and predictions", n),
                actual: format!("{} rows, {} predictions", rows.len(), predicted.len()),
            });
        }
        if n < 2 {
            return Err(BurnwiseError::InsufficientData {
                component: "ResidualAnalyzer",
                required: 2,
                actual: n,
            });
        }

        let residuals: Vec<f64> = actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| a - p)
            .collect();

        let nf = n as f64;
        let mean = residuals.iter().sum::<f64>() / nf;
        let ss: f64 = residuals.iter().map(|r| (r - mean).powi(2)).sum();
        let std_dev = (ss / (nf - 1.0)).sqrt();

        let central = |k: i32| residuals.iter().map(|r| (r - mean).powi(k)).sum::<f64>() / nf;
        let (m2, m3, m4) = (ss / nf, central(3), central(4));

        let (skewness, excess_kurtosis) = if m2 > 0.0 {
            (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        } else {
            (0.0, 0.0)
        };

        let threshold = self.multiplier * std_dev;
        let records: Vec<ResidualRecord> = rows
            .iter()
            .zip(actual.iter().zip(predicted.iter()))
            .zip(residuals.iter())
            .map(|((&row, (&a, &p)), &r)| ResidualRecord {
                row,
                actual: a,
                predicted: p,
                residual: r,
                is_outlier: r.abs() > threshold,
            })
            .collect();
        let outlier_count = records.iter().filter(|r| r.is_outlier).count();

        let summary = ResidualSummary {
            n,
            mean,
            std_dev,
            threshold,
            outlier_count,
            skewness,
            excess_kurtosis,
            skew_shape: SkewShape::from_skewness(skewness),
            tail_shape: TailShape::from_excess_kurtosis(excess_kurtosis),
        };

        tracing::info!(
            outliers = outlier_count,
            threshold,
            skewness,
            excess_kurtosis,
            "Residual analysis complete"
        );

        Ok(ResidualAnalysis { records, summary })
    }
}
