//! Standard (z-score) scaling of numeric predictors

use serde::{Deserialize, Serialize};

/// Parameters of a fitted scaler: `(x - center) / scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

impl ScalerParams {
    /// Mean and sample standard deviation of `values`.
    ///
    /// A constant (or single-valued) column keeps a scale of 1.
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                center: 0.0,
                scale: 1.0,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            center: mean,
            scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_params() {
        let params = ScalerParams::fit(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((params.center - 3.0).abs() < 1e-12);
        // sample std of 1..5
        assert!((params.scale - 2.5f64.sqrt()).abs() < 1e-12);

        let scaled: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|&v| params.apply(v)).collect();
        let mean: f64 = scaled.iter().sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let params = ScalerParams::fit(&[4.0, 4.0, 4.0]);
        assert_eq!(params.scale, 1.0);
        assert_eq!(params.apply(4.0), 0.0);
    }
}
