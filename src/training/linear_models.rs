//! Linear model implementations
//!
//! Penalties follow the glmnet convention: the data term is scaled by
//! `1/(2n)`, so `lambda` is comparable across sample sizes.

use super::models::{FitOutcome, Regressor};
use crate::error::{BurnwiseError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `A x = b` for symmetric positive-definite `A`.
/// Near-singular systems get a small diagonal jitter and one retry.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let mut a_reg = a.clone();
            let jitter = (1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64)
                .max(1e-12);
            for k in 0..n {
                a_reg[[k, k]] += jitter;
            }
            tracing::debug!(jitter, "Cholesky retry with diagonal jitter");
            cholesky_factor(&a_reg)?
        }
    };

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inversion with partial pivoting (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve the (possibly penalized) normal equations `(XᵀX + ridge·I) w = Xᵀy`
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, ridge: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    if ridge > 0.0 {
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += ridge;
        }
    }
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Ok(w);
    }
    matrix_inverse(&xtx)
        .map(|inv| inv.dot(&xty))
        .ok_or_else(|| {
            BurnwiseError::ComputationError("Matrix is singular, cannot solve least squares".into())
        })
}

/// Column-centered copy of the data plus the removed means
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
}

fn center(x: &Array2<f64>, y: &Array1<f64>) -> Result<Centered> {
    let n_samples = x.nrows();
    if n_samples != y.len() {
        return Err(BurnwiseError::ShapeError {
            expected: format!("y length = {}", n_samples),
            actual: format!("y length = {}", y.len()),
        });
    }
    let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
        BurnwiseError::TrainingError("cannot fit a linear model on zero rows".into())
    })?;
    let y_mean = y.mean().unwrap_or(0.0);
    Ok(Centered {
        x: x - &x_mean.view().insert_axis(Axis(0)),
        y: y - y_mean,
        x_mean,
        y_mean,
    })
}

/// Soft-threshold operator for the L1 proximal step
fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

/// Cyclic coordinate descent on
/// `(1/2n)‖y − Xw‖² + λ(α‖w‖₁ + (1−α)/2‖w‖²)` over centered data.
///
/// Stops once the summed absolute coefficient change falls below `tol`.
/// On budget exhaustion the last iterate is returned with `converged = false`.
fn coordinate_descent(
    data: &Centered,
    lambda: f64,
    l1_ratio: f64,
    max_iter: usize,
    tol: f64,
) -> (Array1<f64>, FitOutcome) {
    let x_c = &data.x;
    let n_features = x_c.ncols();
    let n = x_c.nrows() as f64;

    let col_norms: Vec<f64> = (0..n_features)
        .map(|j| x_c.column(j).mapv(|v| v * v).sum())
        .collect();

    let l1_penalty = lambda * l1_ratio * n;
    let l2_penalty = lambda * (1.0 - l1_ratio) * n;

    let mut w = Array1::zeros(n_features);
    let mut r = data.y.clone();

    for iter in 1..=max_iter {
        let mut diff = 0.0;

        for j in 0..n_features {
            let denom = col_norms[j] + l2_penalty;
            if col_norms[j] < 1e-15 || denom < 1e-15 {
                w[j] = 0.0;
                continue;
            }
            // incremental residual: rho = x_jᵀ r + ‖x_j‖² w_j
            let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
            let old_wj = w[j];
            w[j] = soft_threshold(rho, l1_penalty) / denom;

            let delta = old_wj - w[j];
            if delta != 0.0 {
                r.scaled_add(delta, &x_c.column(j));
                diff += delta.abs();
            }
        }

        if diff < tol {
            return (
                w,
                FitOutcome {
                    iterations: iter,
                    converged: true,
                },
            );
        }
    }

    (
        w,
        FitOutcome {
            iterations: max_iter,
            converged: false,
        },
    )
}

/// Absolute coefficients scaled to sum to one
fn coefficient_importances(coefficients: &Array1<f64>) -> Array1<f64> {
    let abs = coefficients.mapv(f64::abs);
    let total = abs.sum();
    if total > 0.0 {
        abs / total
    } else {
        abs
    }
}

/// Fitted weights shared by every linear family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearFit {
    fn from_centered(w: Array1<f64>, data: &Centered) -> Self {
        let intercept = data.y_mean - w.dot(&data.x_mean);
        Self {
            coefficients: w,
            intercept,
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(BurnwiseError::ShapeError {
                expected: format!("{} features", self.coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

fn predict_fitted(fit: &Option<LinearFit>, x: &Array2<f64>) -> Result<Array1<f64>> {
    fit.as_ref().ok_or(BurnwiseError::ModelNotFitted)?.predict(x)
}

/// Ordinary least squares with an intercept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    pub fit: Option<LinearFit>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome> {
        let data = center(x, y)?;
        let w = solve_normal_equations(&data.x, &data.y, 0.0)?;
        self.fit = Some(LinearFit::from_centered(w, &data));
        Ok(FitOutcome::closed_form())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        predict_fitted(&self.fit, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.fit.as_ref().map(|f| coefficient_importances(&f.coefficients))
    }
}

/// Ridge regression: `(XᵀX + nλI) w = Xᵀy` on centered data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub lambda: f64,
    pub fit: Option<LinearFit>,
}

impl RidgeRegression {
    pub fn new(lambda: f64) -> Self {
        Self { lambda, fit: None }
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome> {
        let data = center(x, y)?;
        let ridge = self.lambda * data.x.nrows() as f64;
        let w = solve_normal_equations(&data.x, &data.y, ridge)?;
        self.fit = Some(LinearFit::from_centered(w, &data));
        Ok(FitOutcome::closed_form())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        predict_fitted(&self.fit, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.fit.as_ref().map(|f| coefficient_importances(&f.coefficients))
    }
}

/// Lasso regression (L1 penalty via coordinate descent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub lambda: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit: Option<LinearFit>,
}

impl LassoRegression {
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda,
            max_iter: 1000,
            tol: 1e-6,
            fit: None,
        }
    }

    pub fn with_solver(mut self, max_iter: usize, tol: f64) -> Self {
        self.max_iter = max_iter;
        self.tol = tol;
        self
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome> {
        let data = center(x, y)?;
        let (w, outcome) = coordinate_descent(&data, self.lambda, 1.0, self.max_iter, self.tol);
        self.fit = Some(LinearFit::from_centered(w, &data));
        Ok(outcome)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        predict_fitted(&self.fit, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.fit.as_ref().map(|f| coefficient_importances(&f.coefficients))
    }
}

/// Elastic net regression (mixed L1/L2 penalty via coordinate descent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetRegression {
    pub lambda: f64,
    /// L1 share of the penalty (0.0 = ridge, 1.0 = lasso)
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit: Option<LinearFit>,
}

impl ElasticNetRegression {
    pub fn new(lambda: f64, l1_ratio: f64) -> Self {
        Self {
            lambda,
            l1_ratio: l1_ratio.clamp(0.0, 1.0),
            max_iter: 1000,
            tol: 1e-6,
            fit: None,
        }
    }

    pub fn with_solver(mut self, max_iter: usize, tol: f64) -> Self {
        self.max_iter = max_iter;
        self.tol = tol;
        self
    }
}

impl Regressor for ElasticNetRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FitOutcome> {
        let data = center(x, y)?;
        let (w, outcome) =
            coordinate_descent(&data, self.lambda, self.l1_ratio, self.max_iter, self.tol);
        self.fit = Some(LinearFit::from_centered(w, &data));
        Ok(outcome)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        predict_fitted(&self.fit, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.fit.as_ref().map(|f| coefficient_importances(&f.coefficients))
    }
}
