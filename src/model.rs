//! Single-feature regression capability used by the cross-validation sweep.
//!
//! The sweep only sees the [`Regressor`] trait; [`PolynomialRegressor`] is the
//! implementation wired in by `main`, with the polynomial degree as capacity.

use ndarray::{Array1, Array2, Axis};

/// Failure of the fitting capability for one call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("need at least {needed} training samples, got {got}")]
    TooFewSamples { needed: usize, got: usize },

    #[error("feature and label lengths differ ({features} vs {labels})")]
    LengthMismatch { features: usize, labels: usize },

    #[error("capacity must be at least 1")]
    ZeroCapacity,

    #[error("training feature is constant or non-finite")]
    DegenerateFeature,

    #[error("normal equations are singular")]
    Singular,

    #[error("model produced non-finite coefficients or scores")]
    NonFinite,
}

/// Fit / predict / score over one feature column.
///
/// `capacity` controls model complexity; larger values must never make the
/// model less expressive.
pub trait Regressor: Sync {
    type Model: Send + Sync;

    fn fit(&self, features: &Array1<f64>, labels: &Array1<f64>, capacity: usize) -> Result<Self::Model, FitError>;

    fn predict(&self, model: &Self::Model, features: &Array1<f64>) -> Array1<f64>;

    /// Coefficient of determination of `model` on `(features, labels)`.
    fn score(&self, model: &Self::Model, features: &Array1<f64>, labels: &Array1<f64>) -> f64 {
        r2_score(labels, &self.predict(model, features))
    }
}

/// R² = 1 - SS_res / SS_tot.
///
/// With constant labels (SS_tot = 0) a perfect prediction scores 1.0 and
/// anything else 0.0. Empty input scores 0.0.
pub fn r2_score(labels: &Array1<f64>, predictions: &Array1<f64>) -> f64 {
    let Some(mean) = labels.mean() else {
        return 0.0;
    };
    let ss_res: f64 = labels
        .iter()
        .zip(predictions.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    let ss_tot: f64 = labels.iter().map(|y| (y - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Least-squares polynomial of a fixed degree.
///
/// The feature is standardised with the training mean and standard deviation
/// before the powers are taken, which keeps the normal equations well
/// conditioned up to degree ~10.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialRegressor;

#[derive(Debug, Clone)]
pub struct PolynomialModel {
    pub degree: usize,
    x_mean: f64,
    x_std: f64,
    intercept: f64,
    coefficients: Array1<f64>,
    column_means: Array1<f64>,
}

impl PolynomialRegressor {
    pub fn new() -> Self {
        PolynomialRegressor
    }
}

fn design_matrix(features: &Array1<f64>, degree: usize, x_mean: f64, x_std: f64) -> Array2<f64> {
    let mut x = Array2::zeros((features.len(), degree));
    for (row, v) in features.iter().enumerate() {
        let z = (v - x_mean) / x_std;
        let mut power = 1.0;
        for col in 0..degree {
            power *= z;
            x[[row, col]] = power;
        }
    }
    x
}

impl Regressor for PolynomialRegressor {
    type Model = PolynomialModel;

    fn fit(&self, features: &Array1<f64>, labels: &Array1<f64>, capacity: usize) -> Result<PolynomialModel, FitError> {
        if capacity == 0 {
            return Err(FitError::ZeroCapacity);
        }
        if features.len() != labels.len() {
            return Err(FitError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.len() < capacity + 1 {
            return Err(FitError::TooFewSamples {
                needed: capacity + 1,
                got: features.len(),
            });
        }

        let x_mean = features.mean().unwrap_or(0.0);
        let x_std = features.std(0.0);
        if !(x_std.is_finite() && x_std > 0.0) {
            return Err(FitError::DegenerateFeature);
        }

        // Center columns and labels so the intercept drops out of the solve
        let x = design_matrix(features, capacity, x_mean, x_std);
        let column_means = x.mean_axis(Axis(0)).ok_or(FitError::DegenerateFeature)?;
        let y_mean = labels.mean().unwrap_or(0.0);
        let x_centered = &x - &column_means.clone().insert_axis(Axis(0));
        let y_centered = labels - y_mean;

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = cholesky_solve(&xtx, &xty)
            .or_else(|| gauss_jordan_solve(&xtx, &xty))
            .ok_or(FitError::Singular)?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(FitError::NonFinite);
        }

        Ok(PolynomialModel {
            degree: capacity,
            x_mean,
            x_std,
            intercept: y_mean,
            coefficients,
            column_means,
        })
    }

    fn predict(&self, model: &PolynomialModel, features: &Array1<f64>) -> Array1<f64> {
        let x = design_matrix(features, model.degree, model.x_mean, model.x_std);
        let x_centered = &x - &model.column_means.clone().insert_axis(Axis(0));
        x_centered.dot(&model.coefficients) + model.intercept
    }
}

/// Solve symmetric positive-definite `a x = b` by Cholesky decomposition,
/// retrying once with a small ridge if `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_solve_inner(a, b).or_else(|| {
        let n = a.nrows();
        let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
        let mut a_reg = a.clone();
        for k in 0..n {
            a_reg[[k, k]] += ridge;
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting on `[a | b]`.
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let max_row = (col..n)
            .max_by(|&r1, &r2| aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs()))
            .unwrap_or(col);
        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}
