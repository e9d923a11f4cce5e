//! # Ridge Regression
//!
//! Ridge with an unpenalised intercept. The intercept is handled by centring the design
//! and response on their training means, which leaves the penalised problem
//!
//! ```text
//!     (Xc' Xc + alpha I) w = Xc' yc
//! ```
//!
//! The cross-validated search solves this system for every candidate strength on every
//! fold. Rather than refactorising per strength, `RidgePath` eigendecomposes the Gram
//! matrix `Xc' Xc = V diag(lambda) V'` once, after which each strength costs a diagonal
//! rescale: `w(alpha) = V diag(1 / (lambda + alpha)) V' Xc' yc`.

use crate::error::AblationError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{Eigh, UPLO};

/// Number of candidate regularisation strengths in the search.
pub const ALPHA_GRID_SIZE: usize = 100;

/// Candidate strengths: geometrically spaced from `0.5 * 10^10` down to `0.5 * 10^-2`.
pub fn alpha_grid() -> Vec<f64> {
    const HIGH_EXPONENT: f64 = 10.0;
    const LOW_EXPONENT: f64 = -2.0;
    let step = (HIGH_EXPONENT - LOW_EXPONENT) / (ALPHA_GRID_SIZE - 1) as f64;
    (0..ALPHA_GRID_SIZE)
        .map(|i| 0.5 * 10f64.powf(HIGH_EXPONENT - step * i as f64))
        .collect()
}

/// A fitted ridge model.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeModel {
    pub alpha: f64,
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl RidgeModel {
    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// The alpha-independent part of a ridge fit, reusable across strengths.
#[derive(Debug, Clone)]
pub struct RidgePath {
    x_mean: Array1<f64>,
    y_mean: f64,
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
    /// V' Xc' yc
    projected_target: Array1<f64>,
}

impl RidgePath {
    pub fn new(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Self, AblationError> {
        let n = x.nrows();
        if n == 0 {
            return Err(AblationError::InsufficientSamples {
                found: 0,
                required: 1,
            });
        }
        if y.len() != n {
            return Err(AblationError::dimension("ridge target length", n, y.len()));
        }

        let x_mean = x.sum_axis(Axis(0)) / n as f64;
        let y_mean = y.sum() / n as f64;
        let xc = &x - &x_mean;
        let yc = y.mapv(|v| v - y_mean);

        let gram = xc.t().dot(&xc);
        let (eigenvalues, eigenvectors) = gram.eigh(UPLO::Lower)?;
        // Round-off can push null-space eigenvalues slightly below zero.
        let eigenvalues = eigenvalues.mapv(|v| v.max(0.0));
        let projected_target = eigenvectors.t().dot(&xc.t().dot(&yc));

        Ok(Self {
            x_mean,
            y_mean,
            eigenvalues,
            eigenvectors,
            projected_target,
        })
    }

    pub fn solve(&self, alpha: f64) -> RidgeModel {
        let shrunk = &self.projected_target / &self.eigenvalues.mapv(|l| l + alpha);
        let coefficients = self.eigenvectors.dot(&shrunk);
        let intercept = self.y_mean - self.x_mean.dot(&coefficients);
        RidgeModel {
            alpha,
            coefficients,
            intercept,
        }
    }
}

/// Fits a single ridge model at a fixed strength.
pub fn fit_ridge(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
) -> Result<RidgeModel, AblationError> {
    Ok(RidgePath::new(x, y)?.solve(alpha))
}
