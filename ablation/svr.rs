//! # Epsilon-Insensitive Support-Vector Regression
//!
//! A thin layer over `linfa-svm`. The solver is libsvm's SMO on the epsilon-SVR dual,
//! with the intercept left free, so the cost `C` only bounds the kernel weights and never
//! pulls predictions toward zero. This module owns the search grid and the translation of
//! a grid point into solver parameters:
//!
//! - `epsilon` is the half-width of the insensitive tube (libsvm's `p`).
//! - The radial-basis kernel is `exp(-gamma |x - z|^2)` with `gamma = 1 / (n_features *
//!   Var(X))`. linfa parameterises it by the width `1 / gamma`.

use crate::error::AblationError;
use itertools::iproduct;
use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// libsvm's default stopping tolerance on the KKT gap.
const SOLVER_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// K(x, z) = x . z
    Linear,
    /// K(x, z) = exp(-gamma |x - z|^2)
    Rbf,
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::Rbf => "rbf",
        })
    }
}

/// One point of the support-vector hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvrParams {
    /// Regularisation cost `C`, the box bound on each dual coefficient.
    pub cost: f64,
    /// Half-width of the insensitive tube around the target.
    pub epsilon: f64,
    pub kernel: Kernel,
}

impl fmt::Display for SvrParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C={}, epsilon={}, kernel={}",
            self.cost, self.epsilon, self.kernel
        )
    }
}

/// The exhaustive search grid, ordered cost, then epsilon, then kernel.
pub fn parameter_grid() -> Vec<SvrParams> {
    const COSTS: [f64; 4] = [0.1, 1.0, 10.0, 100.0];
    const EPSILONS: [f64; 3] = [0.01, 0.1, 1.0];
    const KERNELS: [Kernel; 2] = [Kernel::Linear, Kernel::Rbf];

    iproduct!(COSTS, EPSILONS, KERNELS)
        .map(|(cost, epsilon, kernel)| SvrParams {
            cost,
            epsilon,
            kernel,
        })
        .collect()
}

/// `1 / (n_features * Var(X))`, the variance taken over every entry of `x`.
fn scale_gamma(x: ArrayView2<f64>) -> f64 {
    let count = x.len();
    if count == 0 {
        return 1.0;
    }
    let mean = x.sum() / count as f64;
    let variance = x.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    if variance > 0.0 {
        1.0 / (x.ncols() as f64 * variance)
    } else {
        1.0
    }
}

/// A fitted support-vector regressor.
#[derive(Debug, Clone)]
pub struct SvrModel {
    params: SvrParams,
    gamma: f64,
    svm: Svm<f64, f64>,
}

impl SvrModel {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        params: SvrParams,
    ) -> Result<Self, AblationError> {
        let n = x.nrows();
        if n == 0 {
            return Err(AblationError::InsufficientSamples {
                found: 0,
                required: 1,
            });
        }
        if y.len() != n {
            return Err(AblationError::dimension("SVR target length", n, y.len()));
        }

        let solver = Svm::<f64, f64>::params()
            .c_svr(params.cost, Some(params.epsilon))
            .eps(SOLVER_TOLERANCE);
        let (solver, gamma) = match params.kernel {
            Kernel::Linear => (solver.linear_kernel(), 0.0),
            Kernel::Rbf => {
                let gamma = scale_gamma(x);
                (solver.gaussian_kernel(1.0 / gamma), gamma)
            }
        };

        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let svm = solver.fit(&dataset)?;
        log::trace!("SVR ({params}) fitted on {n} samples");

        Ok(Self { params, gamma, svm })
    }

    pub fn params(&self) -> SvrParams {
        self.params
    }

    /// The kernel width actually used; zero for the linear kernel.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        self.svm.predict(&x)
    }
}
