//! # Model Training with Cross-Validated Hyperparameter Search
//!
//! `train` is the single entry point. It:
//!
//! 1.  Fits the requested scaler on the training features, and only on them.
//! 2.  Scores every hyperparameter candidate by repeated k-fold cross-validation on the
//!     scaled features, using mean absolute error (lower is better).
//! 3.  Refits the winning candidate on the full scaled training set.
//!
//! The returned `TrainedModel` bundles the refitted regressor with the scaler it was
//! trained behind. The two are only meaningful together.

use crate::error::AblationError;
use crate::folds::{CvSettings, Fold, repeated_k_fold};
use crate::metrics::mean_absolute_error;
use crate::ridge::{RidgeModel, RidgePath, alpha_grid};
use crate::scaler::{FittedScaler, ScalerKind};
use crate::svr::{SvrModel, SvrParams, parameter_grid};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which regression family is searched and fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Ridge,
    SupportVector,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ridge => "ridge",
            Self::SupportVector => "svr",
        }
    }
}

impl FromStr for ModelKind {
    type Err = AblationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ridge" => Ok(Self::Ridge),
            "svr" | "svm" | "support-vector" | "support_vector" => Ok(Self::SupportVector),
            _ => Err(AblationError::InvalidConfiguration {
                setting: "model kind",
                value: value.to_string(),
                expected: "ridge, svr",
            }),
        }
    }
}

impl TryFrom<String> for ModelKind {
    type Error = AblationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The refitted final regressor.
#[derive(Debug, Clone)]
pub enum FittedRegressor {
    Ridge(RidgeModel),
    SupportVector(SvrModel),
}

impl FittedRegressor {
    /// Raw, unrounded predictions on already-scaled features.
    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        match self {
            Self::Ridge(model) => model.predict(x),
            Self::SupportVector(model) => model.predict(x),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Ridge(_) => ModelKind::Ridge,
            Self::SupportVector(_) => ModelKind::SupportVector,
        }
    }
}

/// The winning point of a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Hyperparameters {
    Ridge { alpha: f64 },
    SupportVector(SvrParams),
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ridge { alpha } => write!(f, "alpha={alpha:.6e}"),
            Self::SupportVector(params) => write!(f, "{params}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub best: Hyperparameters,
    /// Mean absolute error of `best`, averaged over every cross-validation fold.
    pub cv_mae: f64,
    pub candidates: usize,
}

/// A regressor together with the scaler it was trained behind.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub regressor: FittedRegressor,
    pub scaler: FittedScaler,
    /// Training column order; empty when trained from a bare matrix.
    pub feature_names: Vec<String>,
    pub search: SearchSummary,
}

impl TrainedModel {
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }
}

/// Fits `scaler_kind` on `features`, searches `model_kind` hyperparameters by
/// cross-validation and refits the best candidate on all rows.
pub fn train(
    features: ArrayView2<f64>,
    ages: ArrayView1<f64>,
    model_kind: ModelKind,
    scaler_kind: ScalerKind,
    cv: &CvSettings,
) -> Result<TrainedModel, AblationError> {
    if ages.len() != features.nrows() {
        return Err(AblationError::dimension(
            "training target length",
            features.nrows(),
            ages.len(),
        ));
    }
    if ages.iter().any(|v| !v.is_finite()) {
        return Err(AblationError::NonFiniteValues("the training ages".to_string()));
    }

    let scaler = FittedScaler::fit(scaler_kind, features)?;
    let scaled = scaler.transform(features)?;
    let folds = repeated_k_fold(scaled.nrows(), cv)?;

    log::debug!(
        "Searching {model_kind} hyperparameters on {} samples x {} features over {} folds",
        scaled.nrows(),
        scaled.ncols(),
        folds.len()
    );

    let (regressor, search) = match model_kind {
        ModelKind::Ridge => {
            let (alpha, summary) = search_ridge(scaled.view(), ages, &folds)?;
            let model = RidgePath::new(scaled.view(), ages)?.solve(alpha);
            (FittedRegressor::Ridge(model), summary)
        }
        ModelKind::SupportVector => {
            let (params, summary) = search_svr(scaled.view(), ages, &folds)?;
            let model = SvrModel::fit(scaled.view(), ages, params)?;
            (FittedRegressor::SupportVector(model), summary)
        }
    };

    log::info!(
        "Selected {model_kind} with {} (CV MAE {:.3} over {} candidates)",
        search.best,
        search.cv_mae,
        search.candidates
    );

    Ok(TrainedModel {
        regressor,
        scaler,
        feature_names: Vec::new(),
        search,
    })
}

/// Index of the lowest score; ties keep the earliest candidate.
fn first_minimum(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if !s.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if s >= current => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

fn split_rows(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    fold: &Fold,
) -> (
    Array2<f64>,
    Array1<f64>,
    Array2<f64>,
    Array1<f64>,
) {
    (
        x.select(Axis(0), &fold.train),
        y.select(Axis(0), &fold.train),
        x.select(Axis(0), &fold.test),
        y.select(Axis(0), &fold.test),
    )
}

fn search_ridge(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    folds: &[Fold],
) -> Result<(f64, SearchSummary), AblationError> {
    let alphas = alpha_grid();

    // One row of per-alpha errors per fold; folds are independent.
    let per_fold: Vec<Vec<f64>> = folds
        .par_iter()
        .map(|fold| -> Result<Vec<f64>, AblationError> {
            let (x_train, y_train, x_test, y_test) = split_rows(x, y, fold);
            let path = RidgePath::new(x_train.view(), y_train.view())?;
            alphas
                .iter()
                .map(|&alpha| {
                    let predicted = path.solve(alpha).predict(x_test.view());
                    mean_absolute_error(predicted.view(), y_test.view())
                })
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect::<Result<_, AblationError>>()?;

    let mut mean_scores = vec![0.0; alphas.len()];
    for row in &per_fold {
        for (total, &value) in mean_scores.iter_mut().zip(row) {
            *total += value;
        }
    }
    mean_scores
        .iter_mut()
        .for_each(|total| *total /= per_fold.len() as f64);

    let best = first_minimum(&mean_scores).ok_or_else(|| {
        AblationError::NonFiniteValues("every ridge cross-validation score".to_string())
    })?;
    Ok((
        alphas[best],
        SearchSummary {
            best: Hyperparameters::Ridge {
                alpha: alphas[best],
            },
            cv_mae: mean_scores[best],
            candidates: alphas.len(),
        },
    ))
}

fn search_svr(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    folds: &[Fold],
) -> Result<(SvrParams, SearchSummary), AblationError> {
    let grid = parameter_grid();

    // Candidates run on the rayon pool; collection keeps grid order.
    let mean_scores: Vec<f64> = grid
        .par_iter()
        .map(|&params| -> Result<f64, AblationError> {
            let mut total = 0.0;
            for fold in folds {
                let (x_train, y_train, x_test, y_test) = split_rows(x, y, fold);
                let model = SvrModel::fit(x_train.view(), y_train.view(), params)?;
                let predicted = model.predict(x_test.view());
                total += mean_absolute_error(predicted.view(), y_test.view())?;
            }
            let mean = total / folds.len() as f64;
            log::debug!("SVR candidate ({params}): CV MAE {mean:.4}");
            Ok(mean)
        })
        .collect::<Result<_, AblationError>>()?;

    let best = first_minimum(&mean_scores).ok_or_else(|| {
        AblationError::NonFiniteValues("every SVR cross-validation score".to_string())
    })?;
    Ok((
        grid[best],
        SearchSummary {
            best: Hyperparameters::SupportVector(grid[best]),
            cv_mae: mean_scores[best],
            candidates: grid.len(),
        },
    ))
}
