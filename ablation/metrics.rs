//! Error aggregation and the summary statistics drawn on the report plots.

use crate::error::AblationError;
use ndarray::{Array1, ArrayView1};

/// Mean of `|prediction - truth|`.
pub fn mean_absolute_error(
    predictions: ArrayView1<f64>,
    truth: ArrayView1<f64>,
) -> Result<f64, AblationError> {
    if predictions.len() != truth.len() {
        return Err(AblationError::dimension(
            "prediction vs. ground-truth length",
            truth.len(),
            predictions.len(),
        ));
    }
    if truth.is_empty() {
        return Err(AblationError::InsufficientSamples {
            found: 0,
            required: 1,
        });
    }
    let total: f64 = predictions
        .iter()
        .zip(truth.iter())
        .map(|(p, t)| (p - t).abs())
        .sum();
    Ok(total / truth.len() as f64)
}

/// One mean absolute error per prediction result, in input order.
pub fn score(
    results: &[Array1<f64>],
    truth: ArrayView1<f64>,
) -> Result<Vec<f64>, AblationError> {
    results
        .iter()
        .map(|predictions| mean_absolute_error(predictions.view(), truth))
        .collect()
}

/// Pearson correlation. `None` when the lengths differ, fewer than two points are given,
/// or either side has zero variance.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mx = x.sum() / n as f64;
    let my = y.sum() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y.iter()) {
        let (da, db) = (a - mx, b - my);
        sxy += da * db;
        sxx += da * da;
        syy += db * db;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Least-squares `(slope, intercept)` of `y` on `x`. `None` for fewer than two points or a
/// constant `x`.
pub fn linear_fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Option<(f64, f64)> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mx = x.sum() / n as f64;
    let my = y.sum() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (&a, &b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
    }
    if sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}
