//! Column-wise feature scaling fitted on training data only.

use crate::error::AblationError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which scaler is fitted before the hyperparameter search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalerKind {
    /// (x - min) / (max - min)
    MinMax,
    /// (x - mean) / std, with the population standard deviation.
    Standard,
}

impl ScalerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MinMax => "min-max",
            Self::Standard => "standard",
        }
    }
}

impl FromStr for ScalerKind {
    type Err = AblationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "min-max" | "minmax" | "min_max" => Ok(Self::MinMax),
            "standard" | "z-score" => Ok(Self::Standard),
            _ => Err(AblationError::InvalidConfiguration {
                setting: "scaler kind",
                value: value.to_string(),
                expected: "min-max, standard",
            }),
        }
    }
}

impl TryFrom<String> for ScalerKind {
    type Error = AblationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScalerKind> for String {
    fn from(kind: ScalerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scaler whose per-column parameters were learned from one training matrix.
///
/// `transform(x) = (x - offset) / scale`, column by column. Constant columns get a scale
/// of 1 so they map to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedScaler {
    kind: ScalerKind,
    offset: Array1<f64>,
    scale: Array1<f64>,
}

impl FittedScaler {
    pub fn fit(kind: ScalerKind, x: ArrayView2<f64>) -> Result<Self, AblationError> {
        let n = x.nrows();
        if n == 0 {
            return Err(AblationError::InsufficientSamples {
                found: 0,
                required: 1,
            });
        }

        let (offset, spread) = match kind {
            ScalerKind::MinMax => {
                let min = x.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
                let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
                let range = &max - &min;
                (min, range)
            }
            ScalerKind::Standard => {
                let mean = x.sum_axis(Axis(0)) / n as f64;
                let mut variance = Array1::<f64>::zeros(x.ncols());
                for row in x.axis_iter(Axis(0)) {
                    variance
                        .iter_mut()
                        .zip(row.iter().zip(mean.iter()))
                        .for_each(|(var, (&v, &m))| *var += (v - m) * (v - m));
                }
                let std = variance.mapv(|v| (v / n as f64).sqrt());
                (mean, std)
            }
        };

        let scale = spread.mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        Ok(Self {
            kind,
            offset,
            scale,
        })
    }

    pub fn kind(&self) -> ScalerKind {
        self.kind
    }

    pub fn n_features(&self) -> usize {
        self.offset.len()
    }

    /// Applies the fitted parameters to `x` without refitting.
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, AblationError> {
        if x.ncols() != self.n_features() {
            return Err(AblationError::dimension(
                "scaled feature columns",
                self.n_features(),
                x.ncols(),
            ));
        }
        let mut out = x.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            row -= &self.offset;
            row /= &self.scale;
        }
        Ok(out)
    }
}
