//! Applying a trained model to new cohorts.

use crate::error::AblationError;
use crate::scaler::FittedScaler;
use crate::trainer::{FittedRegressor, TrainedModel};
use ndarray::{Array1, ArrayView2};

/// Predictions are reported in years to this many decimal places.
pub const PREDICTION_DECIMALS: i32 = 3;

/// Rounds half-way cases to the even neighbour, the way array libraries do.
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Scales `features` with the already fitted `scaler` (never refitted), applies
/// `regressor` and rounds each prediction.
///
/// The caller must pass a scaler/regressor pair produced by the same `train` call. A pair
/// from different calls yields meaningless numbers, not an error. Only the column count is
/// checked.
pub fn predict(
    regressor: &FittedRegressor,
    scaler: &FittedScaler,
    features: ArrayView2<f64>,
) -> Result<Array1<f64>, AblationError> {
    let scaled = scaler.transform(features)?;
    Ok(regressor
        .predict(scaled.view())
        .mapv(|v| round_to_decimals(v, PREDICTION_DECIMALS)))
}

impl TrainedModel {
    pub fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>, AblationError> {
        predict(&self.regressor, &self.scaler, features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folds::CvSettings;
    use crate::scaler::ScalerKind;
    use crate::trainer::{ModelKind, train};
    use ndarray::{Array2, array};

    #[test]
    fn rounding_is_to_three_places_with_ties_to_even() {
        assert_eq!(round_to_decimals(41.23449, 3), 41.234);
        assert_eq!(round_to_decimals(41.2346, 3), 41.235);
        assert_eq!(round_to_decimals(0.5, 0), 0.0);
        assert_eq!(round_to_decimals(1.5, 0), 2.0);
        assert_eq!(round_to_decimals(-2.5, 0), -2.0);
    }

    #[test]
    fn every_prediction_is_already_rounded() {
        let x = Array2::from_shape_fn((12, 3), |(i, j)| (i * (j + 1)) as f64 + 0.37 * j as f64);
        let ages = Array1::from_shape_fn(12, |i| 23.3 + 4.71 * i as f64);
        let cv = CvSettings {
            folds: 3,
            repeats: 1,
            seed: 7,
        };
        let model = train(x.view(), ages.view(), ModelKind::Ridge, ScalerKind::MinMax, &cv).unwrap();
        let predictions = model.predict(x.view()).unwrap();
        assert_eq!(predictions.len(), 12);
        for &p in predictions.iter() {
            assert!(p.is_finite());
            assert_eq!(p, round_to_decimals(p, PREDICTION_DECIMALS));
        }
    }

    #[test]
    fn width_mismatch_is_a_dimension_error() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 0.0]];
        let ages = array![30.0, 40.0, 50.0, 60.0];
        let cv = CvSettings {
            folds: 2,
            repeats: 1,
            seed: 1,
        };
        let model = train(x.view(), ages.view(), ModelKind::Ridge, ScalerKind::Standard, &cv).unwrap();
        let err = model.predict(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, AblationError::DimensionMismatch { .. }));
    }
}
