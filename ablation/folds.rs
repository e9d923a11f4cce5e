//! Seeded repeated k-fold splitting for the hyperparameter searches.

use crate::error::AblationError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Cross-validation scheme shared by every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvSettings {
    pub folds: usize,
    pub repeats: usize,
    pub seed: u64,
}

impl Default for CvSettings {
    fn default() -> Self {
        Self {
            folds: 5,
            repeats: 10,
            seed: 1,
        }
    }
}

/// One train/test partition of the sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Generates `repeats * folds` partitions of `0..n_samples`.
///
/// A single RNG seeded from `settings.seed` shuffles the indices once per repeat, so the
/// whole sequence of partitions is reproducible. Within a repeat the first
/// `n_samples % folds` folds receive one extra test sample.
pub fn repeated_k_fold(n_samples: usize, settings: &CvSettings) -> Result<Vec<Fold>, AblationError> {
    if settings.folds < 2 {
        return Err(AblationError::InvalidConfiguration {
            setting: "cross-validation fold count",
            value: settings.folds.to_string(),
            expected: "an integer of at least 2",
        });
    }
    if settings.repeats == 0 {
        return Err(AblationError::InvalidConfiguration {
            setting: "cross-validation repeat count",
            value: settings.repeats.to_string(),
            expected: "an integer of at least 1",
        });
    }
    if n_samples < settings.folds {
        return Err(AblationError::InsufficientSamples {
            found: n_samples,
            required: settings.folds,
        });
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let base = n_samples / settings.folds;
    let remainder = n_samples % settings.folds;

    let mut splits = Vec::with_capacity(settings.folds * settings.repeats);
    for _ in 0..settings.repeats {
        indices.shuffle(&mut rng);

        let mut start = 0;
        for fold in 0..settings.folds {
            let size = if fold < remainder { base + 1 } else { base };
            let end = start + size;
            let test = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();
            splits.push(Fold { train, test });
            start = end;
        }
    }

    Ok(splits)
}
