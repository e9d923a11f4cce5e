#![deny(unused_variables)]
pub mod cohort;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod folds;
pub mod groups;
pub mod metrics;
pub mod pipeline;
pub mod predict;
pub mod progress;
pub mod ridge;
pub mod scaler;
pub mod svr;
pub mod table;
pub mod trainer;

// Output rendering lives beside the core and only consumes finished results.
#[path = "../report/mod.rs"]
pub mod report;

pub use error::AblationError;
pub use evaluate::{AblationEvaluator, AblationResults};
pub use groups::{FeatureGroup, FeatureGroups};
pub use metrics::{mean_absolute_error, score};
pub use predict::predict;
pub use scaler::{FittedScaler, ScalerKind};
pub use table::CohortTable;
pub use trainer::{FittedRegressor, ModelKind, TrainedModel, train};
