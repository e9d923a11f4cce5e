//! # Error Taxonomy for the Computational Core
//!
//! Every failure inside training, prediction, ablation and scoring is fatal to the
//! evaluation call that raised it. There is no retry and no partial result: a failure
//! in one feature-group iteration aborts the whole evaluation so the ordered result
//! lists never silently lose an entry.

use thiserror::Error;

/// A comprehensive error type for the in-memory ablation pipeline.
#[derive(Error, Debug)]
pub enum AblationError {
    #[error("Unrecognized {setting} '{value}'. Expected one of: {expected}.")]
    InvalidConfiguration {
        setting: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Dimension mismatch in {context}: expected {expected}, found {found}.")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("The column '{column}' was not found in the '{table}' cohort table.")]
    MissingColumn { column: String, table: String },

    #[error(
        "Cross-validation requires at least {required} samples, but only {found} were provided."
    )]
    InsufficientSamples { found: usize, required: usize },

    #[error("Subject identifier '{subject}' appears more than once in the '{table}' cohort table.")]
    DuplicateSubject { subject: String, table: String },

    #[error("Feature column '{column}' appears more than once in the '{table}' cohort table.")]
    DuplicateColumn { column: String, table: String },

    #[error("Feature group '{0}' does not list any columns.")]
    EmptyGroup(String),

    #[error("Feature group '{0}' is defined more than once.")]
    DuplicateGroup(String),

    #[error("Feature group '{group}' lists the column '{column}' more than once.")]
    RepeatedGroupColumn { column: String, group: String },

    #[error("The feature group registry is empty; at least one group is required.")]
    EmptyRegistry,

    #[error("Column '{column}' is assigned to both feature group '{first}' and '{second}'.")]
    OverlappingGroups {
        column: String,
        first: String,
        second: String,
    },

    #[error("Non-finite values (NaN or Infinity) were found in {0}.")]
    NonFiniteValues(String),

    #[error("Eigendecomposition of the ridge Gram matrix failed: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error("Support-vector regression failed: {0}")]
    SupportVector(#[from] linfa_svm::SvmError),
}

impl AblationError {
    pub(crate) fn dimension(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}
