//! # Cohort Loading and Reference Restriction
//!
//! This module is the only place where cohort files are read. It turns a delimited text
//! file into a validated `CohortTable`:
//!
//! - The three non-feature columns are named by a `CohortSchema`. Every other column,
//!   except the schema's auxiliary columns, is a feature and must be numeric.
//! - Missing, non-numeric and non-finite values are rejected with the offending column
//!   named, since they are almost always a problem with the exported spreadsheet.
//! - Restricting a cohort to a reference subject list is an explicit step whose row loss
//!   is logged, and optionally made fatal, rather than a silent side effect of a merge.

use crate::error::AblationError;
use crate::table::CohortTable;
use ndarray::{Array1, Array2, ShapeBuilder};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Names of the non-feature columns of a cohort file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortSchema {
    pub subject_id: String,
    pub diagnosis: String,
    pub age: String,
    /// Dropped when present, e.g. the age-matching group of the split tables.
    pub auxiliary: Vec<String>,
}

impl Default for CohortSchema {
    fn default() -> Self {
        Self {
            subject_id: "subject_id".to_string(),
            diagnosis: "diagnosis".to_string(),
            age: "age".to_string(),
            auxiliary: vec!["age_group".to_string()],
        }
    }
}

impl CohortSchema {
    fn is_non_feature(&self, column: &str) -> bool {
        column == self.subject_id
            || column == self.diagnosis
            || column == self.age
            || self.auxiliary.iter().any(|a| a == column)
    }
}

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error while reading '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(
        "The required column '{column}' was not found in '{table}'. Please check spelling and case."
    )]
    ColumnNotFound { column: String, table: String },
    #[error(
        "The column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the column '{0}'. Cohort tables must be complete."
    )]
    MissingValuesFound(String),
    #[error("Non-finite values (NaN or Infinity) were found in the column '{0}'.")]
    NonFiniteValuesFound(String),
    #[error(
        "Restricting '{table}' to the reference subject list matched no rows. Check that the identifier and diagnosis columns use the same coding."
    )]
    JoinEmptyResult { table: String },
    #[error(
        "Restricting '{table}' to the reference subject list dropped {dropped} of {total} subjects."
    )]
    SubjectsDropped {
        table: String,
        dropped: usize,
        total: usize,
    },
    #[error(transparent)]
    Table(#[from] AblationError),
}

/// Reads a delimited file with a header row. `.tsv` and `.txt` are tab-separated;
/// everything else is comma-separated.
pub fn read_table(path: &Path) -> Result<DataFrame, CohortError> {
    let separator = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    };

    let file = File::open(path).map_err(|source| CohortError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let df = CsvReader::new(file)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;

    log::info!(
        "Loaded '{}': {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

fn require_column(df: &DataFrame, column: &str, table: &str) -> Result<(), CohortError> {
    if df.get_column_names().iter().any(|c| c.as_str() == column) {
        Ok(())
    } else {
        Err(CohortError::ColumnNotFound {
            column: column.to_string(),
            table: table.to_string(),
        })
    }
}

/// Keeps the rows of `table` whose (subject identifier, diagnosis) pair appears in
/// `reference`. Both keys are compared as strings. Each subject is kept at most once, even
/// when the reference lists it repeatedly.
///
/// Zero matches is always an error. Any other loss is logged as a warning, or returned as
/// `SubjectsDropped` when `strict` is set.
pub fn restrict_to_reference(
    table: DataFrame,
    reference: &DataFrame,
    schema: &CohortSchema,
    label: &str,
    strict: bool,
) -> Result<DataFrame, CohortError> {
    for column in [&schema.subject_id, &schema.diagnosis] {
        require_column(&table, column, label)?;
        require_column(reference, column, "reference")?;
    }

    let total = table.height();
    let keys = [col(schema.subject_id.as_str()), col(schema.diagnosis.as_str())];
    let as_strings = [
        col(schema.subject_id.as_str()).cast(DataType::String),
        col(schema.diagnosis.as_str()).cast(DataType::String),
    ];

    let reference_keys = reference
        .clone()
        .lazy()
        .select(as_strings.clone());
    let restricted = table
        .lazy()
        .with_columns(as_strings)
        .join(
            reference_keys,
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Semi),
        )
        .collect()?;

    let kept = restricted.height();
    log::info!("Restricted '{label}' to the reference list: {total} -> {kept} subjects");
    if kept == 0 {
        return Err(CohortError::JoinEmptyResult {
            table: label.to_string(),
        });
    }
    if kept < total {
        if strict {
            return Err(CohortError::SubjectsDropped {
                table: label.to_string(),
                dropped: total - kept,
                total,
            });
        }
        log::warn!(
            "{} of {total} subjects in '{label}' have no reference entry and were dropped",
            total - kept
        );
    }
    Ok(restricted)
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, CohortError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(CohortError::MissingValuesFound(column_name.to_string()));
    }

    let casted = series
        .cast(&DataType::Float64)
        .map_err(|_| CohortError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", series.dtype()),
        })?;
    // The cast is non-strict: unparsable strings become nulls.
    if casted.null_count() > 0 {
        return Err(CohortError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type: "f64 (numeric)",
            found_type: format!("{:?}", series.dtype()),
        });
    }

    let values: Vec<f64> = casted.f64()?.rechunk().into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CohortError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

fn extract_text_column(df: &DataFrame, column_name: &str) -> Result<Vec<String>, CohortError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(CohortError::MissingValuesFound(column_name.to_string()));
    }
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Validates `df` against `schema` and converts it into a `CohortTable`.
pub fn table_from_frame(
    df: &DataFrame,
    label: &str,
    schema: &CohortSchema,
) -> Result<CohortTable, CohortError> {
    for column in [&schema.subject_id, &schema.diagnosis, &schema.age] {
        require_column(df, column, label)?;
    }

    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|c| c.to_string())
        .filter(|c| !schema.is_non_feature(c))
        .collect();
    let dropped: Vec<&String> = schema
        .auxiliary
        .iter()
        .filter(|a| df.get_column_names().iter().any(|c| c.as_str() == a.as_str()))
        .collect();
    if !dropped.is_empty() {
        log::debug!("Dropping auxiliary columns {dropped:?} from '{label}'");
    }

    let subject_ids = extract_text_column(df, &schema.subject_id)?;
    let diagnoses = extract_text_column(df, &schema.diagnosis)?;
    let ages = Array1::from_vec(extract_numeric_column(df, &schema.age)?);

    let n = df.height();
    let mut buffer = Vec::with_capacity(n * feature_names.len());
    for name in &feature_names {
        buffer.extend(extract_numeric_column(df, name)?);
    }
    // Column-major buffer, one feature column after another.
    let features = Array2::from_shape_vec((n, feature_names.len()).f(), buffer).map_err(|_| {
        AblationError::dimension(format!("feature buffer of '{label}'"), n, 0)
    })?;

    let table = CohortTable::new(label, subject_ids, diagnoses, ages, feature_names, features)?;
    log::debug!(
        "Cohort '{label}': {} subjects, {} feature columns",
        table.n_subjects(),
        table.feature_names().len()
    );
    Ok(table)
}

/// Reads, optionally restricts and validates one cohort file.
pub fn load_cohort(
    path: &Path,
    label: &str,
    schema: &CohortSchema,
    reference: Option<&DataFrame>,
    strict_join: bool,
) -> Result<CohortTable, CohortError> {
    let mut df = read_table(path)?;
    if let Some(reference) = reference {
        df = restrict_to_reference(df, reference, schema, label, strict_join)?;
    }
    table_from_frame(&df, label, schema)
}
