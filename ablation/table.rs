//! In-memory cohort tables consumed by the statistical core.
//!
//! A `CohortTable` is what remains of a cohort file after the loader has validated it:
//! the three non-feature columns are split out into their own vectors and every feature
//! column is a finite `f64` column of one dense matrix.

use crate::error::AblationError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct CohortTable {
    label: String,
    subject_ids: Vec<String>,
    diagnoses: Vec<String>,
    ages: Array1<f64>,
    feature_names: Vec<String>,
    /// Shape: [n_subjects, n_features], columns ordered as `feature_names`.
    features: Array2<f64>,
    column_index: HashMap<String, usize>,
}

impl CohortTable {
    /// Builds a table, checking that every per-subject vector has one entry per row,
    /// that subject identifiers are unique and that all numeric values are finite.
    pub fn new(
        label: impl Into<String>,
        subject_ids: Vec<String>,
        diagnoses: Vec<String>,
        ages: Array1<f64>,
        feature_names: Vec<String>,
        features: Array2<f64>,
    ) -> Result<Self, AblationError> {
        let label = label.into();
        let n = features.nrows();

        if subject_ids.len() != n {
            return Err(AblationError::dimension(
                format!("subject identifiers of '{label}'"),
                n,
                subject_ids.len(),
            ));
        }
        if diagnoses.len() != n {
            return Err(AblationError::dimension(
                format!("diagnosis labels of '{label}'"),
                n,
                diagnoses.len(),
            ));
        }
        if ages.len() != n {
            return Err(AblationError::dimension(
                format!("ages of '{label}'"),
                n,
                ages.len(),
            ));
        }
        if feature_names.len() != features.ncols() {
            return Err(AblationError::dimension(
                format!("feature columns of '{label}'"),
                features.ncols(),
                feature_names.len(),
            ));
        }

        let mut seen = HashSet::with_capacity(n);
        for id in &subject_ids {
            if !seen.insert(id.as_str()) {
                return Err(AblationError::DuplicateSubject {
                    subject: id.clone(),
                    table: label,
                });
            }
        }

        if ages.iter().any(|v| !v.is_finite()) {
            return Err(AblationError::NonFiniteValues(format!(
                "the ages of '{label}'"
            )));
        }
        for (j, column) in features.axis_iter(Axis(1)).enumerate() {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(AblationError::NonFiniteValues(format!(
                    "column '{}' of '{label}'",
                    feature_names[j]
                )));
            }
        }

        let mut column_index = HashMap::with_capacity(feature_names.len());
        for (j, name) in feature_names.iter().enumerate() {
            if column_index.insert(name.clone(), j).is_some() {
                return Err(AblationError::DuplicateColumn {
                    column: name.clone(),
                    table: label,
                });
            }
        }

        Ok(Self {
            label,
            subject_ids,
            diagnoses,
            ages,
            feature_names,
            features,
            column_index,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn n_subjects(&self) -> usize {
        self.features.nrows()
    }

    pub fn subject_ids(&self) -> &[String] {
        &self.subject_ids
    }

    pub fn diagnoses(&self) -> &[String] {
        &self.diagnoses
    }

    pub fn ages(&self) -> ArrayView1<'_, f64> {
        self.ages.view()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Feature column names left after removing `excluded`, in table order.
    ///
    /// Every excluded column must exist; removal of an absent column is reported as
    /// `MissingColumn` at this point rather than silently ignored.
    pub fn remaining_columns(&self, excluded: &[String]) -> Result<Vec<String>, AblationError> {
        for column in excluded {
            if !self.has_column(column) {
                return Err(AblationError::MissingColumn {
                    column: column.clone(),
                    table: self.label.clone(),
                });
            }
        }
        let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
        Ok(self
            .feature_names
            .iter()
            .filter(|name| !excluded.contains(name.as_str()))
            .cloned()
            .collect())
    }

    /// Gathers the named columns, in the given order, into a new dense matrix.
    pub fn select_columns(&self, columns: &[String]) -> Result<Array2<f64>, AblationError> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index
                    .get(name)
                    .copied()
                    .ok_or_else(|| AblationError::MissingColumn {
                        column: name.clone(),
                        table: self.label.clone(),
                    })
            })
            .collect::<Result<Vec<usize>, _>>()?;
        Ok(self.features.select(Axis(1), &indices))
    }
}
