//! # Leave-One-Group-Out Ablation
//!
//! For every feature group, in registry order, a model is trained on the training cohort
//! with that group's columns withheld and then applied to the disease cohort and, when
//! supplied, to a held-out control cohort. The groups are independent of one another and
//! run on the rayon pool; results are collected back into registry order.

use crate::error::AblationError;
use crate::folds::CvSettings;
use crate::groups::{FeatureGroup, FeatureGroups};
use crate::progress::{AblationProgressObserver, AblationProgressStage, NoopAblationProgress};
use crate::scaler::ScalerKind;
use crate::table::CohortTable;
use crate::trainer::{ModelKind, SearchSummary, train};
use ndarray::Array1;
use rayon::prelude::*;
use std::collections::HashSet;

/// Prediction lists of one ablation pass, all in registry order.
#[derive(Debug, Clone)]
pub struct AblationResults {
    pub groups: Vec<String>,
    pub disease: Vec<Array1<f64>>,
    /// Empty when no control cohort was evaluated.
    pub control: Vec<Array1<f64>>,
    /// The hyperparameter search outcome behind each group's model.
    pub searches: Vec<SearchSummary>,
    control_evaluated: bool,
}

impl AblationResults {
    /// Whether a control cohort was supplied, independent of how many groups ran.
    pub fn has_control(&self) -> bool {
        self.control_evaluated
    }

    /// `(disease_results, control_results)`.
    pub fn into_parts(self) -> (Vec<Array1<f64>>, Vec<Array1<f64>>) {
        (self.disease, self.control)
    }
}

struct GroupOutcome {
    disease: Array1<f64>,
    control: Option<Array1<f64>>,
    search: SearchSummary,
}

#[derive(Debug, Clone)]
pub struct AblationEvaluator {
    groups: FeatureGroups,
    cv: CvSettings,
}

impl Default for AblationEvaluator {
    fn default() -> Self {
        Self::new(FeatureGroups::default(), CvSettings::default())
    }
}

impl AblationEvaluator {
    pub fn new(groups: FeatureGroups, cv: CvSettings) -> Self {
        Self { groups, cv }
    }

    pub fn groups(&self) -> &FeatureGroups {
        &self.groups
    }

    pub fn cv(&self) -> &CvSettings {
        &self.cv
    }

    pub fn evaluate(
        &self,
        train_cohort: &CohortTable,
        disease_cohort: &CohortTable,
        model_kind: ModelKind,
        scaler_kind: ScalerKind,
        control_cohort: Option<&CohortTable>,
    ) -> Result<AblationResults, AblationError> {
        self.evaluate_with_progress(
            train_cohort,
            disease_cohort,
            model_kind,
            scaler_kind,
            control_cohort,
            &NoopAblationProgress,
        )
    }

    pub fn evaluate_with_progress<P>(
        &self,
        train_cohort: &CohortTable,
        disease_cohort: &CohortTable,
        model_kind: ModelKind,
        scaler_kind: ScalerKind,
        control_cohort: Option<&CohortTable>,
        progress: &P,
    ) -> Result<AblationResults, AblationError>
    where
        P: AblationProgressObserver + ?Sized,
    {
        self.groups.validate_against(train_cohort)?;
        self.groups.validate_against(disease_cohort)?;
        check_no_extra_columns(train_cohort, disease_cohort)?;
        if let Some(control) = control_cohort {
            self.groups.validate_against(control)?;
            check_no_extra_columns(train_cohort, control)?;
        }

        log::info!(
            "Ablating {} feature groups with {model_kind} / {scaler_kind} on '{}' ({} subjects)",
            self.groups.len(),
            train_cohort.label(),
            train_cohort.n_subjects()
        );

        let stage = AblationProgressStage::GroupEvaluation;
        progress.on_stage_start(stage, self.groups.len());

        let outcomes = self
            .groups
            .as_slice()
            .par_iter()
            .map(|group| -> Result<GroupOutcome, AblationError> {
                let outcome = self.evaluate_group(
                    group,
                    train_cohort,
                    disease_cohort,
                    model_kind,
                    scaler_kind,
                    control_cohort,
                )?;
                progress.on_group_finish(stage, &group.name);
                Ok(outcome)
            })
            .collect::<Result<Vec<GroupOutcome>, AblationError>>()?;

        progress.on_stage_finish(stage);

        let mut results = AblationResults {
            groups: self.groups.names(),
            disease: Vec::with_capacity(outcomes.len()),
            control: Vec::new(),
            searches: Vec::with_capacity(outcomes.len()),
            control_evaluated: control_cohort.is_some(),
        };
        for outcome in outcomes {
            results.disease.push(outcome.disease);
            results.searches.push(outcome.search);
            if let Some(control) = outcome.control {
                results.control.push(control);
            }
        }
        Ok(results)
    }

    fn evaluate_group(
        &self,
        group: &FeatureGroup,
        train_cohort: &CohortTable,
        disease_cohort: &CohortTable,
        model_kind: ModelKind,
        scaler_kind: ScalerKind,
        control_cohort: Option<&CohortTable>,
    ) -> Result<GroupOutcome, AblationError> {
        let remaining = train_cohort.remaining_columns(&group.columns)?;
        let x_train = train_cohort.select_columns(&remaining)?;

        let model = train(
            x_train.view(),
            train_cohort.ages(),
            model_kind,
            scaler_kind,
            &self.cv,
        )?
        .with_feature_names(remaining);

        log::debug!(
            "Group '{}' withheld: {} features, {}",
            group.name,
            model.feature_names.len(),
            model.search.best
        );

        let disease = model.predict(disease_cohort.select_columns(&model.feature_names)?.view())?;
        let control = control_cohort
            .map(|table| model.predict(table.select_columns(&model.feature_names)?.view()))
            .transpose()?;

        Ok(GroupOutcome {
            disease,
            control,
            search: model.search,
        })
    }
}

/// Evaluation tables may not carry feature columns the training table lacks.
fn check_no_extra_columns(
    train_cohort: &CohortTable,
    evaluation: &CohortTable,
) -> Result<(), AblationError> {
    let known: HashSet<&str> = train_cohort
        .feature_names()
        .iter()
        .map(String::as_str)
        .collect();
    if evaluation
        .feature_names()
        .iter()
        .any(|name| !known.contains(name.as_str()))
    {
        return Err(AblationError::dimension(
            format!(
                "feature columns of '{}' vs. training table '{}'",
                evaluation.label(),
                train_cohort.label()
            ),
            train_cohort.feature_names().len(),
            evaluation.feature_names().len(),
        ));
    }
    Ok(())
}
