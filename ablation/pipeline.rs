//! # End-to-End Analysis
//!
//! `run_analysis` ties the layers together for one configuration: load and restrict the
//! cohorts, run the ablation, score every group and write the report. The binary is a
//! thin wrapper around it.

use crate::cohort::{CohortError, load_cohort, read_table};
use crate::config::{AnalysisConfig, ConfigError, TrainingSource};
use crate::error::AblationError;
use crate::evaluate::AblationEvaluator;
use crate::groups::FeatureGroup;
use crate::metrics::score;
use crate::progress::AblationProgressObserver;
use crate::report::{ReportError, write_report};
use crate::scaler::ScalerKind;
use crate::table::CohortTable;
use crate::trainer::{ModelKind, SearchSummary};
use ndarray::Array1;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cohort(#[from] CohortError),
    #[error(transparent)]
    Ablation(#[from] AblationError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Everything the report needs about one evaluated cohort.
#[derive(Debug, Clone)]
pub struct CohortOutcome {
    pub label: String,
    pub subject_ids: Vec<String>,
    pub ages: Array1<f64>,
    /// One prediction vector per withheld group, in registry order.
    pub predictions: Vec<Array1<f64>>,
    /// One MAE per withheld group, in registry order.
    pub mae: Vec<f64>,
}

impl CohortOutcome {
    fn score(table: &CohortTable, predictions: Vec<Array1<f64>>) -> Result<Self, AblationError> {
        let mae = score(&predictions, table.ages())?;
        Ok(Self {
            label: table.label().to_string(),
            subject_ids: table.subject_ids().to_vec(),
            ages: table.ages().to_owned(),
            predictions,
            mae,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub model: ModelKind,
    pub scaler: ScalerKind,
    pub groups: Vec<FeatureGroup>,
    pub searches: Vec<SearchSummary>,
    pub disease: CohortOutcome,
    pub control: Option<CohortOutcome>,
    /// Files written by the run.
    pub artifacts: Vec<PathBuf>,
}

impl AnalysisReport {
    /// Evaluated cohorts, disease first.
    pub fn cohorts(&self) -> impl Iterator<Item = &CohortOutcome> {
        std::iter::once(&self.disease).chain(self.control.as_ref())
    }
}

/// Cohort labels used in logs and file names.
pub const DISEASE_LABEL: &str = "disease";
pub const CONTROL_LABEL: &str = "control";
const TRAIN_LABEL: &str = "control_train";

struct LoadedCohorts {
    train: CohortTable,
    disease: CohortTable,
    control: Option<CohortTable>,
}

fn load_cohorts(config: &AnalysisConfig) -> Result<LoadedCohorts, PipelineError> {
    let schema = &config.schema;
    let inputs = &config.inputs;
    let reference = inputs
        .reference
        .as_deref()
        .map(read_table)
        .transpose()?;

    let disease = load_cohort(
        &inputs.disease,
        DISEASE_LABEL,
        schema,
        reference.as_ref(),
        config.strict_join,
    )?;

    // The split tables are derived from already restricted controls.
    let (train, control) = match inputs.training_source()? {
        TrainingSource::FullControl(path) => (
            load_cohort(
                path,
                CONTROL_LABEL,
                schema,
                reference.as_ref(),
                config.strict_join,
            )?,
            None,
        ),
        TrainingSource::Split { train, test } => (
            load_cohort(train, TRAIN_LABEL, schema, None, false)?,
            Some(load_cohort(test, CONTROL_LABEL, schema, None, false)?),
        ),
    };

    Ok(LoadedCohorts {
        train,
        disease,
        control,
    })
}

/// Loads, evaluates, scores and reports one configured analysis.
pub fn run_analysis<P>(
    config: &AnalysisConfig,
    progress: &P,
) -> Result<AnalysisReport, PipelineError>
where
    P: AblationProgressObserver + ?Sized,
{
    let groups = config.feature_groups()?;
    let cohorts = load_cohorts(config)?;
    log::info!(
        "Training on '{}' ({} subjects); evaluating '{}' ({} subjects){}",
        cohorts.train.label(),
        cohorts.train.n_subjects(),
        cohorts.disease.label(),
        cohorts.disease.n_subjects(),
        match &cohorts.control {
            Some(control) => format!(" and '{}' ({} subjects)", control.label(), control.n_subjects()),
            None => String::new(),
        }
    );

    let evaluator = AblationEvaluator::new(groups, config.cv);
    let results = evaluator.evaluate_with_progress(
        &cohorts.train,
        &cohorts.disease,
        config.model,
        config.scaler,
        cohorts.control.as_ref(),
        progress,
    )?;

    let searches = results.searches.clone();
    let (disease_results, control_results) = results.into_parts();
    let disease = CohortOutcome::score(&cohorts.disease, disease_results)?;
    let control = cohorts
        .control
        .as_ref()
        .map(|table| CohortOutcome::score(table, control_results))
        .transpose()?;

    let mut report = AnalysisReport {
        model: config.model,
        scaler: config.scaler,
        groups: evaluator.groups().as_slice().to_vec(),
        searches,
        disease,
        control,
        artifacts: Vec::new(),
    };
    report.artifacts = write_report(&report, &config.output_dir, config.plots)?;
    Ok(report)
}
