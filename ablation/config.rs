//! The analysis configuration file.
//!
//! One TOML document describes a complete, reproducible run: which files to read, how
//! their columns are named, which model and scaler to use, the cross-validation scheme
//! and where the report goes. Relative input paths are resolved against the directory of
//! the configuration file, so a configuration can travel with its data.

use crate::cohort::CohortSchema;
use crate::error::AblationError;
use crate::folds::CvSettings;
use crate::groups::{FeatureGroup, FeatureGroups};
use crate::scaler::ScalerKind;
use crate::trainer::ModelKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error(
        "No training cohort configured. Set 'inputs.control', or both 'inputs.train_split' and 'inputs.test_split'."
    )]
    MissingTrainingInput,
    #[error("Invalid feature-group override: {0}")]
    Groups(#[from] AblationError),
}

/// Cohort files read by one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPaths {
    /// Full healthy-control table. Used for training when no split is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<PathBuf>,
    pub disease: PathBuf,
    /// Subject list (identifier + diagnosis) that the control and disease tables are
    /// restricted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,
    /// Age-matched training subset of the controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_split: Option<PathBuf>,
    /// Held-out control subset, evaluated alongside the disease cohort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_split: Option<PathBuf>,
}

/// Where the model is trained and which cohorts it is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingSource<'a> {
    /// Train on the full control table; only the disease cohort is evaluated.
    FullControl(&'a Path),
    /// Train on the split's training subset; its test subset is evaluated too.
    Split { train: &'a Path, test: &'a Path },
}

impl InputPaths {
    pub fn training_source(&self) -> Result<TrainingSource<'_>, ConfigError> {
        match (&self.train_split, &self.test_split, &self.control) {
            (Some(train), Some(test), _) => Ok(TrainingSource::Split { train, test }),
            (None, None, Some(control)) => Ok(TrainingSource::FullControl(control)),
            _ => Err(ConfigError::MissingTrainingInput),
        }
    }

    fn resolve_against(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.disease);
        for path in [
            &mut self.control,
            &mut self.reference,
            &mut self.train_split,
            &mut self.test_split,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

/// A complete analysis run.
///
/// Plain values come before the tables so the serialized TOML stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub model: ModelKind,
    pub scaler: ScalerKind,
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub plots: bool,
    /// Fail instead of warning when the reference list drops subjects.
    #[serde(default)]
    pub strict_join: bool,
    pub inputs: InputPaths,
    #[serde(default)]
    pub schema: CohortSchema,
    #[serde(default)]
    pub cv: CvSettings,
    /// Replaces the built-in seven imaging groups when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_groups: Option<Vec<FeatureGroup>>,
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Ridge,
            scaler: ScalerKind::MinMax,
            output_dir: PathBuf::from("brainage_results"),
            plots: true,
            strict_join: false,
            inputs: InputPaths {
                control: Some(PathBuf::from("control.csv")),
                disease: PathBuf::from("disease.csv"),
                reference: Some(PathBuf::from("complete_subjects.csv")),
                train_split: None,
                test_split: None,
            },
            schema: CohortSchema::default(),
            cv: CvSettings::default(),
            feature_groups: None,
        }
    }
}

impl AnalysisConfig {
    /// Parses a configuration file and resolves its relative input paths.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text)?;
        if let Some(base) = path.parent() {
            config.inputs.resolve_against(base);
        }
        config.inputs.training_source()?;
        Ok(config)
    }

    /// Writes the configuration in human-readable TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path).map_err(io_error)?);
        file.write_all(toml_string.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        Ok(())
    }

    /// The validated group registry: the override when configured, else the default.
    pub fn feature_groups(&self) -> Result<FeatureGroups, ConfigError> {
        match &self.feature_groups {
            Some(groups) => Ok(FeatureGroups::new(groups.clone())?),
            None => Ok(FeatureGroups::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_template_survives_a_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        let config = AnalysisConfig::default();
        config.save(&path).unwrap();

        let loaded = AnalysisConfig::load(&path).unwrap();
        assert_eq!(loaded.model, ModelKind::Ridge);
        assert_eq!(loaded.scaler, ScalerKind::MinMax);
        assert_eq!(loaded.cv, CvSettings::default());
        assert_eq!(loaded.inputs.disease, dir.path().join("disease.csv"));
        assert_eq!(loaded.feature_groups().unwrap().len(), 7);
    }

    #[test]
    fn minimal_file_uses_defaults_and_a_group_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        fs::write(
            &path,
            r#"
model = "svr"
scaler = "standard"
output_dir = "/tmp/out"

[inputs]
disease = "/data/disease.tsv"
train_split = "train.tsv"
test_split = "test.tsv"

[cv]
folds = 3

[[feature_groups]]
name = "thickness"
columns = ["thick_a", "thick_b"]
"#,
        )
        .unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.model, ModelKind::SupportVector);
        assert!(config.plots);
        assert!(!config.strict_join);
        assert_eq!(config.cv.folds, 3);
        assert_eq!(config.cv.repeats, 10);
        assert_eq!(config.schema, CohortSchema::default());
        assert_eq!(config.inputs.disease, PathBuf::from("/data/disease.tsv"));
        match config.inputs.training_source().unwrap() {
            TrainingSource::Split { train, test } => {
                assert_eq!(train, dir.path().join("train.tsv"));
                assert_eq!(test, dir.path().join("test.tsv"));
            }
            other => panic!("Expected a split source, got {other:?}"),
        }
        let groups = config.feature_groups().unwrap();
        assert_eq!(groups.names(), vec!["thickness"]);
        assert_eq!(groups.as_slice()[0].display_label(), "thickness");
    }

    #[test]
    fn empty_group_list_is_rejected() {
        let text = r#"
model = "ridge"
scaler = "min-max"
output_dir = "out"
feature_groups = []

[inputs]
control = "c.csv"
disease = "d.csv"
"#;
        let config = toml::from_str::<AnalysisConfig>(text).unwrap();
        assert!(matches!(
            config.feature_groups(),
            Err(ConfigError::Groups(AblationError::EmptyRegistry))
        ));
    }

    #[test]
    fn unknown_model_kind_is_reported_with_its_value() {
        let text = r#"
model = "lasso"
scaler = "min-max"
output_dir = "out"

[inputs]
control = "c.csv"
disease = "d.csv"
"#;
        let err = toml::from_str::<AnalysisConfig>(text).unwrap_err();
        assert!(err.to_string().contains("lasso"), "{err}");
    }

    #[test]
    fn a_lone_split_half_is_not_a_training_source() {
        let inputs = InputPaths {
            disease: PathBuf::from("d.csv"),
            train_split: Some(PathBuf::from("train.csv")),
            ..InputPaths::default()
        };
        assert!(matches!(
            inputs.training_source(),
            Err(ConfigError::MissingTrainingInput)
        ));
    }
}
