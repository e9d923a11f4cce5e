use brainage::config::{AnalysisConfig, InputPaths};
use brainage::folds::CvSettings;
use brainage::pipeline::run_analysis;
use brainage::predict::{PREDICTION_DECIMALS, round_to_decimals};
use brainage::progress::NoopAblationProgress;
use brainage::{
    AblationError, AblationEvaluator, CohortTable, FeatureGroup, FeatureGroups, ModelKind,
    ScalerKind, score, train,
};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// The built-in registry cut down to two columns per group.
fn two_column_groups() -> FeatureGroups {
    let groups = FeatureGroups::default()
        .iter()
        .map(|g| FeatureGroup {
            name: g.name.clone(),
            label: g.label.clone(),
            columns: g.columns.iter().take(2).cloned().collect(),
        })
        .collect();
    FeatureGroups::new(groups).unwrap()
}

fn feature_columns(groups: &FeatureGroups) -> Vec<String> {
    groups.iter().flat_map(|g| g.columns.iter().cloned()).collect()
}

/// Subjects with ages uniform in [20, 80) and features loosely tracking age.
fn synthetic_cohort(
    label: &str,
    diagnosis: &str,
    n: usize,
    columns: &[String],
    seed: u64,
) -> CohortTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let ages: Array1<f64> = (0..n).map(|_| rng.gen_range(20.0..80.0)).collect();
    let mut features = Array2::<f64>::zeros((n, columns.len()));
    for i in 0..n {
        for j in 0..columns.len() {
            let slope = if j % 2 == 0 { 0.05 } else { -0.03 };
            features[[i, j]] = 1.0 + j as f64 + slope * ages[i] + rng.gen_range(-0.2..0.2);
        }
    }
    CohortTable::new(
        label,
        (0..n).map(|i| format!("{label}-{i:03}")).collect(),
        vec![diagnosis.to_string(); n],
        ages,
        columns.to_vec(),
        features,
    )
    .unwrap()
}

fn write_csv(path: &Path, table: &CohortTable, extra_column: Option<&str>) {
    let mut text = String::from("subject_id,diagnosis,age");
    if let Some(extra) = extra_column {
        text.push(',');
        text.push_str(extra);
    }
    for name in table.feature_names() {
        text.push(',');
        text.push_str(name);
    }
    text.push('\n');
    for i in 0..table.n_subjects() {
        text.push_str(&format!(
            "{},{},{}",
            table.subject_ids()[i],
            table.diagnoses()[i],
            table.ages()[i]
        ));
        if extra_column.is_some() {
            text.push_str(if table.ages()[i] < 50.0 { ",young" } else { ",old" });
        }
        for value in table.features().row(i) {
            text.push_str(&format!(",{value}"));
        }
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

#[test]
fn ridge_min_max_without_control_gives_seven_disease_results() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    assert_eq!(columns.len(), 14);

    let control = synthetic_cohort("control", "HC", 10, &columns, 11);
    let disease = synthetic_cohort("disease", "PD", 5, &columns, 12);

    let evaluator = AblationEvaluator::new(groups.clone(), CvSettings::default());
    let results = evaluator
        .evaluate(&control, &disease, ModelKind::Ridge, ScalerKind::MinMax, None)
        .unwrap();
    assert_eq!(results.groups, groups.names());

    let (disease_results, control_results) = results.into_parts();
    assert_eq!(disease_results.len(), 7);
    assert!(disease_results.iter().all(|p| p.len() == 5));
    assert!(control_results.is_empty());

    let mae = score(&disease_results, disease.ages()).unwrap();
    assert_eq!(mae.len(), 7);
    assert!(mae.iter().all(|m| m.is_finite() && *m >= 0.0));
}

#[test]
fn support_vector_ablation_tracks_age_in_every_group() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    let control = synthetic_cohort("control", "HC", 60, &columns, 41);
    let disease = synthetic_cohort("disease", "PD", 20, &columns, 42);

    let evaluator = AblationEvaluator::new(groups.clone(), CvSettings::default());
    let results = evaluator
        .evaluate(
            &control,
            &disease,
            ModelKind::SupportVector,
            ScalerKind::Standard,
            None,
        )
        .unwrap();
    assert_eq!(results.groups, groups.names());
    assert!(!results.has_control());
    assert_eq!(results.disease.len(), 7);

    // Predicting the median age for everyone is the no-signal baseline.
    let mut sorted = disease.ages().to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = (sorted[9] + sorted[10]) / 2.0;
    let baseline = disease.ages().iter().map(|a| (a - median).abs()).sum::<f64>() / 20.0;

    let mae = score(&results.disease, disease.ages()).unwrap();
    for (group, m) in groups.names().iter().zip(&mae) {
        assert!(
            *m < 0.5 * baseline,
            "withholding '{group}' gave MAE {m}, baseline {baseline}"
        );
    }
}

#[test]
fn split_evaluation_gives_two_lists_of_seven() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    let train_cohort = synthetic_cohort("control_train", "HC", 10, &columns, 21);
    let test_cohort = synthetic_cohort("control", "HC", 4, &columns, 22);
    let disease = synthetic_cohort("disease", "PD", 5, &columns, 23);

    let evaluator = AblationEvaluator::new(groups, CvSettings::default());
    let results = evaluator
        .evaluate(
            &train_cohort,
            &disease,
            ModelKind::Ridge,
            ScalerKind::MinMax,
            Some(&test_cohort),
        )
        .unwrap();
    assert_eq!(results.disease.len(), 7);
    assert_eq!(results.control.len(), 7);
    for predictions in &results.control {
        assert_eq!(predictions.len(), test_cohort.n_subjects());
    }
}

#[test]
fn every_model_and_scaler_predicts_finite_rounded_ages() {
    let columns = feature_columns(&two_column_groups());
    let control = synthetic_cohort("control", "HC", 10, &columns, 31);

    for model_kind in [ModelKind::Ridge, ModelKind::SupportVector] {
        for scaler_kind in [ScalerKind::MinMax, ScalerKind::Standard] {
            let model = train(
                control.features(),
                control.ages(),
                model_kind,
                scaler_kind,
                &CvSettings::default(),
            )
            .unwrap();
            let predictions = model.predict(control.features()).unwrap();
            assert_eq!(predictions.len(), control.n_subjects());
            for &p in predictions.iter() {
                assert!(p.is_finite(), "{model_kind}/{scaler_kind} produced {p}");
                assert_eq!(p, round_to_decimals(p, PREDICTION_DECIMALS));
            }
        }
    }
}

#[test]
fn repeated_training_yields_identical_predictions() {
    let columns = feature_columns(&two_column_groups());
    let control = synthetic_cohort("control", "HC", 10, &columns, 41);
    let disease = synthetic_cohort("disease", "PD", 5, &columns, 42);

    for model_kind in [ModelKind::Ridge, ModelKind::SupportVector] {
        let fit = || {
            train(
                control.features(),
                control.ages(),
                model_kind,
                ScalerKind::Standard,
                &CvSettings::default(),
            )
            .unwrap()
        };
        let (first, second) = (fit(), fit());
        assert_eq!(first.search, second.search);
        assert_eq!(
            first.predict(disease.features()).unwrap(),
            second.predict(disease.features()).unwrap()
        );
    }
}

#[test]
fn scores_are_zero_only_for_exact_predictions() {
    let truth = Array1::from(vec![31.0, 47.5, 66.25]);
    let exact = truth.clone();
    let off = Array1::from(vec![31.0, 47.5, 66.0]);
    let mae = score(&[exact, off], truth.view()).unwrap();
    assert_eq!(mae[0], 0.0);
    assert!(mae[1] > 0.0);

    let short = Array1::from(vec![31.0, 47.5]);
    assert!(matches!(
        score(&[short], truth.view()),
        Err(AblationError::DimensionMismatch { .. })
    ));
}

#[test]
fn disease_table_missing_a_group_column_aborts_the_evaluation() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    let control = synthetic_cohort("control", "HC", 10, &columns, 51);
    let disease = synthetic_cohort("disease", "PD", 5, &columns[1..], 52);

    let err = AblationEvaluator::new(groups, CvSettings::default())
        .evaluate(&control, &disease, ModelKind::Ridge, ScalerKind::MinMax, None)
        .unwrap_err();
    match err {
        AblationError::MissingColumn { column, table } => {
            assert_eq!(column, columns[0]);
            assert_eq!(table, "disease");
        }
        other => panic!("Expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn configured_run_writes_the_full_report() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    let dir = tempdir().unwrap();

    let control = synthetic_cohort("control", "HC", 12, &columns, 61);
    let train_split = synthetic_cohort("control_train", "HC", 10, &columns, 62);
    let test_split = synthetic_cohort("control", "HC", 4, &columns, 63);
    let disease = synthetic_cohort("disease", "PD", 5, &columns, 64);
    write_csv(&dir.path().join("control.csv"), &control, None);
    write_csv(&dir.path().join("disease.csv"), &disease, None);
    write_csv(&dir.path().join("train.csv"), &train_split, Some("age_group"));
    write_csv(&dir.path().join("test.csv"), &test_split, Some("age_group"));

    let output_dir = dir.path().join("out");
    let config = AnalysisConfig {
        output_dir: output_dir.clone(),
        inputs: InputPaths {
            control: Some(dir.path().join("control.csv")),
            disease: dir.path().join("disease.csv"),
            reference: None,
            train_split: Some(dir.path().join("train.csv")),
            test_split: Some(dir.path().join("test.csv")),
        },
        cv: CvSettings {
            folds: 5,
            repeats: 2,
            seed: 1,
        },
        feature_groups: Some(groups.as_slice().to_vec()),
        ..AnalysisConfig::default()
    };

    let report = run_analysis(&config, &NoopAblationProgress).unwrap();
    assert_eq!(report.groups.len(), 7);
    assert_eq!(report.disease.mae.len(), 7);
    let control_outcome = report.control.as_ref().unwrap();
    assert_eq!(control_outcome.subject_ids.len(), 4);

    // Summary, two prediction tables and 7 plots per cohort.
    assert_eq!(report.artifacts.len(), 1 + 2 + 14);
    assert!(report.artifacts.iter().all(|p| p.exists()));

    let summary = fs::read_to_string(output_dir.join("mae_summary.tsv")).unwrap();
    assert_eq!(summary.lines().count(), 1 + 14);
    assert!(
        output_dir
            .join("ridge_control_without_cortical_thickness.svg")
            .exists()
    );
}

#[test]
fn reference_list_restricts_the_cohorts() {
    let groups = two_column_groups();
    let columns = feature_columns(&groups);
    let dir = tempdir().unwrap();

    let control = synthetic_cohort("control", "HC", 12, &columns, 71);
    let disease = synthetic_cohort("disease", "PD", 6, &columns, 72);
    write_csv(&dir.path().join("control.csv"), &control, None);
    write_csv(&dir.path().join("disease.csv"), &disease, None);

    // Keep every control and all but the last disease subject.
    let mut reference = String::from("subject_id,diagnosis\n");
    for id in control.subject_ids() {
        reference.push_str(&format!("{id},HC\n"));
    }
    for id in &disease.subject_ids()[..5] {
        reference.push_str(&format!("{id},PD\n"));
    }
    fs::write(dir.path().join("reference.csv"), reference).unwrap();

    let mut config = AnalysisConfig {
        output_dir: dir.path().join("out"),
        plots: false,
        inputs: InputPaths {
            control: Some(dir.path().join("control.csv")),
            disease: dir.path().join("disease.csv"),
            reference: Some(dir.path().join("reference.csv")),
            train_split: None,
            test_split: None,
        },
        cv: CvSettings {
            folds: 3,
            repeats: 1,
            seed: 1,
        },
        feature_groups: Some(groups.as_slice().to_vec()),
        ..AnalysisConfig::default()
    };

    let report = run_analysis(&config, &NoopAblationProgress).unwrap();
    assert_eq!(report.disease.subject_ids.len(), 5);
    assert!(report.control.is_none());
    assert_eq!(report.artifacts.len(), 2);

    config.strict_join = true;
    let err = run_analysis(&config, &NoopAblationProgress).unwrap_err();
    assert!(err.to_string().contains("dropped 1 of 6"), "{err}");
}
