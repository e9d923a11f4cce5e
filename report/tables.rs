use super::ReportError;
use crate::pipeline::AnalysisReport;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// The per-group MAE listing, one block per evaluated cohort, in registry order.
pub fn format_mae_table(report: &AnalysisReport) -> String {
    let mut out = String::new();
    for cohort in report.cohorts() {
        let _ = writeln!(
            out,
            "Mean absolute error on '{}' ({} / {}), by withheld feature group:",
            cohort.label, report.model, report.scaler
        );
        for (group, mae) in report.groups.iter().zip(&cohort.mae) {
            let _ = writeln!(out, "{}: {mae:.3}", group.display_label());
        }
    }
    out
}

pub fn print_mae_table(report: &AnalysisReport) {
    print!("{}", format_mae_table(report));
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, ReportError> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?)
}

/// `mae_summary.tsv`: columns `group`, `cohort`, `mae`.
pub fn write_mae_summary(report: &AnalysisReport, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join("mae_summary.tsv");
    let mut writer = tsv_writer(&path)?;
    writer.write_record(["group", "cohort", "mae"])?;
    for cohort in report.cohorts() {
        for (group, mae) in report.groups.iter().zip(&cohort.mae) {
            writer.write_record([
                group.name.as_str(),
                cohort.label.as_str(),
                format!("{mae:.3}").as_str(),
            ])?;
        }
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

/// `predictions_{model}_{cohort}.tsv`: subject id, true age, then one prediction column
/// per withheld group.
pub fn write_predictions(
    report: &AnalysisReport,
    dir: &Path,
) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();
    for cohort in report.cohorts() {
        let path = dir.join(format!(
            "predictions_{}_{}.tsv",
            report.model.as_str(),
            cohort.label
        ));
        let mut writer = tsv_writer(&path)?;

        let mut header = vec!["subject_id".to_string(), "age".to_string()];
        header.extend(
            report
                .groups
                .iter()
                .map(|g| format!("without_{}", g.name)),
        );
        writer.write_record(&header)?;

        for (row, subject) in cohort.subject_ids.iter().enumerate() {
            let mut record = vec![subject.clone(), cohort.ages[row].to_string()];
            record.extend(
                cohort
                    .predictions
                    .iter()
                    .map(|predictions| format!("{:.3}", predictions[row])),
            );
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::sample_report;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn table_lists_every_group_with_three_decimals() {
        let report = sample_report();
        let table = format_mae_table(&report);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 1 + report.groups.len());
        assert!(lines[0].contains("'disease'"));
        assert_eq!(lines[1], "Group A: 1.500");
        assert_eq!(lines[2], "b: 0.250");
    }

    #[test]
    fn summary_and_predictions_are_tab_separated() {
        let report = sample_report();
        let dir = tempdir().unwrap();

        let summary = fs::read_to_string(write_mae_summary(&report, dir.path()).unwrap()).unwrap();
        assert_eq!(
            summary.lines().collect::<Vec<_>>(),
            vec!["group\tcohort\tmae", "a\tdisease\t1.500", "b\tdisease\t0.250"]
        );

        let paths = write_predictions(&report, dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("predictions_ridge_disease.tsv")]);
        let text = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "subject_id\tage\twithout_a\twithout_b");
        assert_eq!(lines[1], "p1\t60\t61.500\t60.250");
        assert_eq!(lines.len(), 3);
    }
}
