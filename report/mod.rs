//! # Report Rendering
//!
//! Everything here consumes a finished `AnalysisReport` and only produces output: the
//! console MAE table, TSV summaries and the per-group scatter plots. Nothing in the
//! computational core depends on this module.

pub mod plot;
pub mod tables;

use crate::pipeline::AnalysisReport;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use plot::{plot_path, render_all, render_scatter};
pub use tables::{format_mae_table, print_mae_table, write_mae_summary, write_predictions};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report output '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to write a TSV report: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to render a plot: {0}")]
    Plot(String),
}

/// Creates `output_dir` if needed and writes every report artifact into it. Returns the
/// written paths in the order they were produced.
pub fn write_report(
    report: &AnalysisReport,
    output_dir: &Path,
    plots: bool,
) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(output_dir).map_err(|source| ReportError::Io {
        path: output_dir.display().to_string(),
        source,
    })?;

    let mut written = vec![write_mae_summary(report, output_dir)?];
    written.extend(write_predictions(report, output_dir)?);
    if plots {
        written.extend(render_all(report, output_dir)?);
    }
    log::info!(
        "Wrote {} report files to '{}'",
        written.len(),
        output_dir.display()
    );
    Ok(written)
}
