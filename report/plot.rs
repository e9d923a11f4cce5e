//! Predicted-vs-true age scatter plots, one SVG per withheld group and cohort.

use super::ReportError;
use crate::metrics::{linear_fit, pearson};
use crate::pipeline::AnalysisReport;
use ndarray::ArrayView1;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const PLOT_SIZE: (u32, u32) = (800, 640);
/// Years of headroom around the data on both axes.
const AXIS_PADDING: f64 = 5.0;

/// `{dir}/{model}_{cohort}_without_{group}.svg`
pub fn plot_path(dir: &Path, model: &str, cohort: &str, group: &str) -> PathBuf {
    dir.join(format!("{model}_{cohort}_without_{group}.svg"))
}

fn plot_error<E: std::fmt::Display>(error: E) -> ReportError {
    ReportError::Plot(error.to_string())
}

fn axis_range(truth: ArrayView1<f64>, predicted: ArrayView1<f64>) -> (f64, f64) {
    let (lo, hi) = truth
        .iter()
        .chain(predicted.iter())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_finite() && hi.is_finite() {
        (lo - AXIS_PADDING, hi + AXIS_PADDING)
    } else {
        (0.0, 100.0)
    }
}

/// Draws predicted (y) against true age (x) with the least-squares line, its equation in
/// the caption and the Pearson r in the plot area.
pub fn render_scatter(
    path: &Path,
    title: &str,
    truth: ArrayView1<f64>,
    predicted: ArrayView1<f64>,
) -> Result<(), ReportError> {
    let (lo, hi) = axis_range(truth, predicted);
    let fit = linear_fit(truth, predicted);
    let caption = match fit {
        Some((slope, intercept)) => format!("{title}: y = {slope:.3}x + {intercept:.3}"),
        None => title.to_string(),
    };

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, lo..hi)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("True age")
        .y_desc("Predicted age")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(
            truth
                .iter()
                .zip(predicted.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.mix(0.6).filled())),
        )
        .map_err(plot_error)?;

    if let Some((slope, intercept)) = fit {
        chart
            .draw_series(LineSeries::new(
                [lo, hi].into_iter().map(|x| (x, slope * x + intercept)),
                &RED,
            ))
            .map_err(plot_error)?;
    }

    let annotation = match pearson(truth, predicted) {
        Some(r) => format!("r = {r:.3}"),
        None => "r = n/a".to_string(),
    };
    root.draw(&Text::new(
        annotation,
        (90, 60),
        ("sans-serif", 16).into_font(),
    ))
    .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Renders every (cohort, group) plot of `report` into `dir`.
pub fn render_all(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();
    for cohort in report.cohorts() {
        for (group, predicted) in report.groups.iter().zip(&cohort.predictions) {
            let path = plot_path(dir, report.model.as_str(), &cohort.label, &group.name);
            let title = format!("{} without {}", cohort.label, group.display_label());
            render_scatter(&path, &title, cohort.ages.view(), predicted.view())?;
            log::debug!("Wrote plot '{}'", path.display());
            written.push(path);
        }
    }
    Ok(written)
}
