//! Residual diagnostic charts for a fitted model

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use super::lowess::{lowess, DEFAULT_SPAN};
use super::{padded_range, plot_error, DrawResult, CHART_SIZE};
use crate::pipeline::diagnostics::{cooks_distance, qq_pairs, residuals_vs_fitted};
use crate::pipeline::{ModelFit, Result};

/// Normal QQ plot of the residuals with a reference line through the quartiles.
pub fn qq_plot(fit: &ModelFit, path: &Path) -> Result<()> {
    let pairs = qq_pairs(fit);
    let title = format!("Normal Q-Q: {}", fit.formula);
    render(path, |root| {
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&title, ("sans-serif", 18))
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(
                padded_range(pairs.iter().map(|p| p.0)),
                padded_range(pairs.iter().map(|p| p.1)),
            )?;
        chart
            .configure_mesh()
            .x_desc("Theoretical quantiles")
            .y_desc("Residuals")
            .light_line_style(BLACK.mix(0.06))
            .draw()?;

        chart.draw_series(
            pairs
                .iter()
                .map(|&(t, s)| Circle::new((t, s), 2, BLUE.mix(0.6).filled())),
        )?;

        if let Some(line) = quartile_line(&pairs) {
            chart.draw_series(LineSeries::new(line, RED.stroke_width(1)))?;
        }
        Ok(())
    })
}

/// Residuals against fitted values with a zero line and a LOWESS smooth.
pub fn residuals_vs_fitted_plot(fit: &ModelFit, path: &Path) -> Result<()> {
    let points = residuals_vs_fitted(fit);
    let title = format!("Residuals vs Fitted: {}", fit.formula);
    render(path, |root| {
        root.fill(&WHITE)?;
        let x_range = padded_range(points.iter().map(|p| p.0));
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&title, ("sans-serif", 18))
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(x_range.clone(), padded_range(points.iter().map(|p| p.1)))?;
        chart
            .configure_mesh()
            .x_desc("Fitted values")
            .y_desc("Residuals")
            .light_line_style(BLACK.mix(0.06))
            .draw()?;

        chart.draw_series(LineSeries::new(
            vec![(x_range.start, 0.0), (x_range.end, 0.0)],
            BLACK.mix(0.4).stroke_width(1),
        ))?;
        chart.draw_series(
            points
                .iter()
                .map(|&(f, r)| Circle::new((f, r), 2, BLUE.mix(0.6).filled())),
        )?;

        let (fitted, residuals): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
        chart.draw_series(LineSeries::new(
            lowess(&fitted, &residuals, DEFAULT_SPAN),
            RED.stroke_width(2),
        ))?;
        Ok(())
    })
}

/// Cook's distance per observation as vertical bars, with the cutoff as a horizontal line.
pub fn cooks_distance_plot(fit: &ModelFit, threshold: f64, path: &Path) -> Result<()> {
    let distances = cooks_distance(fit);
    let title = format!("Cook's distance: {}", fit.formula);
    let n = distances.len() as f64;
    let y_max = distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(threshold, f64::max)
        * 1.1;

    render(path, |root| {
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&title, ("sans-serif", 18))
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(0.0..n + 1.0, 0.0..y_max.max(f64::MIN_POSITIVE))?;
        chart
            .configure_mesh()
            .x_desc("Observation")
            .y_desc("Cook's distance")
            .light_line_style(BLACK.mix(0.06))
            .draw()?;

        for (i, &d) in distances.iter().enumerate() {
            let x = (i + 1) as f64;
            let color = if d > threshold { RED } else { BLUE };
            chart.draw_series(LineSeries::new(vec![(x, 0.0), (x, d)], color.stroke_width(1)))?;
        }

        chart.draw_series(LineSeries::new(
            vec![(0.0, threshold), (n + 1.0, threshold)],
            BLACK.mix(0.6).stroke_width(1),
        ))?;
        Ok(())
    })
}

/// Write the QQ, residuals-vs-fitted and Cook's distance charts into `dir`.
///
/// File names start with `prefix`. Returns the written paths.
pub fn plot_diagnostics(
    fit: &ModelFit,
    cooks_threshold: f64,
    dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let qq = dir.join(format!("{}_qq.svg", prefix));
    qq_plot(fit, &qq)?;

    let rvf = dir.join(format!("{}_residuals_vs_fitted.svg", prefix));
    residuals_vs_fitted_plot(fit, &rvf)?;

    let cooks = dir.join(format!("{}_cooks_distance.svg", prefix));
    cooks_distance_plot(fit, cooks_threshold, &cooks)?;

    Ok(vec![qq, rvf, cooks])
}

/// Line through the first and third quartile points of a QQ plot, spanning the x range
fn quartile_line(pairs: &[(f64, f64)]) -> Option<Vec<(f64, f64)>> {
    if pairs.len() < 4 {
        return None;
    }
    let q1 = pairs[(pairs.len() - 1) / 4];
    let q3 = pairs[3 * (pairs.len() - 1) / 4];
    if q3.0 <= q1.0 {
        return None;
    }
    let slope = (q3.1 - q1.1) / (q3.0 - q1.0);
    let intercept = q1.1 - slope * q1.0;
    let (first, last) = (pairs[0].0, pairs[pairs.len() - 1].0);
    Some(vec![
        (first, intercept + slope * first),
        (last, intercept + slope * last),
    ])
}

fn render<F>(path: &Path, draw: F) -> Result<()>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, plotters::coord::Shift>) -> DrawResult,
{
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw(&root).map_err(|e| plot_error(path, e))?;
    root.present().map_err(|e| plot_error(path, e))?;
    Ok(())
}
