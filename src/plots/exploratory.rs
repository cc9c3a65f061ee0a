//! Scatter plots of the response against each predictor, with a LOWESS smooth

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::*;

use super::lowess::{lowess, DEFAULT_SPAN};
use super::{padded_range, plot_error, DrawResult, CHART_SIZE};
use crate::pipeline::{AnalysisError, Result};

/// File name of the multi-panel exploratory figure
pub const PANEL_FILE: &str = "exploratory_panel.svg";

/// Scatter of `response` against `predictor` with a LOWESS smooth, written as SVG.
pub fn scatter_smooth(df: &DataFrame, predictor: &str, response: &str, path: &Path) -> Result<()> {
    let (x, y) = numeric_pairs(df, predictor, response)?;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_scatter(&root, &x, &y, predictor, response).map_err(|e| plot_error(path, e))?;
    root.present().map_err(|e| plot_error(path, e))?;
    Ok(())
}

/// All `(predictor, response)` pairs on one near-square grid of panels.
pub fn exploratory_panel(df: &DataFrame, pairs: &[(String, String)], path: &Path) -> Result<()> {
    if pairs.is_empty() {
        return Err(AnalysisError::config("no variable pairs to plot"));
    }

    let data: Vec<(Vec<f64>, Vec<f64>)> = pairs
        .iter()
        .map(|(predictor, response)| numeric_pairs(df, predictor, response))
        .collect::<Result<_>>()?;

    let (rows, cols) = grid_shape(pairs.len());
    let size = (CHART_SIZE.0 / 2 * cols as u32, CHART_SIZE.1 / 2 * rows as u32);

    let root = SVGBackend::new(path, size).into_drawing_area();
    let panels = root.split_evenly((rows, cols));
    for ((panel, (predictor, response)), (x, y)) in panels.iter().zip(pairs).zip(&data) {
        draw_scatter(panel, x, y, predictor, response).map_err(|e| plot_error(path, e))?;
    }
    root.present().map_err(|e| plot_error(path, e))?;
    Ok(())
}

/// Write one scatter chart per pair plus the combined panel into `dir`.
///
/// Returns the written file paths.
pub fn plot_exploratory(
    df: &DataFrame,
    pairs: &[(String, String)],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(pairs.len() + 1);
    for (predictor, response) in pairs {
        let path = dir.join(format!("scatter_{}_vs_{}.svg", response, predictor));
        scatter_smooth(df, predictor, response, &path)?;
        written.push(path);
    }

    let panel = dir.join(PANEL_FILE);
    exploratory_panel(df, pairs, &panel)?;
    written.push(panel);

    Ok(written)
}

/// Rows and columns of the smallest near-square grid holding `n` panels
pub fn grid_shape(n: usize) -> (usize, usize) {
    let cols = (n as f64).sqrt().ceil().max(1.0) as usize;
    let rows = n.div_ceil(cols).max(1);
    (rows, cols)
}

fn draw_scatter(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    x: &[f64],
    y: &[f64],
    predictor: &str,
    response: &str,
) -> DrawResult {
    area.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(format!("{} vs {}", response, predictor), ("sans-serif", 18))
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(padded_range(x.iter().copied()), padded_range(y.iter().copied()))?;

    chart
        .configure_mesh()
        .x_desc(predictor)
        .y_desc(response)
        .axis_style(BLACK.mix(0.6))
        .light_line_style(BLACK.mix(0.06))
        .draw()?;

    chart.draw_series(
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| Circle::new((xi, yi), 2, BLUE.mix(0.5).filled())),
    )?;

    chart.draw_series(LineSeries::new(lowess(x, y, DEFAULT_SPAN), RED.stroke_width(2)))?;

    Ok(())
}

/// Complete (x, y) observations of two numeric columns
fn numeric_pairs(df: &DataFrame, predictor: &str, response: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let x = numeric_column(df, predictor)?;
    let y = numeric_column(df, response)?;

    Ok(x.into_iter()
        .zip(y)
        .filter_map(|(a, b)| Some((a?, b?)))
        .unzip())
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))?;
    if !col.dtype().is_primitive_numeric() {
        return Err(AnalysisError::NonNumericColumn {
            column: name.to_string(),
            dtype: col.dtype().to_string(),
        });
    }
    let floats = col.cast(&DataType::Float64)?;
    Ok(floats.f64()?.iter().collect())
}
