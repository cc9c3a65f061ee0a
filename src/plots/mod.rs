//! SVG charts for the exploratory and diagnostic stages

pub mod diagnostic;
pub mod exploratory;
pub mod lowess;

use std::ops::Range;
use std::path::Path;

use crate::pipeline::AnalysisError;

pub use diagnostic::*;
pub use exploratory::*;
pub use lowess::*;

/// Width and height of single charts
pub const CHART_SIZE: (u32, u32) = (800, 600);

/// Result type of the drawing routines before errors are tied to a file
pub(crate) type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Axis range covering `values` with 5% padding on each side
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let span = if max > min { max - min } else { 1.0 };
    (min - span * 0.05)..(max + span * 0.05)
}

pub(crate) fn plot_error(path: &Path, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Plot {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
