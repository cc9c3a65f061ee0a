//! Residual and collinearity diagnostics for a fitted model

use faer::Mat;
use indexmap::IndexMap;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::error::{AnalysisError, Result};
use super::ols::ModelFit;

/// Rule-of-thumb VIF above which a term is reported as collinear
pub const DEFAULT_VIF_THRESHOLD: f64 = 5.0;

/// Generalized variance inflation of one model term
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VifEntry {
    pub gvif: f64,
    /// Number of design columns the term spans
    pub df: usize,
    /// GVIF^(1/(2·df)), comparable across terms of different width
    pub adjusted: f64,
}

impl VifEntry {
    /// GVIF^(1/df); equals the classical VIF for single-column terms
    pub fn per_column(&self) -> f64 {
        self.adjusted * self.adjusted
    }
}

/// A row whose Cook's distance exceeds the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluentialObservation {
    /// Row index in the dataset the model was fitted on
    pub row: usize,
    pub cooks_distance: f64,
    pub leverage: f64,
    pub residual: f64,
}

/// Sorted residuals paired with standard normal quantiles.
///
/// Each pair is `(theoretical, sample)`. Plotting positions are
/// `(i - a) / (n + 1 - 2a)` with `a = 3/8` for `n <= 10` and `1/2` otherwise.
pub fn qq_pairs(fit: &ModelFit) -> Vec<(f64, f64)> {
    let mut sample = fit.residuals.clone();
    sample.sort_by(f64::total_cmp);
    let n = sample.len();
    if n == 0 {
        return Vec::new();
    }

    let a = if n <= 10 { 0.375 } else { 0.5 };
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return Vec::new();
    };
    sample
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let position = (i as f64 + 1.0 - a) / (n as f64 + 1.0 - 2.0 * a);
            (normal.inverse_cdf(position), value)
        })
        .collect()
}

/// Internally studentized residuals eᵢ / (σ̂ √(1 − hᵢᵢ))
pub fn standardized_residuals(fit: &ModelFit) -> Vec<f64> {
    fit.residuals
        .iter()
        .zip(&fit.leverage)
        .map(|(e, h)| e / (fit.sigma * (1.0 - h).sqrt()))
        .collect()
}

/// Cook's distance per retained row: eᵢ²/(p σ̂²) · hᵢᵢ/(1 − hᵢᵢ)²
pub fn cooks_distance(fit: &ModelFit) -> Vec<f64> {
    let scale = fit.n_params as f64 * fit.mse();
    fit.residuals
        .iter()
        .zip(&fit.leverage)
        .map(|(e, h)| (e * e / scale) * h / (1.0 - h).powi(2))
        .collect()
}

/// Conventional Cook's distance cutoff, 4/n
pub fn default_cooks_threshold(fit: &ModelFit) -> f64 {
    4.0 / fit.n_obs as f64
}

/// Rows whose Cook's distance exceeds `threshold`, in row order
pub fn influential_observations(fit: &ModelFit, threshold: f64) -> Vec<InfluentialObservation> {
    cooks_distance(fit)
        .into_iter()
        .enumerate()
        .filter(|(_, d)| *d > threshold)
        .map(|(i, d)| InfluentialObservation {
            row: fit.design.retained_rows[i],
            cooks_distance: d,
            leverage: fit.leverage[i],
            residual: fit.residuals[i],
        })
        .collect()
}

/// (fitted, residual) for every retained row
pub fn residuals_vs_fitted(fit: &ModelFit) -> Vec<(f64, f64)> {
    fit.fitted
        .iter()
        .copied()
        .zip(fit.residuals.iter().copied())
        .collect()
}

/// Minimum, quartiles and maximum of the residuals
pub fn residual_quantiles(fit: &ModelFit) -> [f64; 5] {
    let mut sorted = fit.residuals.clone();
    sorted.sort_by(f64::total_cmp);
    [0.0, 0.25, 0.5, 0.75, 1.0].map(|q| quantile(&sorted, q))
}

/// Generalized variance inflation factor per model term.
///
/// Computed on the correlation matrix `R` of the non-intercept design columns:
/// `GVIF = det(R₁₁) · det(R₂₂) / det(R)`, where `R₁₁` covers the term's columns
/// and `R₂₂` the rest.
pub fn variance_inflation(fit: &ModelFit) -> Result<IndexMap<String, VifEntry>> {
    let design = &fit.design;
    if !design.intercept {
        return Err(AnalysisError::config(
            "variance inflation requires a model with an intercept",
        ));
    }
    if design.terms.len() < 2 {
        return Err(AnalysisError::config(format!(
            "variance inflation needs at least two terms, '{}' has {}",
            fit.formula,
            design.terms.len()
        )));
    }

    // Design column j maps to correlation index j - 1
    let k = design.ncols() - 1;
    let corr = column_correlations(&design.x, 1);
    let det_all = determinant(&corr);
    if det_all <= 0.0 {
        return Err(AnalysisError::RankDeficient {
            rank: k.saturating_sub(1),
            columns: k,
            aliased: Vec::new(),
        });
    }

    let mut entries = IndexMap::with_capacity(design.terms.len());
    for term in &design.terms {
        let inside: Vec<usize> = term.columns.iter().map(|&j| j - 1).collect();
        let outside: Vec<usize> = (0..k).filter(|j| !inside.contains(j)).collect();

        let gvif = determinant(&submatrix(&corr, &inside)) * determinant(&submatrix(&corr, &outside))
            / det_all;
        let df = inside.len();
        entries.insert(
            term.term.clone(),
            VifEntry {
                gvif,
                df,
                adjusted: gvif.powf(1.0 / (2.0 * df as f64)),
            },
        );
    }
    Ok(entries)
}

/// Terms whose per-column inflation GVIF^(1/df) exceeds `threshold`
pub fn high_vif_terms(entries: &IndexMap<String, VifEntry>, threshold: f64) -> Vec<String> {
    entries
        .iter()
        .filter(|(_, e)| e.per_column() > threshold)
        .map(|(term, _)| term.clone())
        .collect()
}

/// Pearson correlations among the columns of `x`, starting at column `skip`
fn column_correlations(x: &Mat<f64>, skip: usize) -> Mat<f64> {
    let n = x.nrows();
    let k = x.ncols() - skip;

    let standardized: Vec<Vec<f64>> = (0..k)
        .map(|j| {
            let col: Vec<f64> = (0..n).map(|i| x[(i, j + skip)]).collect();
            let mean = col.iter().sum::<f64>() / n as f64;
            let norm = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>().sqrt();
            col.iter()
                .map(|v| if norm > 0.0 { (v - mean) / norm } else { 0.0 })
                .collect()
        })
        .collect();

    Mat::from_fn(k, k, |a, b| {
        if a == b {
            1.0
        } else {
            standardized[a]
                .iter()
                .zip(&standardized[b])
                .map(|(u, v)| u * v)
                .sum()
        }
    })
}

fn submatrix(m: &Mat<f64>, indices: &[usize]) -> Mat<f64> {
    Mat::from_fn(indices.len(), indices.len(), |a, b| m[(indices[a], indices[b])])
}

/// Determinant of a symmetric positive semi-definite matrix via QR
fn determinant(m: &Mat<f64>) -> f64 {
    if m.nrows() == 0 {
        return 1.0;
    }
    let r = m.qr().compute_thin_r();
    (0..m.nrows()).map(|j| r[(j, j)].abs()).product()
}

/// Linear-interpolation quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
