//! Ordinary least squares fitting
//!
//! Coefficients come from a thin Householder QR of the design matrix,
//! `X = QR`, solving `Rβ = Qᵀy`. A (near) zero diagonal entry of `R` marks a
//! column that is a linear combination of earlier columns; such designs are
//! rejected instead of producing degenerate estimates.

use faer::Mat;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use polars::prelude::DataFrame;

use super::design::{build_design, DesignMatrix, INTERCEPT};
use super::error::{AnalysisError, Result};
use super::formula::Formula;

/// Relative tolerance on |R_jj| below which a design column counts as aliased
pub const RANK_TOLERANCE: f64 = 1e-7;

/// Estimate and inference for one design column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// A fitted linear model. Never mutated after fitting.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub formula: Formula,
    pub design: DesignMatrix,
    pub coefficients: Vec<Coefficient>,
    pub fitted: Vec<f64>,
    /// One residual per retained row, in row order
    pub residuals: Vec<f64>,
    /// Diagonal of the hat matrix
    pub leverage: Vec<f64>,
    pub n_obs: usize,
    pub n_params: usize,
    pub df_residual: usize,
    pub rss: f64,
    /// Residual standard error
    pub sigma: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    /// Rows in the dataset the model was fitted on (before listwise deletion)
    pub source_rows: usize,
}

impl ModelFit {
    /// Look up a coefficient by design column name
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Coefficients other than the intercept
    pub fn slopes(&self) -> impl Iterator<Item = &Coefficient> {
        self.coefficients.iter().filter(|c| c.name != INTERCEPT)
    }

    /// σ̂² = RSS / (n − p)
    pub fn mse(&self) -> f64 {
        self.sigma * self.sigma
    }

    /// Rows omitted because of missing values
    pub fn omitted_rows(&self) -> usize {
        self.design.omitted_rows(self.source_rows)
    }
}

/// Fit `formula` to `df` by ordinary least squares.
pub fn fit(df: &DataFrame, formula: &Formula) -> Result<ModelFit> {
    let design = build_design(df, formula)?;
    fit_design(design, formula.clone(), df.height())
}

/// Parse `formula` and fit it to `df`.
pub fn fit_formula(df: &DataFrame, formula: &str) -> Result<ModelFit> {
    let formula = Formula::parse(formula)?;
    fit(df, &formula)
}

/// Fit an already encoded design.
pub fn fit_design(design: DesignMatrix, formula: Formula, source_rows: usize) -> Result<ModelFit> {
    let n = design.nrows();
    let p = design.ncols();

    if p == 0 {
        return Err(AnalysisError::config(format!(
            "formula '{}' produces an empty design",
            formula
        )));
    }
    if n < p {
        return Err(AnalysisError::RankDeficient {
            rank: n,
            columns: p,
            aliased: design.column_names[n..].to_vec(),
        });
    }

    let qr = design.x.qr();
    let r = qr.compute_thin_r();
    let q = qr.compute_thin_q();

    let max_diag = (0..p).map(|j| r[(j, j)].abs()).fold(0.0, f64::max);
    let aliased: Vec<String> = (0..p)
        .filter(|&j| r[(j, j)].abs() <= RANK_TOLERANCE * max_diag || max_diag == 0.0)
        .map(|j| design.column_names[j].clone())
        .collect();
    if !aliased.is_empty() {
        return Err(AnalysisError::RankDeficient {
            rank: p - aliased.len(),
            columns: p,
            aliased,
        });
    }

    // β = R⁻¹ Qᵀ y
    let y = &design.y;
    let qty: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| q[(i, j)] * y[i]).sum())
        .collect();
    let beta = back_substitute(&r, &qty);

    let fitted: Vec<f64> = (0..n)
        .map(|i| (0..p).map(|j| design.x[(i, j)] * beta[j]).sum())
        .collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
    let leverage: Vec<f64> = (0..n)
        .map(|i| (0..p).map(|j| q[(i, j)] * q[(i, j)]).sum::<f64>().clamp(0.0, 1.0))
        .collect();

    // (XᵀX)⁻¹ = R⁻¹ R⁻ᵀ
    let r_inv = upper_triangular_inverse(&r);
    let xtx_inverse = Mat::<f64>::from_fn(p, p, |a, b| {
        (a.max(b)..p).map(|k| r_inv[(a, k)] * r_inv[(b, k)]).sum::<f64>()
    });

    let df_residual = n - p;
    let rss: f64 = residuals.iter().map(|e| e * e).sum();
    let mse = if df_residual > 0 {
        rss / df_residual as f64
    } else {
        f64::NAN
    };
    let sigma = mse.sqrt();

    let t_dist = if df_residual > 0 {
        StudentsT::new(0.0, 1.0, df_residual as f64).ok()
    } else {
        None
    };

    let coefficients: Vec<Coefficient> = (0..p)
        .map(|j| {
            let std_error = (mse * xtx_inverse[(j, j)]).sqrt();
            let t_value = beta[j] / std_error;
            let p_value = match &t_dist {
                Some(dist) if t_value.is_finite() => 2.0 * dist.sf(t_value.abs()),
                _ => f64::NAN,
            };
            Coefficient {
                name: design.column_names[j].clone(),
                estimate: beta[j],
                std_error,
                t_value,
                p_value,
            }
        })
        .collect();

    let intercept_df = usize::from(design.intercept);
    let tss: f64 = if design.intercept {
        let mean = y.iter().sum::<f64>() / n as f64;
        y.iter().map(|v| (v - mean).powi(2)).sum()
    } else {
        y.iter().map(|v| v * v).sum()
    };

    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
    let adj_r_squared = if df_residual > 0 {
        1.0 - (1.0 - r_squared) * (n - intercept_df) as f64 / df_residual as f64
    } else {
        f64::NAN
    };

    let df_model = p - intercept_df;
    let (f_statistic, f_p_value) = if df_model > 0 && df_residual > 0 && mse > 0.0 {
        let f = ((tss - rss) / df_model as f64) / mse;
        let p_value = FisherSnedecor::new(df_model as f64, df_residual as f64)
            .map(|d| d.sf(f))
            .unwrap_or(f64::NAN);
        (f, p_value)
    } else {
        (f64::NAN, f64::NAN)
    };

    let (log_likelihood, aic, bic) = information_criteria(rss, n, p);

    Ok(ModelFit {
        formula,
        design,
        coefficients,
        fitted,
        residuals,
        leverage,
        n_obs: n,
        n_params: p,
        df_residual,
        rss,
        sigma,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
        source_rows,
    })
}

/// Gaussian log-likelihood, AIC and BIC for a linear model with `p`
/// coefficients. The error variance counts as one more parameter.
pub fn information_criteria(rss: f64, n: usize, p: usize) -> (f64, f64, f64) {
    let n_f = n as f64;
    let log_likelihood =
        -0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + (rss / n_f).ln() + 1.0);
    let k = (p + 1) as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k;
    let bic = -2.0 * log_likelihood + n_f.ln() * k;
    (log_likelihood, aic, bic)
}

/// F test of a model against a nested, smaller one fitted on the same rows
#[derive(Debug, Clone, Serialize)]
pub struct NestedFTest {
    pub f_statistic: f64,
    pub df_numerator: usize,
    pub df_denominator: usize,
    pub p_value: f64,
}

/// Compare `reduced` against `full`, where `full` adds terms to `reduced`.
pub fn nested_f_test(reduced: &ModelFit, full: &ModelFit) -> Result<NestedFTest> {
    if reduced.design.retained_rows != full.design.retained_rows {
        return Err(AnalysisError::config(
            "nested models must be fitted on the same rows",
        ));
    }
    if full.n_params <= reduced.n_params {
        return Err(AnalysisError::config(format!(
            "'{}' has no more parameters than '{}'",
            full.formula, reduced.formula
        )));
    }
    if full.df_residual == 0 {
        return Err(AnalysisError::config(format!(
            "'{}' leaves no residual degrees of freedom",
            full.formula
        )));
    }

    let df_numerator = full.n_params - reduced.n_params;
    let df_denominator = full.df_residual;
    let f_statistic =
        ((reduced.rss - full.rss) / df_numerator as f64) / (full.rss / df_denominator as f64);
    let p_value = FisherSnedecor::new(df_numerator as f64, df_denominator as f64)
        .map(|d| d.sf(f_statistic))
        .unwrap_or(f64::NAN);

    Ok(NestedFTest {
        f_statistic,
        df_numerator,
        df_denominator,
        p_value,
    })
}

/// Solve `R x = b` for upper triangular `R`
fn back_substitute(r: &Mat<f64>, b: &[f64]) -> Vec<f64> {
    let p = b.len();
    let mut x = vec![0.0; p];
    for i in (0..p).rev() {
        let mut sum = b[i];
        for j in (i + 1)..p {
            sum -= r[(i, j)] * x[j];
        }
        x[i] = sum / r[(i, i)];
    }
    x
}

/// Inverse of an upper triangular matrix, column by column
fn upper_triangular_inverse(r: &Mat<f64>) -> Mat<f64> {
    let p = r.nrows();
    let mut inv = Mat::<f64>::zeros(p, p);
    for col in 0..p {
        let unit: Vec<f64> = (0..p).map(|i| if i == col { 1.0 } else { 0.0 }).collect();
        let solution = back_substitute(r, &unit);
        for (row, value) in solution.into_iter().enumerate() {
            inv[(row, col)] = value;
        }
    }
    inv
}
