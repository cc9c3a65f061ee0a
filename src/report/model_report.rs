//! Serializable model reports and their terminal rendering

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use indexmap::IndexMap;
use serde::Serialize;

use crate::pipeline::diagnostics::residual_quantiles;
use crate::pipeline::{ModelFit, INTERCEPT};

/// Inference for one coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientReport {
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Serializable summary of one fitted model
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    /// Short label such as "Model 2"
    pub label: String,
    pub formula: String,
    pub response: String,
    /// Design column name -> inference, in design order
    pub coefficients: IndexMap<String, CoefficientReport>,
    pub n_obs: usize,
    pub omitted_rows: usize,
    pub n_params: usize,
    pub df_residual: usize,
    pub residual_std_error: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    /// Min, Q1, median, Q3, max of the residuals
    pub residual_quantiles: [f64; 5],
}

impl ModelReport {
    pub fn from_fit(label: &str, fit: &ModelFit) -> Self {
        let coefficients = fit
            .coefficients
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    CoefficientReport {
                        estimate: c.estimate,
                        std_error: c.std_error,
                        t_value: c.t_value,
                        p_value: c.p_value,
                    },
                )
            })
            .collect();

        Self {
            label: label.to_string(),
            formula: fit.formula.to_string(),
            response: fit.formula.response.clone(),
            coefficients,
            n_obs: fit.n_obs,
            omitted_rows: fit.omitted_rows(),
            n_params: fit.n_params,
            df_residual: fit.df_residual,
            residual_std_error: fit.sigma,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            f_statistic: fit.f_statistic,
            f_p_value: fit.f_p_value,
            log_likelihood: fit.log_likelihood,
            aic: fit.aic,
            bic: fit.bic,
            residual_quantiles: residual_quantiles(fit),
        }
    }

    /// Print the coefficient table and fit statistics
    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style(self.label.to_uppercase()).cyan().bold(),
            style(&self.formula).white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());

        let q = &self.residual_quantiles;
        println!(
            "      {} min {}  1Q {}  median {}  3Q {}  max {}",
            style("Residuals:").dim(),
            format_number(q[0]),
            format_number(q[1]),
            format_number(q[2]),
            format_number(q[3]),
            format_number(q[4]),
        );
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Term").add_attribute(Attribute::Bold),
            Cell::new("Estimate").add_attribute(Attribute::Bold),
            Cell::new("Std. Error").add_attribute(Attribute::Bold),
            Cell::new("t value").add_attribute(Attribute::Bold),
            Cell::new("Pr(>|t|)").add_attribute(Attribute::Bold),
            Cell::new(""),
        ]);

        for (name, c) in &self.coefficients {
            let stars = significance_stars(c.p_value);
            let color = if c.p_value < 0.05 {
                Color::Green
            } else {
                Color::White
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format_number(c.estimate)).set_alignment(CellAlignment::Right),
                Cell::new(format_number(c.std_error)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.3}", c.t_value)).set_alignment(CellAlignment::Right),
                Cell::new(format_p_value(c.p_value))
                    .set_alignment(CellAlignment::Right)
                    .fg(color),
                Cell::new(stars).fg(color),
            ]);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        println!(
            "      {}",
            style("Signif. codes: 0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1 ' ' 1").dim()
        );
        println!();
        println!(
            "      Residual standard error: {} on {} degrees of freedom",
            format_number(self.residual_std_error),
            self.df_residual
        );
        if self.omitted_rows > 0 {
            println!(
                "      {}",
                style(format!(
                    "({} observation(s) deleted due to missingness)",
                    self.omitted_rows
                ))
                .dim()
            );
        }
        println!(
            "      Multiple R-squared: {:.4},  Adjusted R-squared: {:.4}",
            self.r_squared, self.adj_r_squared
        );
        println!(
            "      F-statistic: {:.2} on {} and {} DF,  p-value: {}",
            self.f_statistic,
            self.n_params - usize::from(self.coefficients.contains_key(INTERCEPT)),
            self.df_residual,
            format_p_value(self.f_p_value)
        );
        println!(
            "      AIC: {:.2}  BIC: {:.2}  log-likelihood: {:.2}",
            self.aic, self.bic, self.log_likelihood
        );
    }
}

/// Conventional significance codes for a p value
pub fn significance_stars(p: f64) -> &'static str {
    if p.is_nan() {
        ""
    } else if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "."
    } else {
        ""
    }
}

/// p value with a floor at machine precision
pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "NA".to_string()
    } else if p < 2e-16 {
        "< 2e-16".to_string()
    } else if p < 1e-4 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

/// Four significant digits, switching to scientific notation for extremes
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return if v.is_nan() { "NA".to_string() } else { v.to_string() };
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-3..1e6).contains(&abs) {
        format!("{:.3e}", v)
    } else {
        let digits = if abs >= 1.0 {
            (3 - abs.log10().floor() as i32).max(0) as usize
        } else {
            4
        };
        format!("{:.*}", digits, v)
    }
}
