//! Command-line argument definitions using clap

use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;

use super::config::{AnalysisConfig, DEFAULT_OUTPUT_DIR};
use crate::pipeline::{AnalysisError, DataSource, Formula, Result, DEFAULT_VIF_THRESHOLD};

/// Premia - Explore and model insurance premiums with ordinary least squares
#[derive(Parser, Debug)]
#[command(name = "premia")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Dataset location: an http(s) URL or a local path (CSV, or a zip holding one CSV)
    #[arg(short, long)]
    pub source: String,

    /// Processing date used to derive ages from birthdates (YYYY-MM-DD).
    /// Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub as_of: Option<NaiveDate>,

    /// Categorical column whose rare levels are filtered out before modelling
    #[arg(long, default_value = "territory")]
    pub category_column: String,

    /// Number of most frequent levels of the category column to keep
    #[arg(long, default_value = "10", value_parser = validate_top_categories)]
    pub top_categories: usize,

    /// Model formula, e.g. "current_premium ~ territory + ypc + age:ypc".
    /// Repeat to fit several models in order. Defaults to a main-effects model
    /// followed by the same model with interactions.
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Refit the last model on the natural log of the response
    #[arg(long, default_value = "false")]
    pub log_response: bool,

    /// Columns to mean-center before refitting the last model (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub center: Vec<String>,

    /// Cook's distance above which an observation is reported as influential.
    /// Defaults to 4/n.
    #[arg(long, value_parser = validate_positive)]
    pub cooks_threshold: Option<f64>,

    /// Per-column variance inflation above which a term is reported as collinear
    #[arg(long, default_value_t = DEFAULT_VIF_THRESHOLD, value_parser = validate_positive)]
    pub vif_threshold: f64,

    /// Absolute correlation above which numeric pairs are reported
    #[arg(long, default_value = "0.5", value_parser = validate_unit_interval)]
    pub correlation_threshold: f64,

    /// Output directory for the report and charts.
    /// Defaults to 'premia_output' next to a local source, or in the working directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip writing SVG charts
    #[arg(long, default_value = "false")]
    pub no_plots: bool,

    /// Package the report and charts into a zip archive
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Output directory, derived from the source when not given
    pub fn output_path(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match DataSource::parse(&self.source).parent_dir() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(DEFAULT_OUTPUT_DIR),
            _ => PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }

    /// Validate the arguments and build the run configuration
    pub fn into_config(self) -> Result<AnalysisConfig> {
        if self.source.trim().is_empty() {
            return Err(AnalysisError::config("source must not be empty"));
        }

        let models = if self.models.is_empty() {
            AnalysisConfig::default_models()
        } else {
            self.models
                .iter()
                .map(|text| Formula::parse(text))
                .collect::<Result<Vec<_>>>()?
        };

        let center: Vec<String> = self
            .center
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if let Some(last) = models.last() {
            if center.contains(&last.response) {
                return Err(AnalysisError::config(format!(
                    "cannot center the response '{}'",
                    last.response
                )));
            }
        }

        let output_dir = self.output_path();
        Ok(AnalysisConfig {
            source: DataSource::parse(&self.source),
            as_of: self.as_of.unwrap_or_else(|| Local::now().date_naive()),
            category_column: self.category_column,
            top_categories: self.top_categories,
            models,
            log_response: self.log_response,
            center,
            cooks_threshold: self.cooks_threshold,
            vif_threshold: self.vif_threshold,
            correlation_threshold: self.correlation_threshold,
            output_dir,
            plots: !self.no_plots,
            bundle: self.bundle,
            confirm: !self.no_confirm,
            infer_schema_length: self.infer_schema_length,
        })
    }
}

/// Parser for --as-of
fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a date in YYYY-MM-DD format", s))
}

/// Validator for top_categories parameter
fn validate_top_categories(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("top_categories must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for thresholds that must be strictly positive
fn validate_positive(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("threshold must be positive, got {}", value))
    }
}

/// Validator for correlation_threshold parameter
fn validate_unit_interval(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "correlation_threshold must be between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
