//! Validated run configuration

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::pipeline::{DataSource, Formula, RESPONSE_COLUMN};

/// Directory name used when no output directory is given
pub const DEFAULT_OUTPUT_DIR: &str = "premia_output";

/// Main-effects model fitted first by default
pub const DEFAULT_MAIN_EFFECTS: &str =
    "current_premium ~ territory + gender + age + ypc + cgr_factor";

/// Interaction model fitted second by default
pub const DEFAULT_INTERACTIONS: &str =
    "current_premium ~ territory + gender + age + ypc + cgr_factor + gender:age + age:ypc + ypc:cgr_factor";

/// Numeric predictors plotted against the response in the exploratory stage
pub const EXPLORATORY_PREDICTORS: [&str; 3] = ["age", "ypc", "cgr_factor"];

/// Everything a run needs, after validation
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub source: DataSource,
    pub as_of: NaiveDate,
    pub category_column: String,
    pub top_categories: usize,
    /// Models fitted in order on the reduced dataset
    pub models: Vec<Formula>,
    /// Refit the last model on the log of the response
    pub log_response: bool,
    /// Columns to mean-center before a final refit
    pub center: Vec<String>,
    /// Cook's distance cutoff; 4/n of the diagnosed model when absent
    pub cooks_threshold: Option<f64>,
    pub vif_threshold: f64,
    pub correlation_threshold: f64,
    pub output_dir: PathBuf,
    pub plots: bool,
    pub bundle: bool,
    pub confirm: bool,
    pub infer_schema_length: usize,
}

impl AnalysisConfig {
    /// The default model sequence: main effects, then with interactions
    pub fn default_models() -> Vec<Formula> {
        [DEFAULT_MAIN_EFFECTS, DEFAULT_INTERACTIONS]
            .iter()
            .filter_map(|text| Formula::parse(text).ok())
            .collect()
    }

    /// Response of the first model, which the exploratory stage is centred on
    pub fn response(&self) -> &str {
        self.models
            .first()
            .map_or(RESPONSE_COLUMN, |f| f.response.as_str())
    }

    /// `(predictor, response)` pairs for the exploratory charts
    pub fn exploratory_pairs(&self) -> Vec<(String, String)> {
        let response = self.response();
        EXPLORATORY_PREDICTORS
            .iter()
            .filter(|p| **p != response)
            .map(|p| (p.to_string(), response.to_string()))
            .collect()
    }
}
