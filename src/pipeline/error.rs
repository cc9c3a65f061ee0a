//! Error types for the analysis pipeline.
//!
//! Every stage fails fast with one of these variants. Each variant carries
//! enough context (identifier, column, row) to locate the offending input.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while loading, transforming or modelling a dataset.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The remote archive or local file could not be fetched.
    #[error("source unavailable: {location}: {reason}")]
    SourceUnavailable {
        /// URL or path that was requested
        location: String,
        /// Underlying failure description
        reason: String,
    },

    /// The source could not be decoded as a comma-delimited CSV.
    #[error("failed to parse CSV: {0}")]
    Parse(String),

    /// A birthdate did not match the MM/DD/YYYY pattern.
    #[error("malformed date '{value}' in column '{column}' at row {row} (expected MM/DD/YYYY)")]
    MalformedDate {
        column: String,
        /// Zero-based row index
        row: usize,
        value: String,
    },

    /// A birthdate lies after the processing date, which would yield a negative age.
    #[error("birthdate {birthdate} at row {row} is after the processing date {as_of}")]
    FutureBirthdate {
        row: usize,
        birthdate: String,
        as_of: String,
    },

    /// The design matrix is not of full column rank.
    #[error(
        "design matrix is rank deficient (rank {rank} < {columns} columns); aliased: {}",
        aliased.join(", ")
    )]
    RankDeficient {
        rank: usize,
        columns: usize,
        /// Names of the design columns that are linear combinations of earlier ones
        aliased: Vec<String>,
    },

    /// A log transform met a value that is not a positive finite number.
    #[error("cannot log-transform column '{column}': value {value} at row {row} is not a positive finite number")]
    InvalidTransform {
        column: String,
        row: usize,
        value: f64,
    },

    /// Invalid configuration such as a bad retention count or an empty formula.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required column is absent from the dataset.
    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column that must be numeric has another type.
    #[error("column '{column}' must be numeric, found {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// Chart rendering failed.
    #[error("failed to render chart {path}: {reason}")]
    Plot { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
