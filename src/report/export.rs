//! JSON export of the analysis and zip packaging of the output files

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::diagnostics::DiagnosticsReport;
use super::model_report::ModelReport;
use super::summary::NestedComparison;
use crate::pipeline::{CategoryCount, CorrelatedPair};

/// File name of the JSON report
pub const REPORT_FILE: &str = "analysis_report.json";

/// File name of the zip bundle
pub const BUNDLE_FILE: &str = "premia_report.zip";

/// Metadata about the analysis run
#[derive(Debug, Serialize)]
pub struct AnalysisMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    /// Premia version
    pub premia_version: String,
    /// Source URL or path
    pub source: String,
    /// Processing date used to derive ages
    pub as_of: String,
    /// Column whose levels were reduced
    pub category_column: String,
    /// Number of levels retained
    pub top_categories: usize,
    pub rows_loaded: usize,
    pub rows_after_reduction: usize,
}

/// Complete analysis export
#[derive(Debug, Serialize)]
pub struct AnalysisExport {
    pub metadata: AnalysisMetadata,
    /// Strongly correlated numeric pairs from the exploratory stage
    pub correlated_pairs: Vec<CorrelatedPair>,
    /// Level counts of the reduced column, in rank order
    pub retained_categories: Vec<CategoryCount>,
    pub models: Vec<ModelReport>,
    pub nested_comparisons: Vec<NestedComparison>,
    pub diagnostics: Option<DiagnosticsReport>,
    /// Charts written alongside the report
    pub charts: Vec<String>,
}

/// Parameters for the metadata block
pub struct ExportParams<'a> {
    pub source: &'a str,
    pub as_of: &'a str,
    pub category_column: &'a str,
    pub top_categories: usize,
    pub rows_loaded: usize,
    pub rows_after_reduction: usize,
}

impl AnalysisMetadata {
    pub fn new(params: &ExportParams) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            premia_version: env!("CARGO_PKG_VERSION").to_string(),
            source: params.source.to_string(),
            as_of: params.as_of.to_string(),
            category_column: params.category_column.to_string(),
            top_categories: params.top_categories,
            rows_loaded: params.rows_loaded,
            rows_after_reduction: params.rows_after_reduction,
        }
    }
}

/// Write the analysis export as pretty JSON
pub fn export_analysis(export: &AnalysisExport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(export).context("Failed to serialize analysis to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write analysis report to {}", output_path.display()))?;

    Ok(())
}

/// Package the given files into a zip archive.
///
/// Entries are stored under their file names. The source files are kept.
pub fn package_reports(files: &[PathBuf], zip_path: &Path) -> Result<()> {
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let zip_file = std::fs::File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;

    let mut zip = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for path in files {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?;
        zip.start_file(filename, options)
            .with_context(|| format!("Failed to add {} to zip", filename))?;
        let mut content = Vec::new();
        std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize zip file")?;

    Ok(())
}
