//! Dataset loader for remote or local CSV files, optionally zipped

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use polars::prelude::*;

use super::error::{AnalysisError, Result};

/// Timeout applied to the whole remote request
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Local-file header signature that starts every zip archive
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Where the raw dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Remote archive fetched over HTTP(S)
    Url(String),
    /// File on the local filesystem
    Path(PathBuf),
}

impl DataSource {
    /// Interpret a static identifier: `http://` and `https://` are remote, anything else a path.
    pub fn parse(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let lower = trimmed.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::Path(PathBuf::from(trimmed))
        }
    }

    /// Identifier as shown to the user and stored in reports
    pub fn location(&self) -> String {
        match self {
            DataSource::Url(url) => url.clone(),
            DataSource::Path(path) => path.display().to_string(),
        }
    }

    /// Directory next to a local source, if any
    pub fn parent_dir(&self) -> Option<&Path> {
        match self {
            DataSource::Url(_) => None,
            DataSource::Path(path) => path.parent(),
        }
    }
}

/// Fetch the raw bytes of a source.
///
/// Fails with `SourceUnavailable` if the request or read fails.
pub fn fetch_source(source: &DataSource) -> Result<Vec<u8>> {
    let unavailable = |reason: String| AnalysisError::SourceUnavailable {
        location: source.location(),
        reason,
    };

    match source {
        DataSource::Url(url) => {
            let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
            let response = agent.get(url).call().map_err(|e| unavailable(e.to_string()))?;

            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| unavailable(e.to_string()))?;
            Ok(bytes)
        }
        DataSource::Path(path) => std::fs::read(path).map_err(|e| unavailable(e.to_string())),
    }
}

/// Return the CSV payload contained in `bytes`.
///
/// Zip archives must contain exactly one `.csv` member; anything else is
/// returned unchanged and treated as CSV text.
pub fn extract_csv(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Ok(bytes);
    }

    let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AnalysisError::Parse(format!("invalid zip archive: {}", e)))?;

    let mut csv_members: Vec<usize> = Vec::new();
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| AnalysisError::Parse(format!("unreadable zip entry {}: {}", index, e)))?;
        let name = entry.name().to_string();
        if entry.is_dir() || name.starts_with("__MACOSX") {
            continue;
        }
        if name.to_lowercase().ends_with(".csv") {
            csv_members.push(index);
        }
    }

    let index = match csv_members.as_slice() {
        [single] => *single,
        [] => return Err(AnalysisError::Parse("archive contains no CSV file".to_string())),
        many => {
            return Err(AnalysisError::Parse(format!(
                "archive contains {} CSV files, expected exactly one",
                many.len()
            )))
        }
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| AnalysisError::Parse(format!("unreadable zip entry {}: {}", index, e)))?;
    let mut csv = Vec::new();
    entry.read_to_end(&mut csv)?;
    Ok(csv)
}

/// Parse comma-delimited CSV bytes with a header row.
///
/// Column types are inferred from the first `infer_schema_length` rows
/// (0 means a full scan). Dates are left as strings.
pub fn parse_csv(bytes: Vec<u8>, infer_schema_length: usize) -> Result<DataFrame> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(AnalysisError::Parse("source is empty".to_string()));
    }

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .with_parse_options(CsvParseOptions::default().with_separator(b','))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| AnalysisError::Parse(e.to_string()))
}

/// Load a dataset: fetch, unzip if needed, parse.
pub fn load_dataset(source: &DataSource, infer_schema_length: usize) -> Result<DataFrame> {
    let bytes = fetch_source(source)?;
    let csv = extract_csv(bytes)?;
    parse_csv(csv, infer_schema_length)
}

/// Column names of a DataFrame in order
pub fn get_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Estimated in-memory size in megabytes
pub fn estimated_memory_mb(df: &DataFrame) -> f64 {
    df.estimated_size() as f64 / (1024.0 * 1024.0)
}
