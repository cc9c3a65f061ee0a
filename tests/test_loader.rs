//! Tests for the dataset loader

use premia::pipeline::{get_column_names, load_dataset, AnalysisError, DataSource};
use std::path::PathBuf;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_source_kind_from_identifier() {
    assert_eq!(
        DataSource::parse("https://example.org/data.zip"),
        DataSource::Url("https://example.org/data.zip".to_string())
    );
    assert_eq!(
        DataSource::parse("HTTP://example.org/data.zip"),
        DataSource::Url("HTTP://example.org/data.zip".to_string())
    );
    assert_eq!(
        DataSource::parse(" data/policies.csv "),
        DataSource::Path(PathBuf::from("data/policies.csv"))
    );
}

#[test]
fn test_load_plain_csv() {
    let (_temp_dir, path) = create_policy_csv(25, 1);
    let df = load_dataset(&DataSource::Path(path), 100).unwrap();

    assert_eq!(df.height(), 25);
    assert_eq!(df.width(), 12);
    assert_eq!(get_column_names(&df)[0], "territory");
    assert_has_columns(&df, &["birthdate", "current_premium", "cgr_factor"]);
}

#[test]
fn test_load_zip_with_single_csv() {
    let temp_dir = TempDir::new().unwrap();
    let csv = policy_csv(10, 2);
    let path = write_zip(
        temp_dir.path(),
        "policies.zip",
        &[("__MACOSX/._policies.csv", "junk"), ("policies.csv", &csv)],
    );

    let df = load_dataset(&DataSource::Path(path), 100).unwrap();
    assert_eq!(df.height(), 10);
    assert_has_columns(&df, &["territory", "gender", "birthdate"]);
}

#[test]
fn test_zip_without_csv_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_zip(temp_dir.path(), "empty.zip", &[("readme.txt", "nothing here")]);

    let result = load_dataset(&DataSource::Path(path), 100);
    assert!(matches!(result, Err(AnalysisError::Parse(_))));
}

#[test]
fn test_zip_with_two_csvs_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_zip(
        temp_dir.path(),
        "two.zip",
        &[("a.csv", "x,y\n1,2\n"), ("b.csv", "x,y\n3,4\n")],
    );

    let result = load_dataset(&DataSource::Path(path), 100);
    assert!(matches!(result, Err(AnalysisError::Parse(_))));
}

#[test]
fn test_missing_file_is_source_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.csv");

    match load_dataset(&DataSource::Path(path.clone()), 100) {
        Err(AnalysisError::SourceUnavailable { location, .. }) => {
            assert_eq!(location, path.display().to_string());
        }
        other => panic!("expected SourceUnavailable, got {:?}", other.map(|df| df.shape())),
    }
}

#[test]
fn test_unreachable_url_is_source_unavailable() {
    // Nothing listens on the discard port locally, so the connection is refused
    let url = "http://127.0.0.1:9/policies.zip";
    let source = DataSource::parse(url);

    let err = load_dataset(&source, 100).unwrap_err();
    assert!(
        matches!(&err, AnalysisError::SourceUnavailable { location, .. } if location == url),
        "expected SourceUnavailable, got {:?}",
        err
    );
    assert!(err.to_string().contains(url));
}

#[test]
fn test_ragged_csv_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(
        temp_dir.path(),
        "ragged.csv",
        "territory,gender\n1,M\n2,F,77,extra\n3,M\n",
    );

    let result = load_dataset(&DataSource::Path(path), 100);
    assert!(matches!(result, Err(AnalysisError::Parse(_))));
}

#[test]
fn test_empty_file_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(temp_dir.path(), "empty.csv", "");

    let result = load_dataset(&DataSource::Path(path), 100);
    assert!(matches!(result, Err(AnalysisError::Parse(_))));
}

#[test]
fn test_full_scan_schema_inference() {
    let temp_dir = TempDir::new().unwrap();
    // A late decimal value only appears with a full scan
    let mut content = String::from("a,b\n");
    for i in 0..50 {
        content.push_str(&format!("{},x\n", i));
    }
    content.push_str("2.5,y\n");
    let path = write_file(temp_dir.path(), "late.csv", &content);

    let df = load_dataset(&DataSource::Path(path), 0).unwrap();
    assert_eq!(df.height(), 51);
    assert!(df.column("a").unwrap().dtype().is_float());
}
