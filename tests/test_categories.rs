//! Tests for category reduction

use std::collections::HashSet;

use polars::prelude::*;
use premia::pipeline::{
    category_counts, clean_dataset, load_dataset, reduce_categories, AnalysisError, DataSource,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

/// Two full territory cycles: level L appears 2 * (13 - L) times
fn cleaned_policies() -> DataFrame {
    let (_temp_dir, path) = create_policy_csv(156, 7);
    let raw = load_dataset(&DataSource::Path(path), 100).unwrap();
    clean_dataset(&raw, as_of()).unwrap()
}

fn levels(df: &DataFrame, column: &str) -> Vec<String> {
    df.column(column)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn test_top_ten_territories() {
    let df = cleaned_policies();
    let reduction = reduce_categories(&df, "territory", 10).unwrap();

    let expected: Vec<String> = (1..=10).map(|l| l.to_string()).collect();
    assert_eq!(reduction.retained_levels(), expected);
    assert_eq!(reduction.retained[0].count, 24);
    assert_eq!(reduction.retained[9].count, 6);

    // Levels 11 and 12 hold 4 + 2 rows
    assert_eq!(reduction.dropped_rows, 6);
    assert_eq!(reduction.data.height(), 150);

    let retained: HashSet<String> = reduction.retained_levels().into_iter().collect();
    assert!(levels(&reduction.data, "territory")
        .iter()
        .all(|level| retained.contains(level)));
}

#[test]
fn test_exactly_k_levels_retained() {
    let df = cleaned_policies();
    for k in [1, 5, 12] {
        let reduction = reduce_categories(&df, "territory", k).unwrap();
        let distinct: HashSet<String> = levels(&reduction.data, "territory").into_iter().collect();
        assert_eq!(reduction.retained.len(), k);
        assert_eq!(distinct.len(), k);
    }
}

#[test]
fn test_invalid_retention_counts() {
    let df = cleaned_policies();
    assert!(matches!(
        reduce_categories(&df, "territory", 0),
        Err(AnalysisError::Config(_))
    ));
    assert!(matches!(
        reduce_categories(&df, "territory", 13),
        Err(AnalysisError::Config(_))
    ));
    assert!(matches!(
        reduce_categories(&df, "region", 3),
        Err(AnalysisError::ColumnNotFound(_))
    ));
}

#[test]
fn test_null_levels_are_excluded() {
    let df = df! {
        "territory" => [Some("a"), None, Some("b"), Some("a"), None, Some("c")],
        "value" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0],
    }
    .unwrap();

    let counts = category_counts(&df, "territory").unwrap();
    assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 4);

    let reduction = reduce_categories(&df, "territory", 3).unwrap();
    assert_eq!(reduction.data.height(), 4);
    assert_eq!(reduction.dropped_rows, 2);
}

#[test]
fn test_reduction_does_not_mutate_input() {
    let df = cleaned_policies();
    let before = df.clone();
    let _ = reduce_categories(&df, "territory", 3).unwrap();
    assert!(df.equals_missing(&before));
}
