//! Tests for the exploratory correlation matrix

use approx::assert_abs_diff_eq;
use polars::prelude::*;
use premia::pipeline::{
    clean_dataset, correlation_matrix, find_correlated_pairs, load_dataset, DataSource,
    RESPONSE_COLUMN,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_categoricals_are_excluded() {
    let (_temp_dir, path) = create_policy_csv(120, 19);
    let raw = load_dataset(&DataSource::Path(path), 100).unwrap();
    let cleaned = clean_dataset(&raw, as_of()).unwrap();

    let matrix = correlation_matrix(&cleaned).unwrap();
    assert_eq!(
        matrix.names,
        vec![RESPONSE_COLUMN, "age", "ypc", "cgr_factor"]
    );
    assert_eq!(matrix.n_rows, 120);
}

#[test]
fn test_response_correlates_most_with_age() {
    let (_temp_dir, path) = create_policy_csv(300, 29);
    let raw = load_dataset(&DataSource::Path(path), 100).unwrap();
    let cleaned = clean_dataset(&raw, as_of()).unwrap();

    let matrix = correlation_matrix(&cleaned).unwrap();
    let ranked = matrix.with_column(RESPONSE_COLUMN);
    assert_eq!(ranked[0].0, "age");
    assert!(ranked[0].1 > 0.5);
}

#[test]
fn test_matrix_is_symmetric_with_unit_diagonal() {
    let df = create_policy_dataframe();
    let matrix = correlation_matrix(&df).unwrap();

    let n = matrix.names.len();
    for i in 0..n {
        assert_abs_diff_eq!(matrix.values[(i, i)], 1.0, epsilon = 1e-12);
        for j in 0..n {
            assert_abs_diff_eq!(matrix.values[(i, j)], matrix.values[(j, i)], epsilon = 1e-12);
            assert!(matrix.values[(i, j)].abs() <= 1.0 + 1e-12);
        }
    }
}

#[test]
fn test_threshold_filters_pairs() {
    let df = df! {
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "b" => [2.0f64, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0],
        "c" => [10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
        "d" => [5.0f64, 1.0, 8.0, 2.0, 9.0, 3.0, 7.0, 4.0, 6.0, 0.0],
    }
    .unwrap();
    let matrix = correlation_matrix(&df).unwrap();

    let strong = find_correlated_pairs(&matrix, 0.9);
    assert_eq!(strong.len(), 3);
    assert!(strong.iter().all(|p| p.feature1 != "d" && p.feature2 != "d"));
    assert!(strong
        .iter()
        .any(|p| p.feature1 == "a" && p.feature2 == "c" && p.correlation < -0.99));

    assert_eq!(find_correlated_pairs(&matrix, 0.999).len(), 3);
    assert_eq!(find_correlated_pairs(&matrix, 0.0).len(), 6);
}
