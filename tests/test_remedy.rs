//! Tests for the log transform and mean centering remedies

use approx::assert_relative_eq;
use polars::prelude::*;
use premia::pipeline::{
    fit_formula, get_column_names, log_column_name, log_transform, mean_center,
    variance_inflation, AnalysisError,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn values(df: &DataFrame, column: &str) -> Vec<f64> {
    df.column(column)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn variance(v: &[f64]) -> f64 {
    let m = mean(v);
    v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (v.len() - 1) as f64
}

#[test]
fn test_log_round_trip() {
    let df = create_policy_dataframe();
    let logged = log_transform(&df, "current_premium").unwrap();

    let name = log_column_name("current_premium");
    assert_eq!(name, "log_current_premium");
    assert_eq!(get_column_names(&logged)[0], name);
    assert_missing_columns(&logged, &["current_premium"]);

    let original = values(&df, "current_premium");
    for (x, l) in original.iter().zip(values(&logged, &name)) {
        assert_relative_eq!(l.exp(), *x, max_relative = 1e-12);
    }
}

#[test]
fn test_log_rejects_non_positive_values() {
    let df = df! {
        "current_premium" => [120.0f64, 0.0, 80.0],
    }
    .unwrap();

    match log_transform(&df, "current_premium") {
        Err(AnalysisError::InvalidTransform { column, row, value }) => {
            assert_eq!(column, "current_premium");
            assert_eq!(row, 1);
            assert_eq!(value, 0.0);
        }
        other => panic!("expected InvalidTransform, got {:?}", other.map(|d| d.shape())),
    }
}

#[test]
fn test_log_keeps_nulls() {
    let df = df! {
        "y" => [Some(1.0f64), None, Some(std::f64::consts::E)],
    }
    .unwrap();
    let logged = log_transform(&df, "y").unwrap();
    let column = logged.column("log_y").unwrap();

    assert_eq!(column.null_count(), 1);
    assert_relative_eq!(column.f64().unwrap().get(2).unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_centering_preserves_spread() {
    let df = create_policy_dataframe();
    let columns = vec!["age".to_string(), "ypc".to_string()];
    let centered = mean_center(&df, &columns).unwrap();

    for column in &columns {
        let before = values(&df, column);
        let after = values(&centered, column);
        assert_relative_eq!(mean(&after), 0.0, epsilon = 1e-9);
        assert_relative_eq!(variance(&after), variance(&before), max_relative = 1e-12);
    }
    assert_eq!(get_column_names(&centered), get_column_names(&df));
}

#[test]
fn test_centering_reduces_interaction_vif() {
    let df = create_policy_dataframe();
    let formula = "current_premium ~ age + ypc + age:ypc";

    let raw = variance_inflation(&fit_formula(&df, formula).unwrap()).unwrap();
    let centered_df = mean_center(&df, &["age".to_string(), "ypc".to_string()]).unwrap();
    let centered = variance_inflation(&fit_formula(&centered_df, formula).unwrap()).unwrap();

    assert!(centered["age:ypc"].gvif < raw["age:ypc"].gvif);
}

#[test]
fn test_centering_leaves_fit_unchanged() {
    let df = create_policy_dataframe();
    let formula = "current_premium ~ territory + age + ypc";
    let centered_df = mean_center(&df, &["age".to_string()]).unwrap();

    let raw = fit_formula(&df, formula).unwrap();
    let centered = fit_formula(&centered_df, formula).unwrap();

    assert_relative_eq!(raw.rss, centered.rss, max_relative = 1e-9);
    assert_relative_eq!(
        raw.coefficient("age").unwrap().estimate,
        centered.coefficient("age").unwrap().estimate,
        max_relative = 1e-9
    );
}

#[test]
fn test_centering_errors() {
    let df = create_policy_dataframe();
    assert!(matches!(mean_center(&df, &[]), Err(AnalysisError::Config(_))));
    assert!(matches!(
        mean_center(&df, &["gender".to_string()]),
        Err(AnalysisError::NonNumericColumn { .. })
    ));
    assert!(matches!(
        mean_center(&df, &["region".to_string()]),
        Err(AnalysisError::ColumnNotFound(_))
    ));
}

#[test]
fn test_remedies_do_not_mutate_input() {
    let df = create_policy_dataframe();
    let before = df.clone();
    let _ = log_transform(&df, "current_premium").unwrap();
    let _ = mean_center(&df, &["ypc".to_string()]).unwrap();
    assert!(df.equals_missing(&before));
}
