//! Integration tests for formula parsing and OLS fitting

use approx::assert_relative_eq;
use polars::prelude::*;
use premia::pipeline::{
    clean_dataset, fit, fit_formula, load_dataset, nested_f_test, reduce_categories,
    AnalysisError, DataSource, Formula, INTERCEPT,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

const MAIN_EFFECTS: &str = "current_premium ~ territory + gender + age + ypc + cgr_factor";
const INTERACTIONS: &str =
    "current_premium ~ territory + gender + age + ypc + cgr_factor + gender:age + age:ypc + ypc:cgr_factor";

fn reduced_policies() -> DataFrame {
    let (_temp_dir, path) = create_policy_csv(300, 11);
    let raw = load_dataset(&DataSource::Path(path), 100).unwrap();
    let cleaned = clean_dataset(&raw, as_of()).unwrap();
    reduce_categories(&cleaned, "territory", 10).unwrap().data
}

#[test]
fn test_five_row_scenario() {
    let df = create_five_row_dataframe();
    let model = fit_formula(&df, "current_premium ~ territory + ypc").unwrap();

    let names: Vec<&str> = model.coefficients.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![INTERCEPT, "territory2", "ypc"]);
    assert_eq!(model.slopes().count(), 2);
    assert_eq!(model.residuals.len(), 5);
    assert_eq!(model.df_residual, 2);

    // Residuals of a model with an intercept sum to zero
    assert_relative_eq!(model.residuals.iter().sum::<f64>(), 0.0, epsilon = 1e-8);
}

#[test]
fn test_simple_regression_matches_closed_form() {
    let df = df! {
        "y" => [1.0f64, 3.0, 2.0, 5.0, 4.0],
        "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
    }
    .unwrap();
    let model = fit_formula(&df, "y ~ x").unwrap();

    assert_relative_eq!(model.coefficient(INTERCEPT).unwrap().estimate, 0.6, epsilon = 1e-10);
    assert_relative_eq!(model.coefficient("x").unwrap().estimate, 0.8, epsilon = 1e-10);
    assert_relative_eq!(model.r_squared, 0.64, epsilon = 1e-10);
    // RSS = 10 - 6.4 on 3 df
    assert_relative_eq!(model.rss, 3.6, epsilon = 1e-10);
    assert_relative_eq!(model.sigma, (3.6f64 / 3.0).sqrt(), epsilon = 1e-10);
}

#[test]
fn test_fit_is_deterministic() {
    let df = reduced_policies();
    let formula = Formula::parse(INTERACTIONS).unwrap();

    let first = fit(&df, &formula).unwrap();
    let second = fit(&df, &formula).unwrap();

    for (a, b) in first.coefficients.iter().zip(second.coefficients.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.estimate.to_bits(), b.estimate.to_bits());
        assert_eq!(a.std_error.to_bits(), b.std_error.to_bits());
    }
    assert_eq!(first.rss.to_bits(), second.rss.to_bits());
}

#[test]
fn test_nested_models_r_squared_monotone() {
    let df = reduced_policies();
    let reduced = fit_formula(&df, MAIN_EFFECTS).unwrap();
    let full = fit_formula(&df, INTERACTIONS).unwrap();

    assert!(reduced.formula.is_nested_in(&full.formula));
    assert!(full.r_squared >= reduced.r_squared);
    assert!(full.rss <= reduced.rss);

    // 9 territory indicators, gender, age, ypc, cgr_factor and the intercept
    assert_eq!(reduced.n_params, 14);
    assert_eq!(full.n_params, 17);

    let test = nested_f_test(&reduced, &full).unwrap();
    assert_eq!(test.df_numerator, 3);
    assert_eq!(test.df_denominator, full.df_residual);
    assert!(test.f_statistic >= 0.0);
    assert!((0.0..=1.0).contains(&test.p_value));
}

#[test]
fn test_generated_effects_are_recovered() {
    let df = reduced_policies();
    let model = fit_formula(&df, MAIN_EFFECTS).unwrap();

    // Premiums rise 4 per year of age and fall 3 per year of prior coverage
    assert_relative_eq!(model.coefficient("age").unwrap().estimate, 4.0, epsilon = 0.5);
    assert_relative_eq!(model.coefficient("ypc").unwrap().estimate, -3.0, epsilon = 0.75);
    assert!(model.coefficient("age").unwrap().p_value < 1e-6);
    assert!(model.r_squared > 0.8);
    assert!(model.f_p_value < 1e-6);
}

#[test]
fn test_information_criteria_relations() {
    let df = create_policy_dataframe();
    let model = fit_formula(&df, "current_premium ~ age + ypc").unwrap();

    let n = model.n_obs as f64;
    let k = model.n_params as f64 + 1.0;
    assert_relative_eq!(model.aic, -2.0 * model.log_likelihood + 2.0 * k, epsilon = 1e-9);
    assert_relative_eq!(model.bic, -2.0 * model.log_likelihood + n.ln() * k, epsilon = 1e-9);
    assert_relative_eq!(
        model.adj_r_squared,
        1.0 - (1.0 - model.r_squared) * (n - 1.0) / (n - model.n_params as f64),
        epsilon = 1e-12
    );
}

#[test]
fn test_listwise_deletion() {
    let df = df! {
        "y" => [Some(1.0f64), Some(2.1), None, Some(3.9), Some(5.2), Some(6.1)],
        "x" => [Some(1.0f64), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)],
    }
    .unwrap();
    let model = fit_formula(&df, "y ~ x").unwrap();

    assert_eq!(model.n_obs, 4);
    assert_eq!(model.omitted_rows(), 2);
    assert_eq!(model.design.retained_rows, vec![0, 1, 4, 5]);
}

#[test]
fn test_aliased_column_is_rank_deficient() {
    let df = df! {
        "y" => [1.0f64, 2.0, 2.5, 4.5, 5.0],
        "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "x2" => [2.0f64, 4.0, 6.0, 8.0, 10.0],
    }
    .unwrap();

    match fit_formula(&df, "y ~ x + x2") {
        Err(AnalysisError::RankDeficient { aliased, .. }) => {
            assert_eq!(aliased, vec!["x2".to_string()]);
        }
        other => panic!("expected RankDeficient, got {:?}", other.map(|m| m.n_params)),
    }
}

#[test]
fn test_single_level_categorical_is_config_error() {
    let df = df! {
        "y" => [1.0f64, 2.0, 3.0],
        "g" => ["a", "a", "a"],
    }
    .unwrap();
    assert!(matches!(
        fit_formula(&df, "y ~ g"),
        Err(AnalysisError::Config(_))
    ));
}

#[test]
fn test_non_numeric_response() {
    let df = df! {
        "y" => ["a", "b", "c"],
        "x" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();
    assert!(matches!(
        fit_formula(&df, "y ~ x"),
        Err(AnalysisError::NonNumericColumn { .. })
    ));
}
