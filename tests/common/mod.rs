//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// Header of a raw policy export, premium-adjacent columns included
pub const RAW_HEADER: &str = "territory,gender,birthdate,ypc,current_premium,indicated_premium,selected_premium,underlying_premium,fixed_expenses,underlying_total_premium,cgr_factor,cgr";

/// Processing date used by the fixtures
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 30).unwrap()
}

/// Generate a raw policy CSV with `rows` records.
///
/// Territory codes 1..=12 appear with decreasing frequency so that the top
/// levels are well separated. Premiums are a noisy linear function of the
/// covariates and always positive.
pub fn policy_csv(rows: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);

    // Level L appears 13 - L times per cycle
    let cycle: Vec<u32> = (1..=12u32)
        .flat_map(|level| std::iter::repeat(level).take((13 - level) as usize))
        .collect();

    let mut csv = String::from(RAW_HEADER);
    csv.push('\n');
    for row in 0..rows {
        let territory = cycle[row % cycle.len()];
        let gender = if rng.gen_bool(0.5) { "M" } else { "F" };
        let year = rng.gen_range(1945..=2002);
        let month = rng.gen_range(1..=12);
        let day = rng.gen_range(1..=28);
        let ypc: f64 = rng.gen_range(0..=30) as f64;
        let cgr_factor: f64 = rng.gen_range(0.5..1.5);
        let age = 2021 - year;

        let noise: f64 = rng.gen_range(-40.0..40.0);
        let premium = 400.0
            + 15.0 * territory as f64
            + if gender == "M" { 35.0 } else { 0.0 }
            + 4.0 * age as f64
            - 3.0 * ypc
            + 120.0 * cgr_factor
            + noise;

        csv.push_str(&format!(
            "{},{},{:02}/{:02}/{},{},{:.2},{:.2},{:.2},{:.2},25.00,{:.2},{:.4},{}\n",
            territory,
            gender,
            month,
            day,
            year,
            ypc,
            premium,
            premium * 1.05,
            premium * 1.02,
            premium * 0.97,
            premium * 0.95,
            cgr_factor,
            rng.gen_range(1..=5)
        ));
    }
    csv
}

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Write a zip archive holding the given `(member, content)` entries
pub fn write_zip(dir: &Path, name: &str, members: &[(&str, &str)]) -> PathBuf {
    use ::zip::write::SimpleFileOptions;

    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    for (member, content) in members {
        writer.start_file(*member, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Create a temporary directory holding a generated policy CSV
pub fn create_policy_csv(rows: usize, seed: u64) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(temp_dir.path(), "policies.csv", &policy_csv(rows, seed));
    (temp_dir, path)
}

/// A small model-ready frame in the shape produced by the cleaner
pub fn create_policy_dataframe() -> DataFrame {
    df! {
        "current_premium" => [
            812.0f64, 745.5, 903.2, 688.0, 955.1, 720.4, 870.9, 799.3, 1010.6, 702.2, 845.0, 930.7,
        ],
        "territory" => ["1", "2", "1", "3", "2", "3", "1", "2", "1", "3", "2", "1"],
        "gender" => ["M", "F", "M", "F", "M", "F", "F", "M", "M", "F", "F", "M"],
        "age" => [34i64, 28, 51, 23, 60, 31, 45, 38, 66, 25, 42, 55],
        "ypc" => [10.0f64, 4.0, 22.0, 1.0, 30.0, 6.0, 15.0, 12.0, 28.0, 2.0, 18.0, 20.0],
        "cgr_factor" => [0.9f64, 1.1, 0.8, 1.3, 0.7, 1.2, 1.0, 0.95, 0.85, 1.25, 1.05, 0.75],
    }
    .unwrap()
}

/// The five-row end-to-end scenario: two territories and one numeric predictor
pub fn create_five_row_dataframe() -> DataFrame {
    df! {
        "current_premium" => [500.0f64, 620.0, 540.0, 700.0, 580.0],
        "territory" => ["1", "2", "1", "2", "1"],
        "ypc" => [3.0f64, 10.0, 5.0, 12.0, 8.0],
    }
    .unwrap()
}

/// Assert that a DataFrame has the expected columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in expected_cols {
        assert!(
            actual.contains(&col.to_string()),
            "Expected column '{}' not found. Actual columns: {:?}",
            col,
            actual
        );
    }
}

/// Assert that a DataFrame does NOT have certain columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in unexpected_cols {
        assert!(
            !actual.contains(&col.to_string()),
            "Column '{}' should not exist. Actual columns: {:?}",
            col,
            actual
        );
    }
}
