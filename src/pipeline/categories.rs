//! Category reduction: keep only the most frequent levels of a categorical column

use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use serde::Serialize;

use super::error::{AnalysisError, Result};

/// Frequency of one category level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub level: String,
    pub count: usize,
}

/// Outcome of reducing a categorical column to its top levels
#[derive(Debug, Clone)]
pub struct CategoryReduction {
    /// Rows whose level is retained
    pub data: DataFrame,
    /// Retained levels in rank order
    pub retained: Vec<CategoryCount>,
    /// Number of rows excluded (including rows with a missing level)
    pub dropped_rows: usize,
}

impl CategoryReduction {
    /// Retained level labels in rank order
    pub fn retained_levels(&self) -> Vec<String> {
        self.retained.iter().map(|c| c.level.clone()).collect()
    }
}

/// Count rows per non-null level of `column`.
///
/// Ordered by count descending; equal counts are ordered by level label ascending.
pub fn category_counts(df: &DataFrame, column: &str) -> Result<Vec<CategoryCount>> {
    let values = string_values(df, column)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for level in values.iter().flatten() {
        *counts.entry(level.clone()).or_insert(0) += 1;
    }

    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(level, count)| CategoryCount { level, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.level.cmp(&b.level)));

    Ok(ranked)
}

/// Keep only rows whose `column` level is among the `k` most frequent.
///
/// Fails with `Config` when `k` is zero or exceeds the number of distinct levels.
pub fn reduce_categories(df: &DataFrame, column: &str, k: usize) -> Result<CategoryReduction> {
    let ranked = category_counts(df, column)?;

    if k == 0 {
        return Err(AnalysisError::config(format!(
            "retention count for '{}' must be at least 1",
            column
        )));
    }
    if k > ranked.len() {
        return Err(AnalysisError::config(format!(
            "retention count {} exceeds the {} distinct levels of '{}'",
            k,
            ranked.len(),
            column
        )));
    }

    let retained: Vec<CategoryCount> = ranked.into_iter().take(k).collect();
    let keep: HashSet<&str> = retained.iter().map(|c| c.level.as_str()).collect();

    let mask: Vec<bool> = string_values(df, column)?
        .iter()
        .map(|v| v.as_deref().is_some_and(|level| keep.contains(level)))
        .collect();
    let kept_rows = mask.iter().filter(|&&m| m).count();

    let data = df.filter(&BooleanChunked::from_slice("retained".into(), &mask))?;

    Ok(CategoryReduction {
        data,
        retained,
        dropped_rows: df.height() - kept_rows,
    })
}

fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(column)
        .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?;
    let as_string = col.cast(&DataType::String)?;
    let values = as_string
        .str()?
        .iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}
