//! Remedial transformations applied between model fits

use polars::prelude::*;

use super::error::{AnalysisError, Result};

/// Name given to the log-transformed copy of `column`
pub fn log_column_name(column: &str) -> String {
    format!("log_{}", column)
}

/// Replace `column` by its natural logarithm, renamed `log_<column>`.
///
/// The new column keeps the original position. Nulls stay null; any value
/// that is zero, negative, NaN or infinite fails with `InvalidTransform`.
pub fn log_transform(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let values = numeric_values(df, column)?;

    let mut logged: Vec<Option<f64>> = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        match value {
            Some(v) if !(v > 0.0 && v.is_finite()) => {
                return Err(AnalysisError::InvalidTransform {
                    column: column.to_string(),
                    row,
                    value: v,
                })
            }
            Some(v) => logged.push(Some(v.ln())),
            None => logged.push(None),
        }
    }

    let replacement = Column::new(log_column_name(column).into(), logged);
    replace_column(df, column, replacement)
}

/// Subtract the mean of each listed numeric column from its values.
///
/// Column names, positions and spreads are unchanged; nulls and non-finite
/// values are ignored when computing the mean.
pub fn mean_center(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    if columns.is_empty() {
        return Err(AnalysisError::config("no columns given to mean-center"));
    }

    let mut out = df.clone();
    for column in columns {
        let values = numeric_values(df, column)?;
        let present: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if present.is_empty() {
            return Err(AnalysisError::config(format!(
                "column '{}' has no values to center",
                column
            )));
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;

        let centered: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| x - mean)).collect();
        out.with_column(Column::new(column.as_str().into(), centered))?;
    }
    Ok(out)
}

fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?;
    if !col.dtype().is_primitive_numeric() {
        return Err(AnalysisError::NonNumericColumn {
            column: column.to_string(),
            dtype: col.dtype().to_string(),
        });
    }
    let floats = col.cast(&DataType::Float64)?;
    Ok(floats.f64()?.iter().collect())
}

fn replace_column(df: &DataFrame, name: &str, replacement: Column) -> Result<DataFrame> {
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|c| {
            if c.name().as_str() == name {
                replacement.clone()
            } else {
                c.clone()
            }
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}
