//! Design matrix construction from a formula and a dataset
//!
//! Numeric predictors enter as-is. Categorical predictors are treatment coded:
//! one indicator per level, with the first level dropped as reference.
//! Interaction columns are elementwise products of their factors' encoded columns.

use std::collections::BTreeSet;

use faer::Mat;
use polars::prelude::*;

use super::error::{AnalysisError, Result};
use super::formula::Formula;

/// Name of the intercept column
pub const INTERCEPT: &str = "(Intercept)";

/// A predictor after encoding: one or more named columns over the retained rows
#[derive(Debug, Clone)]
struct EncodedVariable {
    name: String,
    column_names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

/// Design columns produced by one formula term
#[derive(Debug, Clone, PartialEq)]
pub struct TermColumns {
    /// Term label, e.g. `territory:ypc`
    pub term: String,
    /// Indices into the design matrix columns
    pub columns: Vec<usize>,
}

/// Encoded model matrix and response over the complete-case rows
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Mat<f64>,
    pub y: Vec<f64>,
    pub column_names: Vec<String>,
    pub terms: Vec<TermColumns>,
    pub intercept: bool,
    /// Source row index of every design row
    pub retained_rows: Vec<usize>,
}

impl DesignMatrix {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Number of source rows omitted because of missing values
    pub fn omitted_rows(&self, source_rows: usize) -> usize {
        source_rows - self.retained_rows.len()
    }
}

/// Encode `formula` over `df`.
///
/// Rows with a missing value in any model variable are omitted.
pub fn build_design(df: &DataFrame, formula: &Formula) -> Result<DesignMatrix> {
    let response_col = df
        .column(&formula.response)
        .map_err(|_| AnalysisError::ColumnNotFound(formula.response.clone()))?;
    if !response_col.dtype().is_primitive_numeric() {
        return Err(AnalysisError::NonNumericColumn {
            column: formula.response.clone(),
            dtype: response_col.dtype().to_string(),
        });
    }

    let predictors = formula.predictors();
    let mut raw: Vec<RawVariable> = Vec::with_capacity(predictors.len());
    for name in &predictors {
        raw.push(read_variable(df, name)?);
    }
    let response = read_numeric(response_col)?;

    // Complete cases across response and predictors
    let retained_rows: Vec<usize> = (0..df.height())
        .filter(|&i| response[i].is_some() && raw.iter().all(|v| v.is_present(i)))
        .collect();
    if retained_rows.is_empty() {
        return Err(AnalysisError::config(format!(
            "no complete rows to fit '{}'",
            formula
        )));
    }

    let y: Vec<f64> = retained_rows
        .iter()
        .filter_map(|&i| response[i])
        .collect();

    let encoded: Vec<EncodedVariable> = raw
        .into_iter()
        .zip(predictors.iter())
        .map(|(variable, name)| encode(name, variable, &retained_rows))
        .collect::<Result<_>>()?;

    let n = retained_rows.len();
    let mut column_names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut terms: Vec<TermColumns> = Vec::new();

    if formula.intercept {
        column_names.push(INTERCEPT.to_string());
        columns.push(vec![1.0; n]);
    }

    for term in &formula.terms {
        // Cartesian product of the factors' encoded columns
        let mut names: Vec<String> = vec![String::new()];
        let mut values: Vec<Vec<f64>> = vec![vec![1.0; n]];

        for factor in term.factors() {
            let variable = encoded
                .iter()
                .find(|v| &v.name == factor)
                .ok_or_else(|| AnalysisError::ColumnNotFound(factor.clone()))?;

            let mut next_names = Vec::with_capacity(names.len() * variable.columns.len());
            let mut next_values = Vec::with_capacity(names.len() * variable.columns.len());
            for (prefix, acc) in names.iter().zip(values.iter()) {
                for (col_name, col) in variable.column_names.iter().zip(variable.columns.iter()) {
                    next_names.push(if prefix.is_empty() {
                        col_name.clone()
                    } else {
                        format!("{}:{}", prefix, col_name)
                    });
                    next_values.push(acc.iter().zip(col.iter()).map(|(a, b)| a * b).collect());
                }
            }
            names = next_names;
            values = next_values;
        }

        let start = columns.len();
        column_names.extend(names);
        columns.extend(values);
        terms.push(TermColumns {
            term: term.label(),
            columns: (start..columns.len()).collect(),
        });
    }

    let x = Mat::from_fn(n, columns.len(), |i, j| columns[j][i]);

    Ok(DesignMatrix {
        x,
        y,
        column_names,
        terms,
        intercept: formula.intercept,
        retained_rows,
    })
}

/// Sort levels numerically when every label is a number, otherwise lexically
pub fn sort_levels(levels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut levels: Vec<String> = levels.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.trim().parse::<f64>().ok()).collect();
    if let Some(values) = numeric {
        let mut pairs: Vec<(f64, String)> = values.into_iter().zip(levels).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        levels = pairs.into_iter().map(|(_, l)| l).collect();
    }
    levels
}

/// True when a column is modelled as categorical
pub fn is_categorical(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

enum RawVariable {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl RawVariable {
    fn is_present(&self, row: usize) -> bool {
        match self {
            RawVariable::Numeric(values) => values[row].is_some(),
            RawVariable::Categorical(values) => values[row].is_some(),
        }
    }
}

fn read_variable(df: &DataFrame, name: &str) -> Result<RawVariable> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))?;
    let dtype = column.dtype();

    if is_categorical(dtype) {
        let as_string = column.cast(&DataType::String)?;
        let values = as_string
            .str()?
            .iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();
        Ok(RawVariable::Categorical(values))
    } else if dtype.is_primitive_numeric() || dtype == &DataType::Boolean {
        Ok(RawVariable::Numeric(read_numeric(column)?))
    } else {
        Err(AnalysisError::NonNumericColumn {
            column: name.to_string(),
            dtype: dtype.to_string(),
        })
    }
}

/// Numeric values with NaN treated as missing
fn read_numeric(column: &Column) -> Result<Vec<Option<f64>>> {
    let floats = column.cast(&DataType::Float64)?;
    let values = floats
        .f64()?
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

fn encode(name: &str, variable: RawVariable, rows: &[usize]) -> Result<EncodedVariable> {
    match variable {
        RawVariable::Numeric(values) => Ok(EncodedVariable {
            name: name.to_string(),
            column_names: vec![name.to_string()],
            columns: vec![rows.iter().filter_map(|&i| values[i]).collect()],
        }),
        RawVariable::Categorical(values) => {
            let observed: Vec<&str> = rows.iter().filter_map(|&i| values[i].as_deref()).collect();
            let levels = sort_levels(observed.iter().map(|s| s.to_string()));
            if levels.len() < 2 {
                return Err(AnalysisError::config(format!(
                    "categorical predictor '{}' needs at least two levels, found {}",
                    name,
                    levels.len()
                )));
            }

            let column_names = levels[1..]
                .iter()
                .map(|level| format!("{}{}", name, level))
                .collect();
            let columns = levels[1..]
                .iter()
                .map(|level| {
                    observed
                        .iter()
                        .map(|&v| if v == level { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect();

            Ok(EncodedVariable {
                name: name.to_string(),
                column_names,
                columns,
            })
        }
    }
}
