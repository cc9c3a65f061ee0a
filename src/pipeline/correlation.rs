//! Pearson correlation among the numeric columns of a dataset

use faer::Mat;
use polars::prelude::*;
use serde::Serialize;

use super::error::Result;

/// Represents a correlated pair of columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Square correlation matrix with its column labels
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Mat<f64>,
    /// Rows on which every column of the matrix is present
    pub n_rows: usize,
    /// Columns with missing values; their correlations use pairwise-complete rows
    pub sparse_columns: Vec<String>,
}

impl CorrelationMatrix {
    /// Correlation of every other column with `column`, by |r| descending
    pub fn with_column(&self, column: &str) -> Vec<(String, f64)> {
        let Some(i) = self.names.iter().position(|n| n == column) else {
            return Vec::new();
        };
        let mut out: Vec<(String, f64)> = self
            .names
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, name)| (name.clone(), self.values[(i, j)]))
            .filter(|(_, r)| !r.is_nan())
            .collect();
        out.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        out
    }
}

/// Compute the correlation matrix of all primitive-numeric columns.
///
/// Algorithm:
/// 1. Skip constant or all-null columns
/// 2. For columns without nulls, standardize Z = (X - mean) / ‖X - mean‖
///    and take R = Zᵀ Z
/// 3. Any pair involving a column with nulls is correlated over the rows
///    where both are present (NaN when fewer than two such rows vary)
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix> {
    let mut names: Vec<String> = Vec::new();
    let mut raw: Vec<Vec<Option<f64>>> = Vec::new();
    for col in df.get_columns() {
        if !col.dtype().is_primitive_numeric() {
            continue;
        }
        let floats = col.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> =
            floats.f64()?.iter().map(|v| v.filter(|x| !x.is_nan())).collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if centered(&present).is_none() {
            continue;
        }
        names.push(col.name().to_string());
        raw.push(values);
    }

    let k = names.len();
    let dense: Vec<usize> = (0..k).filter(|&j| raw[j].iter().all(Option::is_some)).collect();
    let sparse_columns: Vec<String> = (0..k)
        .filter(|j| !dense.contains(j))
        .map(|j| names[j].clone())
        .collect();
    let n_rows = (0..df.height())
        .filter(|&i| raw.iter().all(|col| col[i].is_some()))
        .count();

    let mut values = Mat::<f64>::from_fn(k, k, |i, j| if i == j { 1.0 } else { f64::NAN });

    // Null-free block in one product
    let mut z = Mat::<f64>::zeros(df.height(), dense.len());
    for (col_idx, &j) in dense.iter().enumerate() {
        let column: Vec<f64> = raw[j].iter().flatten().copied().collect();
        if let Some((mean, norm)) = centered(&column) {
            for (row_idx, val) in column.iter().enumerate() {
                z[(row_idx, col_idx)] = (val - mean) / norm;
            }
        }
    }
    let block = z.transpose() * &z;
    for (a, &i) in dense.iter().enumerate() {
        for (b, &j) in dense.iter().enumerate() {
            if i != j {
                values[(i, j)] = block[(a, b)];
            }
        }
    }

    // Pairs touching a sparse column
    for i in 0..k {
        for j in (i + 1)..k {
            if dense.contains(&i) && dense.contains(&j) {
                continue;
            }
            let r = pairwise_pearson(&raw[i], &raw[j]);
            values[(i, j)] = r;
            values[(j, i)] = r;
        }
    }

    Ok(CorrelationMatrix {
        names,
        values,
        n_rows,
        sparse_columns,
    })
}

/// Mean and centered norm, or `None` for empty or constant data
fn centered(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let norm = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>().sqrt();
    (norm > 0.0).then_some((mean, norm))
}

fn pairwise_pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    match (centered(&xs), centered(&ys)) {
        (Some((mx, nx)), Some((my, ny))) => {
            let cov: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
            (cov / (nx * ny)).clamp(-1.0, 1.0)
        }
        _ => f64::NAN,
    }
}

/// Extract pairs whose |r| exceeds `threshold`, sorted by |r| descending
pub fn find_correlated_pairs(matrix: &CorrelationMatrix, threshold: f64) -> Vec<CorrelatedPair> {
    let n = matrix.names.len();
    let mut pairs = Vec::new();

    // Upper triangle
    for i in 0..n {
        for j in (i + 1)..n {
            let corr = matrix.values[(i, j)];
            if corr.abs() > threshold && !corr.is_nan() {
                pairs.push(CorrelatedPair {
                    feature1: matrix.names[i].clone(),
                    feature2: matrix.names[j].clone(),
                    correlation: corr,
                });
            }
        }
    }

    pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    pairs
}
