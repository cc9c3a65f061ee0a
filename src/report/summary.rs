//! Side-by-side comparison of the fitted models

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use super::model_report::{format_p_value, ModelReport};
use crate::pipeline::NestedFTest;

/// F test between two consecutive nested models
#[derive(Debug, Clone, Serialize)]
pub struct NestedComparison {
    pub reduced: String,
    pub full: String,
    #[serde(flatten)]
    pub test: NestedFTest,
}

/// Summary of every model fitted in a run
#[derive(Debug, Default)]
pub struct ModelComparison {
    pub rows: Vec<ComparisonRow>,
    pub nested: Vec<NestedComparison>,
}

/// One model's headline statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub label: String,
    pub formula: String,
    pub n_obs: usize,
    pub n_params: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub aic: f64,
    pub bic: f64,
}

impl ModelComparison {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, report: &ModelReport) {
        self.rows.push(ComparisonRow {
            label: report.label.clone(),
            formula: report.formula.clone(),
            n_obs: report.n_obs,
            n_params: report.n_params,
            r_squared: report.r_squared,
            adj_r_squared: report.adj_r_squared,
            aic: report.aic,
            bic: report.bic,
        });
    }

    pub fn add_nested(&mut self, comparison: NestedComparison) {
        self.nested.push(comparison);
    }

    /// Index of the model with the lowest AIC
    pub fn best_aic(&self) -> Option<usize> {
        best_by(&self.rows, |r| r.aic)
    }

    /// Index of the model with the lowest BIC
    pub fn best_bic(&self) -> Option<usize> {
        best_by(&self.rows, |r| r.bic)
    }

    /// True when the models explain different responses (e.g. after a log transform)
    pub fn has_mixed_responses(&self) -> bool {
        match self.rows.first() {
            Some(first) => {
                let response = response_of(&first.formula);
                self.rows.iter().any(|r| response_of(&r.formula) != response)
            }
            None => false,
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("MODEL COMPARISON").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let best_aic = self.best_aic();
        let best_bic = self.best_bic();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Model").add_attribute(Attribute::Bold),
            Cell::new("Formula").add_attribute(Attribute::Bold),
            Cell::new("n").add_attribute(Attribute::Bold),
            Cell::new("p").add_attribute(Attribute::Bold),
            Cell::new("R²").add_attribute(Attribute::Bold),
            Cell::new("Adj. R²").add_attribute(Attribute::Bold),
            Cell::new("AIC").add_attribute(Attribute::Bold),
            Cell::new("BIC").add_attribute(Attribute::Bold),
        ]);

        for (i, row) in self.rows.iter().enumerate() {
            table.add_row(vec![
                Cell::new(&row.label),
                Cell::new(&row.formula),
                Cell::new(row.n_obs).set_alignment(CellAlignment::Right),
                Cell::new(row.n_params).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.4}", row.r_squared)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.4}", row.adj_r_squared)).set_alignment(CellAlignment::Right),
                highlight(format!("{:.2}", row.aic), best_aic == Some(i)),
                highlight(format!("{:.2}", row.bic), best_bic == Some(i)),
            ]);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.nested.is_empty() {
            println!();
            for comparison in &self.nested {
                println!(
                    "      {} {} vs {}: F = {:.3} on {} and {} DF, p = {}",
                    style("•").dim(),
                    comparison.reduced,
                    comparison.full,
                    comparison.test.f_statistic,
                    comparison.test.df_numerator,
                    comparison.test.df_denominator,
                    format_p_value(comparison.test.p_value)
                );
            }
        }

        if self.has_mixed_responses() {
            println!();
            println!(
                "      {}",
                style("Information criteria are not comparable across different responses").dim()
            );
        }
    }
}

fn best_by(rows: &[ComparisonRow], key: impl Fn(&ComparisonRow) -> f64) -> Option<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| key(r).is_finite())
        .min_by(|a, b| key(a.1).total_cmp(&key(b.1)))
        .map(|(i, _)| i)
}

fn response_of(formula: &str) -> &str {
    formula.split('~').next().unwrap_or("").trim()
}

fn highlight(text: String, best: bool) -> Cell {
    let cell = Cell::new(text).set_alignment(CellAlignment::Right);
    if best {
        cell.fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, aic: f64, bic: f64) -> ComparisonRow {
        ComparisonRow {
            label: label.to_string(),
            formula: "y ~ x".to_string(),
            n_obs: 10,
            n_params: 2,
            r_squared: 0.5,
            adj_r_squared: 0.4,
            aic,
            bic,
        }
    }

    #[test]
    fn test_best_models() {
        let comparison = ModelComparison {
            rows: vec![
                row("Model 1", 120.0, 125.0),
                row("Model 2", 110.0, 130.0),
                row("Model 3", f64::NAN, 100.0),
            ],
            nested: Vec::new(),
        };
        assert_eq!(comparison.best_aic(), Some(1));
        assert_eq!(comparison.best_bic(), Some(2));
        assert!(!comparison.has_mixed_responses());
    }

    #[test]
    fn test_mixed_responses() {
        let mut logged = row("Model 3", 10.0, 12.0);
        logged.formula = "log_y ~ x".to_string();
        let comparison = ModelComparison {
            rows: vec![row("Model 1", 120.0, 125.0), logged],
            nested: Vec::new(),
        };
        assert!(comparison.has_mixed_responses());
    }

    #[test]
    fn test_empty_comparison() {
        let comparison = ModelComparison::new();
        assert_eq!(comparison.best_aic(), None);
        assert!(!comparison.has_mixed_responses());
    }
}
