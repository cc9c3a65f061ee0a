//! Diagnostics summary of a fitted model

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use indexmap::IndexMap;
use serde::Serialize;

use crate::pipeline::{
    default_cooks_threshold, high_vif_terms, influential_observations, variance_inflation,
    AnalysisError, InfluentialObservation, ModelFit, Result, VifEntry,
};

/// Influential rows shown on the terminal before truncating
const MAX_LISTED_ROWS: usize = 10;

/// Influence and collinearity findings for one model
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub model: String,
    pub formula: String,
    pub cooks_threshold: f64,
    pub influential_observations: Vec<InfluentialObservation>,
    /// Absent when the model has fewer than two terms or no intercept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_inflation: Option<IndexMap<String, VifEntry>>,
    pub vif_threshold: f64,
    pub high_vif_terms: Vec<String>,
}

impl DiagnosticsReport {
    /// Run influence and VIF diagnostics on `fit`.
    ///
    /// Models for which VIF is undefined get no VIF section; any other
    /// failure is returned.
    pub fn from_fit(
        label: &str,
        fit: &ModelFit,
        cooks_threshold: Option<f64>,
        vif_threshold: f64,
    ) -> Result<Self> {
        let cooks_threshold = cooks_threshold.unwrap_or_else(|| default_cooks_threshold(fit));
        let influential = influential_observations(fit, cooks_threshold);

        let vif = match variance_inflation(fit) {
            Ok(entries) => Some(entries),
            Err(AnalysisError::Config(_)) => None,
            Err(e) => return Err(e),
        };
        let high = vif
            .as_ref()
            .map(|entries| high_vif_terms(entries, vif_threshold))
            .unwrap_or_default();

        Ok(Self {
            model: label.to_string(),
            formula: fit.formula.to_string(),
            cooks_threshold,
            influential_observations: influential,
            variance_inflation: vif,
            vif_threshold,
            high_vif_terms: high,
        })
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style(format!("{} DIAGNOSTICS", self.model.to_uppercase())).cyan().bold(),
            style(&self.formula).dim()
        );
        println!("    {}", style("─".repeat(50)).dim());

        println!(
            "      Influential observations (Cook's D > {:.4}): {}",
            self.cooks_threshold,
            style(self.influential_observations.len()).yellow().bold()
        );
        for obs in self.influential_observations.iter().take(MAX_LISTED_ROWS) {
            println!(
                "        {} row {:>6}  D = {:.4}  leverage = {:.4}  residual = {:.3}",
                style("•").dim(),
                obs.row,
                obs.cooks_distance,
                obs.leverage,
                obs.residual
            );
        }
        if self.influential_observations.len() > MAX_LISTED_ROWS {
            println!(
                "        {}",
                style(format!(
                    "... and {} more",
                    self.influential_observations.len() - MAX_LISTED_ROWS
                ))
                .dim()
            );
        }

        let Some(entries) = &self.variance_inflation else {
            println!(
                "      {}",
                style("Variance inflation needs an intercept and at least two terms").dim()
            );
            return;
        };

        println!();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Term").add_attribute(Attribute::Bold),
            Cell::new("GVIF").add_attribute(Attribute::Bold),
            Cell::new("Df").add_attribute(Attribute::Bold),
            Cell::new("GVIF^(1/(2·Df))").add_attribute(Attribute::Bold),
        ]);
        for (term, entry) in entries {
            let color = if self.high_vif_terms.contains(term) {
                Color::Red
            } else {
                Color::White
            };
            table.add_row(vec![
                Cell::new(term).fg(color),
                Cell::new(format!("{:.3}", entry.gvif))
                    .set_alignment(CellAlignment::Right)
                    .fg(color),
                Cell::new(entry.df).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.3}", entry.adjusted)).set_alignment(CellAlignment::Right),
            ]);
        }
        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}
