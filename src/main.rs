//! Premia: Insurance Premium Regression CLI
//!
//! Loads a policy dataset, explores it, fits a sequence of ordinary least
//! squares models and reports their diagnostics.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::DataFrame;

use premia::cli::{confirm_next_model, AnalysisConfig, Cli};
use premia::pipeline::{
    self, clean_dataset, correlation_matrix, default_cooks_threshold, estimated_memory_mb,
    find_correlated_pairs, load_dataset, log_column_name, log_transform, mean_center,
    nested_f_test, reduce_categories, AnalysisError, Formula, ModelFit,
};
use premia::plots::{plot_diagnostics, plot_exploratory};
use premia::report::{
    export_analysis, package_reports, AnalysisExport, AnalysisMetadata, DiagnosticsReport,
    ExportParams, ModelComparison, ModelReport, NestedComparison, BUNDLE_FILE, REPORT_FILE,
};
use premia::utils::{
    create_spinner, finish_with_error, finish_with_success, finish_with_warning, print_banner,
    print_bullet, print_completion, print_config, print_count, print_info, print_step_header,
    print_step_time, print_success, print_warning,
};

/// A fitted model and the label it is reported under
struct FittedModel {
    label: String,
    fit: ModelFit,
}

/// Models fitted so far, with their reports and nested comparisons
#[derive(Default)]
struct ModelSequence {
    fitted: Vec<FittedModel>,
    reports: Vec<ModelReport>,
    comparison: ModelComparison,
}

impl ModelSequence {
    fn next_label(&self) -> String {
        format!("Model {}", self.fitted.len() + 1)
    }

    /// Ask before every model but the first. Returns false when the analyst stops.
    fn proceed(&self, config: &AnalysisConfig, formula: &Formula) -> Result<bool> {
        if !config.confirm || self.fitted.is_empty() {
            return Ok(true);
        }
        confirm_next_model(&self.next_label(), &formula.to_string())
    }

    /// Fit `formula` on `data`, print its report and record it
    fn fit(&mut self, data: &DataFrame, formula: &Formula) -> Result<()> {
        let label = self.next_label();
        let spinner = create_spinner(&format!("Fitting {}...", label));
        let fit = match pipeline::fit(data, formula) {
            Ok(fit) => fit,
            Err(e) => {
                finish_with_error(&spinner, &format!("{} could not be fitted", label));
                return Err(e).with_context(|| format!("Failed to fit {}: {}", label, formula));
            }
        };
        let omitted = fit.omitted_rows();
        if omitted > 0 {
            finish_with_warning(
                &spinner,
                &format!("{} fitted, {} incomplete row(s) omitted", label, omitted),
            );
        } else {
            finish_with_success(&spinner, &format!("{} fitted", label));
        }

        let report = ModelReport::from_fit(&label, &fit);
        report.display();

        if let Some(previous) = self.fitted.last() {
            if previous.fit.formula.is_nested_in(&fit.formula) {
                match nested_f_test(&previous.fit, &fit) {
                    Ok(test) => {
                        print_info(&format!(
                            "{} vs {}: F = {:.4} on {} and {} df, p = {:.4e}",
                            previous.label,
                            label,
                            test.f_statistic,
                            test.df_numerator,
                            test.df_denominator,
                            test.p_value
                        ));
                        self.comparison.add_nested(NestedComparison {
                            reduced: previous.label.clone(),
                            full: label.clone(),
                            test,
                        });
                    }
                    Err(AnalysisError::Config(reason)) => {
                        print_info(&format!("No F test for {}: {}", label, reason))
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        self.comparison.add_model(&report);
        self.reports.push(report);
        self.fitted.push(FittedModel { label, fit });
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config().context("Invalid configuration")?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let mut charts: Vec<PathBuf> = Vec::new();

    // Step 1: Load
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let location = config.source.location();
    let spinner = create_spinner(&format!("Loading {}...", location));
    let raw = match load_dataset(&config.source, config.infer_schema_length) {
        Ok(df) => df,
        Err(e) => {
            finish_with_error(&spinner, "Dataset could not be loaded");
            return Err(e).with_context(|| format!("Failed to load {}", location));
        }
    };
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", raw.height());
    println!("      Columns: {}", raw.width());
    println!("      Estimated memory: {:.2} MB", estimated_memory_mb(&raw));
    print_step_time(step_start.elapsed());

    // Step 2: Clean
    print_step_header(2, "Clean and Derive Age");
    let step_start = Instant::now();
    let cleaned = clean_dataset(&raw, config.as_of).context("Failed to clean dataset")?;
    let dropped = raw.width().saturating_sub(cleaned.width());
    print_success(&format!(
        "Ages derived as of {}",
        config.as_of.format("%Y-%m-%d")
    ));
    if dropped > 0 {
        print_info(&format!("Dropped {} premium-adjacent column(s)", dropped));
    }
    print_step_time(step_start.elapsed());

    // Step 3: Explore
    print_step_header(3, "Exploratory Analysis");
    let step_start = Instant::now();
    let matrix = correlation_matrix(&cleaned).context("Failed to compute correlations")?;
    let correlated_pairs = find_correlated_pairs(&matrix, config.correlation_threshold);
    if !matrix.sparse_columns.is_empty() {
        print_warning(&format!(
            "Missing values in {}; their correlations use pairwise-complete rows",
            matrix.sparse_columns.join(", ")
        ));
    }
    let response = config.response();
    let with_response = matrix.with_column(response);
    if !with_response.is_empty() {
        println!(
            "\n    {} Correlation with {} ({} complete rows):",
            style("✧").cyan(),
            response,
            matrix.n_rows
        );
        for (name, r) in &with_response {
            print_bullet(&format!("{}: {:+.3}", name, r));
        }
    }
    if correlated_pairs.is_empty() {
        print_info("No strongly correlated numeric pairs");
    } else {
        print_count(
            "correlated pair(s)",
            correlated_pairs.len(),
            Some(&format!("(|r| > {:.2})", config.correlation_threshold)),
        );
        for pair in &correlated_pairs {
            print_bullet(&format!(
                "{} ~ {}: r = {:.3}",
                pair.feature1, pair.feature2, pair.correlation
            ));
        }
    }
    if config.plots {
        let spinner = create_spinner("Drawing exploratory charts...");
        let written = plot_exploratory(&cleaned, &config.exploratory_pairs(), &config.output_dir)
            .context("Failed to draw exploratory charts")?;
        finish_with_success(&spinner, &format!("{} exploratory chart(s) written", written.len()));
        charts.extend(written);
    }
    print_step_time(step_start.elapsed());

    // Step 4: Reduce categories
    print_step_header(4, "Category Reduction");
    let step_start = Instant::now();
    let reduction = reduce_categories(&cleaned, &config.category_column, config.top_categories)
        .with_context(|| format!("Failed to reduce '{}'", config.category_column))?;
    print_success(&format!(
        "Kept the top {} level(s) of {}",
        reduction.retained.len(),
        config.category_column
    ));
    for level in &reduction.retained {
        print_bullet(&format!("{}: {} row(s)", level.level, level.count));
    }
    if reduction.dropped_rows > 0 {
        print_info(&format!("Excluded {} row(s)", reduction.dropped_rows));
    }
    print_step_time(step_start.elapsed());

    // Step 5: Fit the model sequence
    print_step_header(5, "Model Fitting");
    let step_start = Instant::now();
    let mut models = ModelSequence::default();
    let mut stopped = false;
    for formula in &config.models {
        if !models.proceed(&config, formula)? {
            print_info("Model sequence stopped");
            stopped = true;
            break;
        }
        models.fit(&reduction.data, formula)?;
    }
    print_step_time(step_start.elapsed());

    // Step 6: Remediate and refit the last model
    let remediate = config.log_response || !config.center.is_empty();
    if remediate && !stopped {
        if let Some(base) = config.models.last() {
            print_step_header(6, "Remediation");
            let step_start = Instant::now();
            remediate_and_refit(&config, base, &reduction.data, &mut models)?;
            print_step_time(step_start.elapsed());
        }
    }

    // Step 7: Diagnostics
    print_step_header(7, "Diagnostics");
    let step_start = Instant::now();
    let diagnostics = match models.fitted.last() {
        Some(last) => {
            let report = DiagnosticsReport::from_fit(
                &last.label,
                &last.fit,
                config.cooks_threshold,
                config.vif_threshold,
            )
            .with_context(|| format!("Failed to diagnose {}", last.label))?;
            report.display();
            if !report.influential_observations.is_empty() {
                print_warning(&format!(
                    "{} influential observation(s) in {}",
                    report.influential_observations.len(),
                    last.label
                ));
            }
            if !report.high_vif_terms.is_empty() {
                print_warning(&format!(
                    "Collinear terms (VIF > {:.1}): {}",
                    config.vif_threshold,
                    report.high_vif_terms.join(", ")
                ));
            }
            Some(report)
        }
        None => {
            print_info("No model was fitted");
            None
        }
    };
    if config.plots {
        charts.extend(write_diagnostic_charts(&config, &models.fitted)?);
    }
    print_step_time(step_start.elapsed());

    // Step 8: Report
    print_step_header(8, "Report");
    let step_start = Instant::now();
    let as_of = config.as_of.format("%Y-%m-%d").to_string();
    let export = AnalysisExport {
        metadata: AnalysisMetadata::new(&ExportParams {
            source: &location,
            as_of: &as_of,
            category_column: &config.category_column,
            top_categories: config.top_categories,
            rows_loaded: raw.height(),
            rows_after_reduction: reduction.data.height(),
        }),
        correlated_pairs,
        retained_categories: reduction.retained.clone(),
        models: models.reports,
        nested_comparisons: models.comparison.nested.clone(),
        diagnostics,
        charts: charts.iter().map(|p| file_name(p)).collect(),
    };

    let report_path = config.output_dir.join(REPORT_FILE);
    export_analysis(&export, &report_path)?;
    print_success(&format!("Report written to {}", report_path.display()));

    if config.bundle {
        let mut files = vec![report_path];
        files.extend(charts.iter().cloned());
        let zip_path = config.output_dir.join(BUNDLE_FILE);
        package_reports(&files, &zip_path)?;
        print_success(&format!("Bundle written to {}", zip_path.display()));
    }
    print_step_time(step_start.elapsed());

    models.comparison.display();
    print_completion();

    Ok(())
}

/// Refit the last model on the log response and/or with centered predictors
fn remediate_and_refit(
    config: &AnalysisConfig,
    base: &Formula,
    data: &DataFrame,
    models: &mut ModelSequence,
) -> Result<()> {
    let mut data = data.clone();
    let mut formula = base.clone();

    if config.log_response {
        data = log_transform(&data, &formula.response)
            .with_context(|| format!("Failed to log-transform '{}'", formula.response))?;
        formula = formula.with_response(&log_column_name(&formula.response));
        print_success(&format!("Response replaced by {}", formula.response));
        if !models.proceed(config, &formula)? {
            print_info("Remediation stopped");
            return Ok(());
        }
        models.fit(&data, &formula)?;
    }

    if !config.center.is_empty() {
        data = mean_center(&data, &config.center).context("Failed to center predictors")?;
        print_success(&format!("Centered {}", config.center.join(", ")));
        if !models.proceed(config, &formula)? {
            print_info("Remediation stopped");
            return Ok(());
        }
        models.fit(&data, &formula)?;
    }

    Ok(())
}

/// QQ, residuals-vs-fitted and Cook's distance charts for every fitted model
fn write_diagnostic_charts(config: &AnalysisConfig, fitted: &[FittedModel]) -> Result<Vec<PathBuf>> {
    let spinner = create_spinner("Drawing diagnostic charts...");
    let mut written = Vec::new();
    for (i, model) in fitted.iter().enumerate() {
        let threshold = config
            .cooks_threshold
            .unwrap_or_else(|| default_cooks_threshold(&model.fit));
        let paths = plot_diagnostics(
            &model.fit,
            threshold,
            &config.output_dir,
            &format!("model{}", i + 1),
        )
        .with_context(|| format!("Failed to draw diagnostics for {}", model.label))?;
        written.extend(paths);
    }
    finish_with_success(&spinner, &format!("{} diagnostic chart(s) written", written.len()));
    Ok(written)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
