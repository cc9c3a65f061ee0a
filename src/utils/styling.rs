//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

use crate::cli::AnalysisConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██████╗ ██████╗ ███████╗███╗   ███╗██╗ █████╗
    ██╔══██╗██╔══██╗██╔════╝████╗ ████║██║██╔══██╗
    ██████╔╝██████╔╝█████╗  ██╔████╔██║██║███████║
    ██╔═══╝ ██╔══██╗██╔══╝  ██║╚██╔╝██║██║██╔══██║
    ██║     ██║  ██║███████╗██║ ╚═╝ ██║██║██║  ██║
    ╚═╝     ╚═╝  ╚═╝╚══════╝╚═╝     ╚═╝╚═╝╚═╝  ╚═╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {} {}",
        style("β").magenta().bold(),
        style("Premium regression, one step at a time").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(config: &AnalysisConfig) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Source: {:<39}│",
        FOLDER,
        truncate_string(&config.source.location(), 38)
    );
    println!(
        "    │  {} As of:  {:<39}│",
        CALENDAR,
        config.as_of.format("%Y-%m-%d").to_string()
    );
    println!(
        "    │  {} Output: {:<39}│",
        SAVE,
        truncate_path(&config.output_dir, 38)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Categories: {:<35}│",
        TARGET,
        truncate_string(
            &format!("top {} of {}", config.top_categories, config.category_column),
            34
        )
    );
    println!(
        "    │  {} Models:     {:<35}│",
        CHART,
        style(format!("{} formula(s)", config.models.len())).yellow()
    );
    println!(
        "    │  {} VIF threshold:         {:<24}│",
        CHART,
        style(format!("{:.1}", config.vif_threshold)).yellow()
    );
    println!(
        "    │  {} Correlation threshold: {:<24}│",
        CHART,
        style(format!("{:.2}", config.correlation_threshold)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARNING, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Premia analysis complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    if let Some(info) = threshold_info {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

/// Print an indented bullet line
pub fn print_bullet(message: &str) {
    println!("        {} {}", style("•").dim(), message);
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
