//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use forecast_lib::predictor::{decision_label, ReorderDecision};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color pipeline and classifier states
pub fn color_status(status: &str) -> String {
    match status {
        "ready" | "trained" | "healthy" => status.green().to_string(),
        "loadingCatalog" | "training" => status.blue().to_string(),
        "catalogLoaded" => status.cyan().to_string(),
        "degraded" => status.yellow().to_string(),
        "error" | "failed" | "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// `Reorder (83%)` in red, `No Reorder (12%)` in green, `Train model` dimmed
pub fn color_decision(probability: Option<f64>) -> String {
    let label = decision_label(probability);
    match probability.map(ReorderDecision::from_probability) {
        Some(ReorderDecision::Reorder) => label.red().bold().to_string(),
        Some(ReorderDecision::NoReorder) => label.green().to_string(),
        None => label.dimmed().to_string(),
    }
}

/// Format an optional numeric attribute; absent or unparseable shows `-`
pub fn format_quantity(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            if v.fract() == 0.0 {
                format!("{:.0}", v)
            } else {
                format!("{:.2}", v)
            }
        }
        _ => "-".to_string(),
    }
}

/// Format a ratio as a percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
