//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use risk_lib::{ModelFamily, Outcome, ResultSet};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Pretty-print any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Target rows by family columns
pub fn results_table(results: &ResultSet, families: &[ModelFamily]) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["Target".to_string()];
    header.extend(families.iter().map(|f| f.to_string()));
    builder.push_record(header);

    for record in results {
        let mut row = vec![record.target.clone()];
        row.extend(
            families
                .iter()
                .map(|&f| record.outcome(f).map(color_outcome).unwrap_or_default()),
        );
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
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

/// Positive risk in red, negative in green, gaps dimmed
pub fn color_outcome(outcome: &Outcome) -> String {
    let text = outcome.to_string();
    match outcome {
        Outcome::Label(1) => text.red().bold().to_string(),
        Outcome::Label(_) => text.green().to_string(),
        Outcome::NotAvailable => text.dimmed().to_string(),
        Outcome::Error(_) => text.red().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" | "yes" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" | "no" => status.red().to_string(),
        _ => status.to_string(),
    }
}
