//! Output formatting utilities

use advisor_lib::{Category, UnitFailure};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Print table rows, or the underlying records as JSON.
pub fn print_records<R: Tabled, T: Serialize>(
    rows: Vec<R>,
    records: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
    }
    Ok(())
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print every failed unit to stderr.
pub fn print_failures(failures: &[UnitFailure]) {
    if failures.is_empty() {
        return;
    }
    print_warning(&format!("{} unit(s) could not be evaluated:", failures.len()));
    for failure in failures {
        print_error(&failure.to_string());
    }
}

/// Color a category by how much action it implies
pub fn color_category(category: Category) -> String {
    let label = category.as_str();
    match category {
        Category::UnusedResource
        | Category::UnusedStorage
        | Category::UnusedServiceDecommissioning
        | Category::ComputeInstanceDecommissioning
        | Category::ComputeInstanceIdle => label.red().to_string(),
        Category::OldSnapshot | Category::ComputeInstanceWithoutMonitoring => {
            label.yellow().to_string()
        }
        _ => label.blue().to_string(),
    }
}

/// Truncate long OCIDs for table display
pub fn short_id(id: &str) -> String {
    const KEEP: usize = 12;
    match id.rsplit_once('.') {
        Some((_, tail)) if tail.len() > KEEP && tail.is_ascii() => format!("…{}", &tail[tail.len() - KEEP..]),
        _ => id.to_string(),
    }
}
