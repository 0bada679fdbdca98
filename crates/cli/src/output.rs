//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use pushengage_e2e::{TestResult, TestStatus, TestSuiteResult};
use serde::Serialize;

use crate::generator::GenerationReport;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<Cell>;
}

impl TableDisplay for TestResult {
    fn headers() -> Vec<&'static str> {
        vec!["Suite", "Test", "Status", "Found", "Attempts", "Duration"]
    }

    fn row(&self) -> Vec<Cell> {
        let color = match self.status {
            TestStatus::Passed => Color::Green,
            TestStatus::Flaky => Color::Yellow,
            TestStatus::Failed => Color::Red,
            TestStatus::Skipped => Color::DarkGrey,
        };
        vec![
            Cell::new(&self.suite),
            Cell::new(&self.name),
            Cell::new(self.status.as_str()).fg(color),
            Cell::new(format!("{}/{}", self.found, self.min_found)),
            Cell::new(self.attempts),
            Cell::new(format!("{} ms", self.duration_ms)),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for (header, value) in T::headers().iter().zip(item.row().iter()) {
                    println!("{}: {}", header, value.content());
                }
            }
        }
    }
}

/// Results table followed by the totals line
pub fn print_run_summary(results: &TestSuiteResult, format: OutputFormat) {
    print_list(&results.results, format);
    if !matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        return;
    }

    println!();
    println!(
        "{} passed, {} flaky, {} failed, {} skipped in {:.1}s",
        results.passed.to_string().green(),
        results.flaky.to_string().yellow(),
        results.failed.to_string().red(),
        results.skipped.to_string().dimmed(),
        results.duration_ms as f64 / 1000.0
    );
    for result in results.results.iter().filter(|r| r.status == TestStatus::Failed) {
        if let Some(shot) = &result.screenshot {
            println!("  {} › {}: {}", result.suite, result.name, shot.display());
        }
    }
}

pub fn print_generation_summary(report: &GenerationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report).unwrap_or_default()),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(report).unwrap_or_default()),
        OutputFormat::Table | OutputFormat::Plain => {
            for path in report.written.iter().chain(&report.readmes) {
                println!("  {}", path.display());
            }
            println!();
            println!("Total tests:     {}", report.total);
            println!("Completed:       {}", report.completed.to_string().green());
            println!("Remaining:       {}", report.remaining.to_string().yellow());
            println!("Files written:   {}", report.written.len());
            println!("READMEs written: {}", report.readmes.len());
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
