//! Terminal output helpers

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use testloom_core::report::ReportSummary;

/// Formatted output for the `testloom` commands
#[derive(Debug, Clone, Copy)]
pub struct Console {
    verbose: bool,
}

impl Console {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Only shown with `--verbose`
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count()).dimmed());
    }

    /// Row counter for synthesis; hidden in verbose mode where rows are logged
    pub fn progress(&self, total: usize, label: &str) -> ProgressBar {
        if self.verbose {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} rows ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(label.to_string());
        bar
    }

    pub fn summary(&self, summary: &ReportSummary) {
        let failed = if summary.failed > 0 {
            summary.failed.to_string().red().bold()
        } else {
            summary.failed.to_string().green()
        };
        println!(
            "  {} checks, {} passed, {} failed ({:.1}% pass rate)",
            summary.total.to_string().bold(),
            summary.passed.to_string().green(),
            failed,
            summary.pass_rate() * 100.0
        );
    }
}
