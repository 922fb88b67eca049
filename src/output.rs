//! Output formatting and styling module.
//!
//! Everything the operator sees on the terminal goes through
//! [`OutputFormatter`]: colored status lines, the copy progress bar and the
//! per-group summary table.

use crate::grouping::Grouping;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use batchsort::output::OutputFormatter;
    /// OutputFormatter::success("Copied 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar counting finished copies.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use batchsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the number of entries per group, in group order, and a total.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use batchsort::grouping::Grouping;
    /// use batchsort::output::OutputFormatter;
    ///
    /// let mut grouping = Grouping::new();
    /// grouping.push("csv", "csv_data1.csv");
    /// grouping.push("csv", "csv_data2.csv");
    /// OutputFormatter::summary_table(&grouping);
    /// ```
    pub fn summary_table(grouping: &Grouping) {
        Self::header("SUMMARY");

        let width = grouping
            .keys()
            .map(|key| display_key(key).chars().count())
            .max()
            .unwrap_or(0)
            .max(5); // "Group"

        println!("{:<width$} | {}", "Group".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));

        for (key, names) in grouping {
            println!(
                "{:<width$} | {} {}",
                display_key(key),
                names.len().to_string().green(),
                file_word(names.len()),
                width = width
            );
        }

        let total = grouping.entry_count();
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            file_word(total),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn display_key(key: &str) -> &str {
    if key.is_empty() { "\"\"" } else { key }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_word() {
        assert_eq!(file_word(1), "file");
        assert_eq!(file_word(0), "files");
        assert_eq!(file_word(7), "files");
    }

    #[test]
    fn test_display_key_for_empty_group() {
        assert_eq!(display_key(""), "\"\"");
        assert_eq!(display_key("csv"), "csv");
    }

    #[test]
    fn test_progress_bar_length() {
        let pb = OutputFormatter::create_progress_bar(5);
        assert_eq!(pb.length(), Some(5));
    }
}
