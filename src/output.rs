//! Console rendering of run notifications.
//!
//! Provides the sink the CLI host plugs into a run: status lines with
//! consistent styling, a progress bar driven by percent events, and a
//! summary table once the run finishes.

use crate::engine::RunSummary;
use crate::notify::{Event, NotificationSink};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Renders run events on the terminal.
///
/// Status text starting with "Error" is shown red; everything else plain.
/// Progress events drive a percentage bar, and the finished event clears
/// the bar and prints the summary table.
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}%")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        Self { bar }
    }

    /// Prints the run summary as a small table.
    fn print_summary(summary: &RunSummary) {
        if let Some(message) = &summary.fatal_error {
            eprintln!("{} {}", "✗".red(), message.red());
            return;
        }

        if summary.cancelled {
            println!("{} {}", "⚠".yellow(), "Run stopped before completion.".yellow());
        }

        println!("\n{}", "SUMMARY".bold());
        let rows = [
            ("Moved", summary.moved),
            ("Unmatched", summary.unmatched),
            ("Filtered out", summary.rejected),
            ("Skipped", summary.skipped),
            ("Failed", summary.failed),
        ];
        for (label, count) in rows {
            let count = if label == "Failed" && count > 0 {
                count.to_string().red().to_string()
            } else {
                count.to_string().green().to_string()
            };
            println!("{:<14} | {}", label, count);
        }
        println!("{}", "-".repeat(22));
        println!(
            "{:<14} | {} of {}",
            "Processed".bold(),
            summary.processed.to_string().green().bold(),
            summary.total
        );
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, event: Event) {
        match event {
            Event::Status(message) => {
                if message.starts_with("Error") {
                    self.bar.println(format!("{} {}", "✗".red(), message.red()));
                } else {
                    self.bar.println(message);
                }
            }
            Event::Progress(percent) => self.bar.set_position(u64::from(percent)),
            Event::Finished(summary) => {
                self.bar.finish_and_clear();
                Self::print_summary(&summary);
            }
        }
    }
}
