//! Output formatting for the cascata CLI.

use cascata_lib::{RunReport, SeriesStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates a steady-tick spinner, or a hidden one in quiet mode.
pub(crate) fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .expect("spinner template is valid"),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Prints the totals of a pipeline run.
pub(crate) fn print_report(report: &RunReport) {
    println!("Processed {} symbols", report.symbols);
    println!(
        "  minute records appended:    {:>10}",
        report.minute_appended
    );
    println!(
        "  filler records dropped:     {:>10}",
        report.fillers_dropped
    );
    println!(
        "  resampled records committed:{:>10}",
        report.resampled_appended
    );
    if report.ghosts_merged > 0 {
        println!(
            "  ghost buckets folded:       {:>10}",
            report.ghosts_merged
        );
    }
}

/// Prints a table of per-series committed state.
pub(crate) fn print_statuses(statuses: &[SeriesStatus]) {
    if statuses.is_empty() {
        println!("No series configured.");
        return;
    }

    println!("{:<12} {:<8} {:>12}  {}", "SYMBOL", "SERIES", "RECORDS", "LAST DATE");
    for status in statuses {
        println!(
            "{:<12} {:<8} {:>12}  {}",
            status.symbol,
            status.series_id,
            status.records,
            status
                .last_date
                .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string())
        );
    }
}
