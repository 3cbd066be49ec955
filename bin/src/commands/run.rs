//! Incremental pipeline run command.

use crate::display;
use anyhow::{Context, Result};
use cascata_lib::RunConfig;
use std::path::Path;

/// Execute the run command.
pub(crate) fn run(config_path: &Path, threads: Option<usize>, quiet: bool) -> Result<()> {
    let config = RunConfig::from_json_file(config_path)
        .with_context(|| format!("Failed to load configuration '{}'", config_path.display()))?;

    let spinner = display::spinner(quiet, "Running pipeline...");
    let report = cascata_lib::run(&config, threads).context("Pipeline run failed")?;
    spinner.finish_and_clear();

    if !quiet {
        display::print_report(&report);
    }
    Ok(())
}
