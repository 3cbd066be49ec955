//! Rebuild command: recompute derived series from the day files.

use crate::display;
use anyhow::{Context, Result};
use cascata_lib::{RunConfig, Symbol};
use inquire::Confirm;
use std::path::Path;

/// Execute the rebuild command.
pub(crate) fn rebuild(
    config_path: &Path,
    symbol: Option<&str>,
    threads: Option<usize>,
    yes: bool,
    quiet: bool,
) -> Result<()> {
    let config = RunConfig::from_json_file(config_path)
        .with_context(|| format!("Failed to load configuration '{}'", config_path.display()))?;
    let symbol: Option<Symbol> = symbol
        .map(|s| s.parse().context("Invalid symbol"))
        .transpose()?;

    if !yes {
        let scope = symbol
            .as_ref()
            .map_or_else(|| "all derived series".to_string(), |s| format!("'{s}'"));
        let prompt = format!(
            "Delete {scope} under '{}' and recompute from the day files?",
            config.data_dir.display()
        );
        let confirmed = Confirm::new(&prompt)
            .with_default(false)
            .prompt()
            .context("Confirmation prompt failed")?;
        if !confirmed {
            println!("Rebuild cancelled.");
            return Ok(());
        }
    }

    let spinner = display::spinner(quiet, "Rebuilding series...");
    let report =
        cascata_lib::rebuild(&config, symbol.as_ref(), threads).context("Rebuild failed")?;
    spinner.finish_and_clear();

    if !quiet {
        display::print_report(&report);
    }
    Ok(())
}
