//! Series status command.

use crate::display;
use anyhow::{Context, Result};
use cascata_lib::RunConfig;
use std::path::Path;

/// Execute the status command.
pub(crate) fn status(config_path: &Path) -> Result<()> {
    let config = RunConfig::from_json_file(config_path)
        .with_context(|| format!("Failed to load configuration '{}'", config_path.display()))?;

    let statuses = cascata_lib::status(&config).context("Failed to read series state")?;
    display::print_statuses(&statuses);
    Ok(())
}
