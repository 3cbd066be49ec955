//! Directory contract for series, pointer, and day files.
//!
//! One Aggregate Series plus pointer per symbol, one Resample Series plus
//! pointer per (symbol, timeframe), upstream day files under `days/`:
//!
//! ```text
//! <data_dir>/<symbol>/days/YYYYMMDD.bin   upstream minute-bar day files
//! <data_dir>/<symbol>/1m.bin  + 1m.ptr    Aggregate Series
//! <data_dir>/<symbol>/<tf>.bin + <tf>.ptr Resample Series per timeframe
//! ```

use cascata_types::Symbol;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Series id of the minute Aggregate Series.
pub const MINUTE_SERIES_ID: &str = "1m";

/// Returns a symbol's data directory.
#[must_use]
pub fn symbol_dir(data_dir: &Path, symbol: &Symbol) -> PathBuf {
    data_dir.join(symbol.as_str())
}

/// Returns a symbol's upstream day-file directory.
#[must_use]
pub fn days_dir(data_dir: &Path, symbol: &Symbol) -> PathBuf {
    symbol_dir(data_dir, symbol).join("days")
}

/// Returns the day file for one (symbol, date).
#[must_use]
pub fn day_file(data_dir: &Path, symbol: &Symbol, date: NaiveDate) -> PathBuf {
    days_dir(data_dir, symbol).join(format!("{}.bin", date.format("%Y%m%d")))
}

/// Returns the series file for one (symbol, series id).
#[must_use]
pub fn series_file(data_dir: &Path, symbol: &Symbol, series_id: &str) -> PathBuf {
    symbol_dir(data_dir, symbol).join(format!("{series_id}.bin"))
}

/// Returns the pointer file for one (symbol, series id).
#[must_use]
pub fn pointer_file(data_dir: &Path, symbol: &Symbol, series_id: &str) -> PathBuf {
    symbol_dir(data_dir, symbol).join(format!("{series_id}.ptr"))
}

/// Parses a day-file name (`YYYYMMDD.bin`) into its date.
#[must_use]
pub fn parse_day_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".bin")?;
    if stem.len() != 8 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}
