//! Pointer/index store: the persisted per-series cursor.
//!
//! A cursor records how far a consumer has durably processed its source
//! (`in_pos`) and how much of its own output is committed (`out_pos`).
//! Writes go through a sibling temporary file, fsync, and an atomic rename,
//! so at any crash instant the on-disk pointer is wholly the previous or
//! wholly the new value.
//!
//! Callers must append and fsync series data *before* writing the cursor;
//! that ordering guarantees `out_pos` never claims more data as safe than
//! physically exists.

use byteorder::{ByteOrder, LittleEndian};
use cascata_types::{CascataError, Result};
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Size in bytes of the current cursor layout.
pub const CURSOR_SIZE: usize = 24;

/// Size in bytes of the legacy cursor layout (`in_pos`, `out_pos` only).
pub const LEGACY_CURSOR_SIZE: usize = 16;

/// A persisted consumption/production cursor for one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Date of the last consumed source record (YYYYMMDD on disk).
    /// `None` for cursors read from the legacy 16-byte layout.
    pub last_date: Option<NaiveDate>,
    /// Byte offset consumed from the source.
    pub in_pos: u64,
    /// Committed byte length of the output series.
    pub out_pos: u64,
}

impl Cursor {
    /// The zero cursor: nothing consumed, nothing produced.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            last_date: None,
            in_pos: 0,
            out_pos: 0,
        }
    }

    /// Creates a cursor with all fields set.
    #[must_use]
    pub const fn new(last_date: Option<NaiveDate>, in_pos: u64, out_pos: u64) -> Self {
        Self {
            last_date,
            in_pos,
            out_pos,
        }
    }
}

/// Reads a cursor from disk.
///
/// An absent file yields [`Cursor::zero`]. A 16-byte file is the legacy
/// layout with an unknown `last_date`; it is upgraded to the 24-byte
/// layout on the next write.
///
/// # Errors
///
/// Returns [`CascataError::IndexCorruption`] for any other file size or an
/// undecodable date field; this is fatal to the run.
pub fn read_cursor(path: &Path) -> Result<Cursor> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Cursor::zero()),
        Err(e) => return Err(e.into()),
    };

    match data.len() {
        LEGACY_CURSOR_SIZE => Ok(Cursor {
            last_date: None,
            in_pos: LittleEndian::read_u64(&data[0..8]),
            out_pos: LittleEndian::read_u64(&data[8..16]),
        }),
        CURSOR_SIZE => {
            let raw_date = LittleEndian::read_i32(&data[0..4]);
            let last_date = decode_date(raw_date).map_err(|reason| {
                CascataError::IndexCorruption {
                    path: path.to_path_buf(),
                    reason,
                }
            })?;
            Ok(Cursor {
                last_date,
                in_pos: LittleEndian::read_u64(&data[8..16]),
                out_pos: LittleEndian::read_u64(&data[16..24]),
            })
        }
        other => Err(CascataError::IndexCorruption {
            path: path.to_path_buf(),
            reason: format!("invalid size {other} (expected {LEGACY_CURSOR_SIZE} or {CURSOR_SIZE})"),
        }),
    }
}

/// Writes a cursor to disk through the atomic-swap protocol.
///
/// Always serializes the 24-byte layout, silently upgrading legacy
/// pointers. The live file is never edited in place.
///
/// # Errors
///
/// Returns [`CascataError::Write`] if the temporary file cannot be
/// written, fsynced, or renamed over the live path.
pub fn write_cursor(path: &Path, cursor: &Cursor) -> Result<()> {
    let mut buf = [0u8; CURSOR_SIZE];
    LittleEndian::write_i32(&mut buf[0..4], encode_date(cursor.last_date));
    // bytes 4..8 stay zero (padding)
    LittleEndian::write_u64(&mut buf[8..16], cursor.in_pos);
    LittleEndian::write_u64(&mut buf[16..24], cursor.out_pos);

    let tmp = path.with_extension("tmp");
    let write_err = |source| CascataError::Write {
        path: tmp.clone(),
        source,
    };

    let mut file = fs::File::create(&tmp).map_err(write_err)?;
    file.write_all(&buf).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(|source| CascataError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes a date as YYYYMMDD, with 0 meaning unknown.
fn encode_date(date: Option<NaiveDate>) -> i32 {
    date.map_or(0, |d| d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32)
}

/// Decodes a YYYYMMDD integer; 0 means unknown.
fn decode_date(raw: i32) -> std::result::Result<Option<NaiveDate>, String> {
    if raw == 0 {
        return Ok(None);
    }
    let year = raw / 10_000;
    let month = (raw / 100 % 100) as u32;
    let day = (raw % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| format!("invalid date field {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cursor_path(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("5m.ptr")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_absent_file_is_zero_cursor() {
        let dir = TempDir::new().unwrap();
        let cursor = read_cursor(&cursor_path(&dir)).unwrap();
        assert_eq!(cursor, Cursor::zero());
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);
        let cursor = Cursor::new(Some(date(2024, 3, 15)), 6400, 1280);

        write_cursor(&path, &cursor).unwrap();
        assert_eq!(read_cursor(&path).unwrap(), cursor);
        assert_eq!(fs::metadata(&path).unwrap().len(), CURSOR_SIZE as u64);
    }

    #[test]
    fn test_legacy_16_byte_layout() {
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);

        let mut raw = [0u8; LEGACY_CURSOR_SIZE];
        LittleEndian::write_u64(&mut raw[0..8], 4096);
        LittleEndian::write_u64(&mut raw[8..16], 2048);
        fs::write(&path, raw).unwrap();

        let cursor = read_cursor(&path).unwrap();
        assert_eq!(cursor.last_date, None);
        assert_eq!(cursor.in_pos, 4096);
        assert_eq!(cursor.out_pos, 2048);
    }

    #[test]
    fn test_legacy_upgrades_on_write() {
        // Scenario C: one write cycle upgrades a legacy pointer to 24
        // bytes with positions preserved and last_date populated.
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);

        let mut raw = [0u8; LEGACY_CURSOR_SIZE];
        LittleEndian::write_u64(&mut raw[0..8], 4096);
        LittleEndian::write_u64(&mut raw[8..16], 2048);
        fs::write(&path, raw).unwrap();

        let mut cursor = read_cursor(&path).unwrap();
        cursor.last_date = Some(date(2024, 3, 15));
        write_cursor(&path, &cursor).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), CURSOR_SIZE as u64);
        let upgraded = read_cursor(&path).unwrap();
        assert_eq!(upgraded.last_date, Some(date(2024, 3, 15)));
        assert_eq!(upgraded.in_pos, 4096);
        assert_eq!(upgraded.out_pos, 2048);
    }

    #[test]
    fn test_invalid_size_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);
        fs::write(&path, [0u8; 20]).unwrap();

        let err = read_cursor(&path).unwrap_err();
        assert!(matches!(err, CascataError::IndexCorruption { .. }));
    }

    #[test]
    fn test_invalid_date_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);

        let mut raw = [0u8; CURSOR_SIZE];
        LittleEndian::write_i32(&mut raw[0..4], 20_241_399); // month 13
        fs::write(&path, raw).unwrap();

        let err = read_cursor(&path).unwrap_err();
        assert!(matches!(err, CascataError::IndexCorruption { .. }));
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = cursor_path(&dir);
        write_cursor(&path, &Cursor::zero()).unwrap();
        assert!(!path.with_extension("tmp").exists());
    }
}
