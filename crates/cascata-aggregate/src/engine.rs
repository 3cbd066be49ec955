//! The aggregation batch: day files in, continuous minute series out.

use cascata_store::{
    Cursor, RECORD_SIZE, SeriesFile, layout, read_committed, read_cursor, write_cursor,
};
use cascata_types::{BarRecord, CascataError, Result, Symbol};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

/// What one aggregation batch consumed and produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// Minute records appended to the Aggregate Series.
    pub appended: usize,
    /// Zero-volume filler rows dropped before commit.
    pub fillers_dropped: usize,
    /// The committed cursor after the batch.
    pub cursor: Cursor,
}

/// Runs one aggregation batch for a symbol.
///
/// Reads day files past the stored cursor, drops zero-volume filler rows,
/// validates strictly increasing timestamps, and appends to the minute
/// series. Each day commits independently: append, fsync, then the atomic
/// pointer write, so a long backlog never buffers more than one day.
///
/// The live (latest) day stops at its first filler row: the source
/// rewrites the file without fillers at finalization, shifting every row
/// at or past that point, so the cursor must not advance across them.
///
/// A batch with nothing new writes nothing and leaves series and pointer
/// byte-identical.
///
/// # Errors
///
/// Fatal on out-of-order source rows, pointer corruption, or I/O failure;
/// days committed before the failure remain durable, nothing of the
/// failed day survives.
pub fn aggregate_symbol(data_dir: &Path, symbol: &Symbol) -> Result<AggregateOutcome> {
    let series_path = layout::series_file(data_dir, symbol, layout::MINUTE_SERIES_ID);
    let pointer_path = layout::pointer_file(data_dir, symbol, layout::MINUTE_SERIES_ID);

    let cursor = read_cursor(&pointer_path)?;
    let mut series = SeriesFile::open(&series_path)?;
    recover_series(&mut series, &cursor)?;

    let days = list_day_files(data_dir, symbol)?;
    let unchanged = AggregateOutcome {
        appended: 0,
        fillers_dropped: 0,
        cursor,
    };
    let Some(&live_day) = days.last() else {
        return Ok(unchanged);
    };

    let mut prev_ts = last_committed_ts(&series_path, cursor.out_pos)?;
    let mut appended = 0usize;
    let mut fillers_dropped = 0usize;
    let mut committed = cursor;

    for &day in &days {
        if committed.last_date.is_some_and(|d| day < d) {
            continue;
        }
        let start = if committed.last_date == Some(day) {
            committed.in_pos
        } else {
            0
        };

        let day_path = layout::day_file(data_dir, symbol, day);
        let day_len = fs::metadata(&day_path)?.len();
        if start > day_len {
            return Err(CascataError::IndexCorruption {
                path: pointer_path,
                reason: format!(
                    "in_pos {start} past day file '{}' length {day_len}",
                    day_path.display()
                ),
            });
        }

        let records = read_committed(&day_path, start, day_len)?;
        let is_live = day == live_day;
        let series_name = format!("{symbol}/days/{}", day.format("%Y%m%d"));
        let mut out: Vec<BarRecord> = Vec::new();
        let mut consumed = 0usize;

        for (i, record) in records.iter().enumerate() {
            let filler = record.volume <= 0.0;
            // The live day's layout is only stable up to its first filler;
            // finalization removes fillers and shifts every later row.
            if filler && is_live {
                break;
            }
            if record.timestamp_ms <= prev_ts {
                return Err(CascataError::SourceOrdering {
                    series: series_name,
                    prev_ms: prev_ts,
                    next_ms: record.timestamp_ms,
                });
            }
            prev_ts = record.timestamp_ms;

            if filler {
                fillers_dropped += 1;
            } else {
                out.push(*record);
            }
            consumed = i + 1;
        }

        let mut next = committed;
        next.last_date = Some(day);
        next.in_pos = start + (consumed * RECORD_SIZE) as u64;
        if !out.is_empty() {
            next.out_pos = series.append(&out)?;
            series.sync()?;
            appended += out.len();
        }
        if next != committed {
            write_cursor(&pointer_path, &next)?;
            committed = next;
        }
    }

    if committed != cursor {
        tracing::debug!(
            symbol = %symbol,
            appended,
            fillers = fillers_dropped,
            "aggregation batch committed"
        );
    }

    Ok(AggregateOutcome {
        appended,
        fillers_dropped,
        cursor: committed,
    })
}

/// Drops uncommitted bytes left by a write that began but never committed.
fn recover_series(series: &mut SeriesFile, cursor: &Cursor) -> Result<()> {
    let len = series.len()?;
    if len > cursor.out_pos {
        tracing::warn!(
            path = %series.path().display(),
            len,
            out_pos = cursor.out_pos,
            "truncating uncommitted series tail"
        );
        series.truncate_to(cursor.out_pos)?;
    } else if len < cursor.out_pos {
        return Err(CascataError::IndexCorruption {
            path: series.path().to_path_buf(),
            reason: format!("series length {len} below committed out_pos {}", cursor.out_pos),
        });
    }
    Ok(())
}

/// Timestamp of the last committed record, or `i64::MIN` for an empty series.
fn last_committed_ts(series_path: &Path, out_pos: u64) -> Result<i64> {
    if out_pos < RECORD_SIZE as u64 {
        return Ok(i64::MIN);
    }
    let last = read_committed(series_path, out_pos - RECORD_SIZE as u64, out_pos)?;
    Ok(last[0].timestamp_ms)
}

/// Lists a symbol's day files, ascending by date.
fn list_day_files(data_dir: &Path, symbol: &Symbol) -> Result<Vec<NaiveDate>> {
    let dir = layout::days_dir(data_dir, symbol);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut days = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        match name.to_str().and_then(layout::parse_day_file_name) {
            Some(date) => days.push(date),
            None => {
                tracing::debug!(file = ?name, "ignoring non-day file in days directory");
            }
        }
    }
    days.sort_unstable();
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bar(ts: i64, volume: f64) -> BarRecord {
        BarRecord::new(ts, 1.0, 2.0, 0.5, 1.5, volume)
    }

    fn write_day(dir: &Path, symbol: &Symbol, date: (i32, u32, u32), bars: &[BarRecord]) {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let mut day = SeriesFile::open(layout::day_file(dir, symbol, date)).unwrap();
        day.truncate_to(0).unwrap();
        day.append(bars).unwrap();
        day.sync().unwrap();
    }

    fn read_series(dir: &Path, symbol: &Symbol) -> Vec<BarRecord> {
        let path = layout::series_file(dir, symbol, layout::MINUTE_SERIES_ID);
        let len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        read_committed(&path, 0, len).unwrap()
    }

    const MIN: i64 = 60_000;

    #[test]
    fn test_merges_days_in_order() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");

        write_day(dir.path(), &symbol, (2024, 3, 14), &[bar(MIN, 1.0), bar(2 * MIN, 2.0)]);
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(1441 * MIN, 3.0)]);

        let outcome = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(outcome.appended, 3);
        assert_eq!(
            outcome.cursor.last_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(outcome.cursor.out_pos, 3 * RECORD_SIZE as u64);

        let series = read_series(dir.path(), &symbol);
        assert_eq!(series.len(), 3);
        assert_eq!(series[2].timestamp_ms, 1441 * MIN);
    }

    #[test]
    fn test_live_day_trailing_fillers_left_unconsumed() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");

        write_day(
            dir.path(),
            &symbol,
            (2024, 3, 15),
            &[bar(MIN, 1.0), bar(2 * MIN, 2.0), bar(3 * MIN, 0.0), bar(4 * MIN, 0.0)],
        );

        let outcome = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(outcome.appended, 2);
        // Live-day fillers are deferred until finalization, not dropped.
        assert_eq!(outcome.fillers_dropped, 0);
        assert_eq!(outcome.cursor.in_pos, 2 * RECORD_SIZE as u64);
    }

    #[test]
    fn test_live_day_interior_filler_survives_finalization() {
        // A filler between real rows of the live day: the source removes
        // it at finalization, shifting the later rows left. The cursor
        // must not have advanced past the filler's original offset.
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(
            dir.path(),
            &symbol,
            (2024, 3, 15),
            &[bar(MIN, 1.0), bar(2 * MIN, 0.0), bar(3 * MIN, 2.0)],
        );

        let first = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(first.appended, 1);
        assert_eq!(first.cursor.in_pos, RECORD_SIZE as u64);

        // Finalized without the filler, plus a row that arrived late.
        write_day(
            dir.path(),
            &symbol,
            (2024, 3, 15),
            &[bar(MIN, 1.0), bar(3 * MIN, 2.0), bar(4 * MIN, 3.0)],
        );
        write_day(dir.path(), &symbol, (2024, 3, 18), &[bar(1441 * MIN, 4.0)]);

        let second = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(second.appended, 3);
        assert_eq!(
            read_series(dir.path(), &symbol)
                .iter()
                .map(|b| b.timestamp_ms)
                .collect::<Vec<_>>(),
            vec![MIN, 3 * MIN, 4 * MIN, 1441 * MIN]
        );
    }

    #[test]
    fn test_finalized_day_consumed_fully() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");

        // Day 1 ends with a filler; day 2 exists, so day 1 is finalized.
        write_day(dir.path(), &symbol, (2024, 3, 14), &[bar(MIN, 1.0), bar(2 * MIN, 0.0)]);
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(1441 * MIN, 3.0)]);

        let outcome = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(outcome.appended, 2);
        assert_eq!(outcome.fillers_dropped, 1);
        assert_eq!(outcome.cursor.in_pos, RECORD_SIZE as u64);
    }

    #[test]
    fn test_idempotent_rerun() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(MIN, 1.0), bar(2 * MIN, 2.0)]);

        let first = aggregate_symbol(dir.path(), &symbol).unwrap();
        let series_path = layout::series_file(dir.path(), &symbol, layout::MINUTE_SERIES_ID);
        let bytes_after_first = fs::read(&series_path).unwrap();

        let second = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(second.appended, 0);
        assert_eq!(second.cursor, first.cursor);
        assert_eq!(fs::read(&series_path).unwrap(), bytes_after_first);
    }

    #[test]
    fn test_resume_after_day_gains_rows() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(MIN, 1.0)]);
        aggregate_symbol(dir.path(), &symbol).unwrap();

        // The live day grows.
        write_day(
            dir.path(),
            &symbol,
            (2024, 3, 15),
            &[bar(MIN, 1.0), bar(2 * MIN, 2.0)],
        );
        let outcome = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(outcome.appended, 1);

        let series = read_series(dir.path(), &symbol);
        assert_eq!(
            series.iter().map(|b| b.timestamp_ms).collect::<Vec<_>>(),
            vec![MIN, 2 * MIN]
        );
    }

    #[test]
    fn test_out_of_order_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(2 * MIN, 1.0), bar(MIN, 1.0)]);

        let err = aggregate_symbol(dir.path(), &symbol).unwrap_err();
        assert!(matches!(err, CascataError::SourceOrdering { .. }));

        // Nothing was committed.
        let pointer_path = layout::pointer_file(dir.path(), &symbol, layout::MINUTE_SERIES_ID);
        assert_eq!(read_cursor(&pointer_path).unwrap(), Cursor::zero());
    }

    #[test]
    fn test_failure_keeps_prior_days_committed() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 14), &[bar(MIN, 1.0)]);
        write_day(
            dir.path(),
            &symbol,
            (2024, 3, 15),
            &[bar(3 * MIN, 1.0), bar(2 * MIN, 1.0)],
        );

        let err = aggregate_symbol(dir.path(), &symbol).unwrap_err();
        assert!(matches!(err, CascataError::SourceOrdering { .. }));

        // Day 14 committed before day 15 failed; day 15 left no trace.
        let pointer_path = layout::pointer_file(dir.path(), &symbol, layout::MINUTE_SERIES_ID);
        let cursor = read_cursor(&pointer_path).unwrap();
        assert_eq!(cursor.last_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(cursor.out_pos, RECORD_SIZE as u64);
        assert_eq!(read_series(dir.path(), &symbol).len(), 1);
    }

    #[test]
    fn test_crash_recovery_truncates_uncommitted_tail() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(MIN, 1.0)]);
        let first = aggregate_symbol(dir.path(), &symbol).unwrap();

        // Simulate a crash: bytes appended past the committed out_pos.
        let series_path = layout::series_file(dir.path(), &symbol, layout::MINUTE_SERIES_ID);
        let mut series = SeriesFile::open(&series_path).unwrap();
        series.append(&[bar(99 * MIN, 9.0)]).unwrap();
        drop(series);

        let second = aggregate_symbol(dir.path(), &symbol).unwrap();
        assert_eq!(second.appended, 0);
        assert_eq!(second.cursor, first.cursor);
        assert_eq!(
            fs::metadata(&series_path).unwrap().len(),
            first.cursor.out_pos
        );
    }

    #[test]
    fn test_missing_series_below_out_pos_is_corruption() {
        let dir = TempDir::new().unwrap();
        let symbol = Symbol::new("eurusd");
        write_day(dir.path(), &symbol, (2024, 3, 15), &[bar(MIN, 1.0)]);
        aggregate_symbol(dir.path(), &symbol).unwrap();

        // The committed series vanishes out from under the pointer.
        fs::remove_file(layout::series_file(dir.path(), &symbol, layout::MINUTE_SERIES_ID))
            .unwrap();

        let err = aggregate_symbol(dir.path(), &symbol).unwrap_err();
        assert!(matches!(err, CascataError::IndexCorruption { .. }));
    }
}
