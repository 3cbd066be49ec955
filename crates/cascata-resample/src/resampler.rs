//! Incremental cascaded resampling.
//!
//! A [`Resampler`] consumes the committed range of one source series and
//! maintains one Resample Series plus pointer. Its commit protocol keeps
//! the output byte-identical to a from-scratch rebuild:
//!
//! - `in_pos` always points at the first source record of the still-open
//!   logical unit (the open bucket, or the open bucket's predecessor when
//!   the open bucket carries a ghost label that will fold backwards). Every
//!   batch re-reads and re-folds that unit in full, so committed records
//!   are never rewritten in place.
//! - The open unit is appended past `out_pos` as a single ephemeral
//!   trailing record. It is visible to readers who choose to look beyond
//!   the pointer, and is dropped and recomputed on the next batch.

use crate::bucket::{self, BucketBounds};
use cascata_session::{Resolved, SessionResolver, SymbolSessions};
use cascata_store::layout::{self, MINUTE_SERIES_ID};
use cascata_store::{Cursor, RECORD_SIZE, SeriesFile, read_committed, read_cursor, write_cursor};
use cascata_types::{BarRecord, CascataError, Edge, Result, Symbol, SymbolOverride, TimeframeDef};
use chrono::DateTime;
use std::path::Path;

/// Result of one resampling run for one (symbol, timeframe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleOutcome {
    /// Closed records committed during this run.
    pub appended: usize,
    /// Ghost buckets folded into their predecessors.
    pub ghosts_merged: usize,
    /// The cursor after the run.
    pub cursor: Cursor,
}

/// One bucket being accumulated from source records.
struct Bucket {
    bounds: BucketBounds,
    /// Local-minus-UTC offset of the bucket's first record, used to map
    /// the labeled boundary back to UTC.
    offset_ms: i64,
    /// Byte offset of the bucket's first source record.
    first_offset: u64,
    ghost: bool,
    bar: BarRecord,
}

/// Resamples one source series into one timeframe for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct Resampler<'a> {
    data_dir: &'a Path,
    symbol: &'a Symbol,
    timeframe: &'a TimeframeDef,
    resolver: &'a SessionResolver,
    sessions: &'a SymbolSessions,
    overrides: &'a SymbolOverride,
}

impl<'a> Resampler<'a> {
    /// Creates a resampler over an existing data directory.
    #[must_use]
    pub const fn new(
        data_dir: &'a Path,
        symbol: &'a Symbol,
        timeframe: &'a TimeframeDef,
        resolver: &'a SessionResolver,
        sessions: &'a SymbolSessions,
        overrides: &'a SymbolOverride,
    ) -> Self {
        Self {
            data_dir,
            symbol,
            timeframe,
            resolver,
            sessions,
            overrides,
        }
    }

    /// The series id this resampler consumes.
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.timeframe.source.as_deref().unwrap_or(MINUTE_SERIES_ID)
    }

    fn source_name(&self) -> String {
        format!("{}/{}", self.symbol.as_str(), self.source_id())
    }

    /// Consumes newly committed source records and commits the resampled
    /// output in batches.
    ///
    /// Each batch appends the newly closed buckets, fsyncs, and commits the
    /// cursor; the open unit is then re-appended as the ephemeral trailing
    /// record. Running again without new source data is a no-op on the
    /// committed bytes.
    ///
    /// # Errors
    ///
    /// Fails on session resolution ambiguity, out-of-order source records,
    /// a ghost bucket with no predecessor, pointer corruption, or I/O
    /// failure. Nothing past the last committed batch survives a failure.
    pub fn run(&self) -> Result<ResampleOutcome> {
        let src_path = layout::series_file(self.data_dir, self.symbol, self.source_id());
        let src_out = read_cursor(&layout::pointer_file(
            self.data_dir,
            self.symbol,
            self.source_id(),
        ))?
        .out_pos;

        let out_ptr = layout::pointer_file(self.data_dir, self.symbol, &self.timeframe.id);
        let stored = read_cursor(&out_ptr)?;
        if src_out <= stored.in_pos {
            return Ok(ResampleOutcome {
                appended: 0,
                ghosts_merged: 0,
                cursor: stored,
            });
        }

        let out_path = layout::series_file(self.data_dir, self.symbol, &self.timeframe.id);
        let mut series = SeriesFile::open(&out_path)?;
        let len = series.len()?;
        if len < stored.out_pos {
            return Err(CascataError::IndexCorruption {
                path: out_ptr.clone(),
                reason: format!(
                    "out_pos {} exceeds series length {len}",
                    stored.out_pos
                ),
            });
        }
        // Drop the previous ephemeral tail and any uncommitted append.
        if len > stored.out_pos {
            series.truncate_to(stored.out_pos)?;
        }

        // A zero batch could never make progress; one record is the floor.
        let batch = self
            .overrides
            .batch_size
            .map_or(u64::MAX, |records| (records as u64).max(1));
        let mut chunk_records = batch;
        let mut cursor = stored;
        let mut appended = 0usize;
        let mut ghosts_merged = 0usize;
        let mut tail: Option<Bucket> = None;

        loop {
            let span = chunk_records.saturating_mul(RECORD_SIZE as u64);
            let chunk_end = src_out.min(cursor.in_pos.saturating_add(span));
            let records = read_committed(&src_path, cursor.in_pos, chunk_end)?;

            // Seed the ordering check from the record just before the
            // cursor, so corruption at in_pos between runs cannot pass as
            // a fresh chunk with no predecessor.
            let prev_ms = if cursor.in_pos >= RECORD_SIZE as u64 {
                let at = cursor.in_pos - RECORD_SIZE as u64;
                Some(read_committed(&src_path, at, cursor.in_pos)?[0].timestamp_ms)
            } else {
                None
            };

            let (buckets, last_ms) = self.build_buckets(&records, cursor.in_pos, prev_ms)?;
            let mut folded = self.fold_ghosts(buckets, &mut ghosts_merged)?;
            let open = folded.pop().expect("non-empty chunk yields a bucket");

            let progressed = !folded.is_empty();
            if progressed {
                let bars: Vec<BarRecord> = folded.iter().map(|b| self.emit(b)).collect();
                cursor.out_pos = series.append(&bars)?;
                series.sync()?;
                appended += bars.len();
            }
            cursor.in_pos = open.first_offset;
            cursor.last_date = Some(
                DateTime::from_timestamp_millis(last_ms)
                    .expect("record timestamp out of range")
                    .date_naive(),
            );
            if cursor != stored {
                write_cursor(&out_ptr, &cursor)?;
            }
            tail = Some(open);

            if chunk_end >= src_out {
                break;
            }
            // A single open unit can outgrow the batch; widen until it
            // either closes or the source is exhausted.
            chunk_records = if progressed {
                batch
            } else {
                chunk_records.saturating_mul(2)
            };
        }

        if let Some(open) = tail {
            series.append(&[self.emit(&open)])?;
            series.sync()?;
        }

        tracing::debug!(
            symbol = %self.symbol,
            timeframe = %self.timeframe.id,
            appended,
            ghosts_merged,
            in_pos = cursor.in_pos,
            out_pos = cursor.out_pos,
            "resample batch committed"
        );

        Ok(ResampleOutcome {
            appended,
            ghosts_merged,
            cursor,
        })
    }

    /// Groups ordered source records into per-bucket accumulators.
    fn build_buckets(
        &self,
        records: &[BarRecord],
        base: u64,
        mut prev_ms: Option<i64>,
    ) -> Result<(Vec<Bucket>, i64)> {
        let mut buckets: Vec<Bucket> = Vec::new();
        let mut last_ms = 0;

        for (i, record) in records.iter().enumerate() {
            if let Some(prev) = prev_ms {
                if record.timestamp_ms <= prev {
                    return Err(CascataError::SourceOrdering {
                        series: self.source_name(),
                        prev_ms: prev,
                        next_ms: record.timestamp_ms,
                    });
                }
            }
            prev_ms = Some(record.timestamp_ms);
            last_ms = record.timestamp_ms;

            let resolved = self.resolver.resolve(self.sessions, record.timestamp_ms)?;
            let bounds = self.bounds_for(&resolved);

            match buckets.last_mut() {
                Some(last) if bounds.start_local == last.bounds.start_local => {
                    last.bar.merge_from(record);
                }
                Some(last) if bounds.start_local < last.bounds.start_local => {
                    return Err(CascataError::ConfigResolution(format!(
                        "bucket regression in {}: start {} precedes open bucket {}",
                        self.source_name(),
                        bounds.start_local,
                        last.bounds.start_local
                    )));
                }
                _ => {
                    let ghost = resolved
                        .session
                        .ghost_label
                        .is_some_and(|t| t == bucket::start_time_of_day(bounds.start_local));
                    buckets.push(Bucket {
                        bounds,
                        offset_ms: resolved.offset_ms,
                        first_offset: base + (i * RECORD_SIZE) as u64,
                        ghost,
                        bar: *record,
                    });
                }
            }
        }

        Ok((buckets, last_ms))
    }

    fn bounds_for(&self, resolved: &Resolved<'_>) -> BucketBounds {
        bucket::bucket_for(
            &self.timeframe.rule,
            self.timeframe.closed,
            resolved.session.origin,
            resolved.origin_local_ms,
            resolved.local_ms,
        )
    }

    /// Folds ghost-labeled buckets into their predecessors.
    ///
    /// The `in_pos` invariant guarantees a ghost's predecessor is always in
    /// the same chunk; a ghost with none is a configuration defect.
    fn fold_ghosts(&self, buckets: Vec<Bucket>, merged: &mut usize) -> Result<Vec<Bucket>> {
        let mut folded: Vec<Bucket> = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            if bucket.ghost {
                match folded.last_mut() {
                    Some(prev) => {
                        prev.bar.merge_from(&bucket.bar);
                        *merged += 1;
                    }
                    None => {
                        return Err(CascataError::GhostMergeAmbiguity {
                            series: self.source_name(),
                            bucket_ms: bucket.bounds.start_local - bucket.offset_ms,
                        });
                    }
                }
            } else {
                folded.push(bucket);
            }
        }
        Ok(folded)
    }

    /// Produces the stored record for a bucket: labeled boundary converted
    /// back to UTC, prices rounded per the symbol override.
    fn emit(&self, bucket: &Bucket) -> BarRecord {
        let label_local = match self.timeframe.label {
            Edge::Left => bucket.bounds.start_local,
            Edge::Right => bucket.bounds.end_local,
        };
        let mut bar = bucket.bar;
        bar.timestamp_ms = label_local - bucket.offset_ms;
        if let Some(decimals) = self.overrides.round_decimals {
            bar.round_prices(decimals);
        }
        bar
    }
}
