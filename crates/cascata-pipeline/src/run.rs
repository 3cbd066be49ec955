//! The pipeline coordinator.
//!
//! One run takes the data-directory lock, aggregates every symbol's day
//! files into its minute series, then walks the timeframe cascade level by
//! level. Symbols parallelize freely inside a level; levels are a barrier,
//! so each timeframe only ever reads a fully committed source.

use crate::config::{RunConfig, SymbolConfig};
use crate::lock::PipelineLock;
use cascata_aggregate::aggregate_symbol;
use cascata_resample::Resampler;
use cascata_session::SessionResolver;
use cascata_store::layout::{self, MINUTE_SERIES_ID};
use cascata_store::{RECORD_SIZE, read_cursor};
use cascata_types::{CascataError, Result, Symbol};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fs;

/// Totals for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Symbols processed.
    pub symbols: usize,
    /// Minute records appended across all symbols.
    pub minute_appended: usize,
    /// Zero-volume filler records dropped across all symbols.
    pub fillers_dropped: usize,
    /// Resampled records committed across all (symbol, timeframe) pairs.
    pub resampled_appended: usize,
    /// Ghost buckets folded across all (symbol, timeframe) pairs.
    pub ghosts_merged: usize,
}

/// Committed state of one series, as reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesStatus {
    /// The owning symbol.
    pub symbol: Symbol,
    /// Series id (`1m` or a timeframe id).
    pub series_id: String,
    /// Committed record count.
    pub records: u64,
    /// Date of the last consumed source record, when known.
    pub last_date: Option<NaiveDate>,
}

/// Runs the full pipeline described by a configuration.
///
/// # Errors
///
/// Fails if the lock is contended, the configuration does not validate,
/// or any stage fails for any symbol. The first failure aborts the run;
/// per-series commits that already happened remain durable.
pub fn run(config: &RunConfig, threads: Option<usize>) -> Result<RunReport> {
    config.validate()?;
    let _lock = PipelineLock::acquire(&config.data_dir)?;
    run_locked(config, threads)
}

/// The run body; the caller holds the data-directory lock.
fn run_locked(config: &RunConfig, threads: Option<usize>) -> Result<RunReport> {
    let order = config.cascade_order()?;
    let pool = build_pool(threads)?;
    let resolver = config.resolver();
    let mut report = RunReport {
        symbols: config.symbols.len(),
        ..RunReport::default()
    };

    tracing::info!(
        symbols = config.symbols.len(),
        timeframes = order.len(),
        "pipeline run starting"
    );

    let aggregated: Vec<_> = pool.install(|| {
        config
            .symbols
            .par_iter()
            .map(|sym| {
                aggregate_symbol(&config.data_dir, &sym.symbol).map_err(|e| {
                    tracing::error!(symbol = %sym.symbol, stage = "aggregate", error = %e, "stage failed");
                    e
                })
            })
            .collect::<Result<_>>()
    })?;
    for outcome in &aggregated {
        report.minute_appended += outcome.appended;
        report.fillers_dropped += outcome.fillers_dropped;
    }

    for timeframe in order {
        let outcomes: Vec<_> = pool.install(|| {
            config
                .symbols
                .par_iter()
                .filter(|sym| !sym.overrides.skips(&timeframe.id))
                .map(|sym| resample_one(config, &resolver, sym, timeframe))
                .collect::<Result<_>>()
        })?;
        for outcome in &outcomes {
            report.resampled_appended += outcome.appended;
            report.ghosts_merged += outcome.ghosts_merged;
        }
    }

    tracing::info!(
        minute_appended = report.minute_appended,
        resampled_appended = report.resampled_appended,
        ghosts_merged = report.ghosts_merged,
        "pipeline run finished"
    );
    Ok(report)
}

/// Deletes derived series and pointers, then runs the pipeline.
///
/// With `symbol = Some(..)` only that symbol's derived state is deleted;
/// other symbols just advance incrementally. Upstream day files are never
/// touched; the minute series and all timeframe series are rebuilt from
/// them. The commit protocol makes the rebuilt bytes identical to what
/// incremental runs would have produced.
///
/// The data-directory lock is held from the first deletion through the
/// end of the run.
///
/// # Errors
///
/// Fails if the named symbol is not configured, the lock is contended, a
/// derived file cannot be deleted, or the subsequent run fails.
pub fn rebuild(config: &RunConfig, symbol: Option<&Symbol>, threads: Option<usize>) -> Result<RunReport> {
    config.validate()?;
    if let Some(symbol) = symbol {
        if !config.symbols.iter().any(|s| s.symbol == *symbol) {
            return Err(CascataError::ConfigResolution(format!(
                "symbol '{symbol}' is not configured"
            )));
        }
    }
    // One lock spans deletion and the subsequent run; nothing else may
    // start against half-rebuilt state in between.
    let _lock = PipelineLock::acquire(&config.data_dir)?;
    let mut deleted = 0usize;
    for sym in &config.symbols {
        if symbol.is_some_and(|s| *s != sym.symbol) {
            continue;
        }
        for id in series_ids(config) {
            remove_if_exists(&layout::series_file(&config.data_dir, &sym.symbol, id))?;
            remove_if_exists(&layout::pointer_file(&config.data_dir, &sym.symbol, id))?;
        }
        deleted += 1;
    }
    tracing::info!(symbols = deleted, "derived series deleted");
    run_locked(config, threads)
}

/// Reports the committed state of every configured series.
///
/// Reads only pointer files; safe to call while a run is in progress.
///
/// # Errors
///
/// Fails on a corrupt pointer file.
pub fn status(config: &RunConfig) -> Result<Vec<SeriesStatus>> {
    let mut statuses = Vec::new();
    for sym in &config.symbols {
        for id in series_ids(config) {
            let cursor = read_cursor(&layout::pointer_file(&config.data_dir, &sym.symbol, id))?;
            statuses.push(SeriesStatus {
                symbol: sym.symbol.clone(),
                series_id: id.to_string(),
                records: cursor.out_pos / RECORD_SIZE as u64,
                last_date: cursor.last_date,
            });
        }
    }
    Ok(statuses)
}

fn resample_one(
    config: &RunConfig,
    resolver: &SessionResolver,
    sym: &SymbolConfig,
    timeframe: &cascata_types::TimeframeDef,
) -> Result<cascata_resample::ResampleOutcome> {
    let sessions = RunConfig::symbol_sessions(sym);
    Resampler::new(
        &config.data_dir,
        &sym.symbol,
        timeframe,
        resolver,
        &sessions,
        &sym.overrides,
    )
    .run()
    .map_err(|e| {
        tracing::error!(
            symbol = %sym.symbol,
            stage = "resample",
            timeframe = %timeframe.id,
            error = %e,
            "stage failed"
        );
        e
    })
}

fn series_ids(config: &RunConfig) -> impl Iterator<Item = &str> {
    std::iter::once(MINUTE_SERIES_ID).chain(config.timeframes.iter().map(|tf| tf.id.as_str()))
}

fn build_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let available = num_cpus::get();
    let threads = threads.map_or(available, |t| t.clamp(1, available));
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| CascataError::ConfigResolution(format!("cannot build worker pool: {e}")))
}

fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
