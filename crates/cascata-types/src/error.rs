//! Error types for cascata.
//!
//! Every variant here is fatal to the whole pipeline invocation, not just
//! the affected symbol: a configuration or schema defect is assumed
//! systemic, so the coordinator aborts rather than silently skipping one
//! symbol. No partial output is ever committed before an error surfaces.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cascata operations.
pub type Result<T> = std::result::Result<T, CascataError>;

/// Errors that can occur during aggregation and resampling.
#[derive(Error, Debug)]
pub enum CascataError {
    /// Session/timeframe configuration does not resolve cleanly: no session
    /// matches an instant, two match simultaneously, or the cascade chain
    /// is self-contradictory.
    #[error("Config resolution error: {0}")]
    ConfigResolution(String),

    /// A source series delivered a duplicate or out-of-order timestamp,
    /// which implies upstream corruption.
    #[error(
        "Out-of-order source record in {series}: {next_ms} does not follow {prev_ms}"
    )]
    SourceOrdering {
        /// The series that produced the bad record.
        series: String,
        /// Timestamp of the last valid record (epoch ms).
        prev_ms: i64,
        /// Offending timestamp (epoch ms).
        next_ms: i64,
    },

    /// A pointer file is unreadable or has an impossible size.
    #[error("Corrupt pointer file '{path}': {reason}")]
    IndexCorruption {
        /// Path of the pointer file.
        path: PathBuf,
        /// What made it unreadable.
        reason: String,
    },

    /// An append or fsync failed.
    #[error("Write failure on '{path}': {source}")]
    Write {
        /// Path of the file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A declared ghost bucket has no preceding bucket to merge into.
    #[error("Ghost bucket at {bucket_ms} in {series} has no preceding bucket to merge into")]
    GhostMergeAmbiguity {
        /// The series being resampled.
        series: String,
        /// The ghost bucket's start (epoch ms).
        bucket_ms: i64,
    },

    /// Another live process holds the data-directory lock.
    #[error("Data directory is locked by running process {pid} ({path})")]
    Locked {
        /// Path of the lock file.
        path: PathBuf,
        /// Process id recorded in the lock file.
        pid: u32,
    },

    /// A record buffer had an invalid length.
    #[error("Record codec error: {0}")]
    Codec(String),

    /// Generic I/O error not tied to a series write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document could not be deserialized.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
