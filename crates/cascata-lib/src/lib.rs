//! Incremental OHLCV bar aggregation and cascaded resampling.
//!
//! This is a facade crate that re-exports functionality from the cascata
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```no_run
//! use cascata_lib::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let config = RunConfig::from_json_file(Path::new("cascata.json"))?;
//!     let report = run(&config, None)?;
//!     println!(
//!         "committed {} minute and {} resampled records",
//!         report.minute_appended, report.resampled_appended
//!     );
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use cascata_types::*;

// Re-export the storage layer
pub use cascata_store::{
    CURSOR_SIZE, Cursor, RECORD_SIZE, SeriesFile, decode_record, decode_records, encode_record,
    layout, read_committed, read_cursor, write_cursor,
};

// Re-export session resolution
pub use cascata_session::{Resolved, SessionResolver, SymbolSessions};

// Re-export aggregation
pub use cascata_aggregate::{AggregateOutcome, aggregate_symbol};

// Re-export resampling
pub use cascata_resample::{ResampleOutcome, Resampler};

// Re-export the pipeline coordinator
pub use cascata_pipeline::{
    PipelineLock, RunConfig, RunReport, SeriesStatus, SymbolConfig, rebuild, run, status,
};

/// Prelude module for convenient imports.
///
/// ```
/// use cascata_lib::prelude::*;
/// ```
pub mod prelude {
    pub use cascata_types::{
        BarRecord, BucketRule, CalendarRule, CascataError, Edge, Result, Session, Symbol,
        SymbolOverride, TimeframeDef,
    };

    pub use cascata_aggregate::aggregate_symbol;
    pub use cascata_pipeline::{RunConfig, rebuild, run, status};
    pub use cascata_resample::Resampler;
    pub use cascata_session::{SessionResolver, SymbolSessions};
}
