//! Crash-safe binary storage for the cascata bar aggregation engine.
//!
//! This crate owns everything that touches series bytes on disk:
//!
//! - [`encode_record`] / [`decode_record`] / [`decode_records`] - the
//!   64-byte fixed-layout OHLCV codec
//! - [`Cursor`], [`read_cursor`], [`write_cursor`] - the pointer/index
//!   store with atomic tmp+fsync+rename commit
//! - [`SeriesFile`], [`read_committed`] - append-only series files and
//!   zero-copy reads bounded by the committed pointer

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]

mod codec;
mod cursor;
pub mod layout;
mod series;

pub use codec::{CodecError, RECORD_SIZE, decode_record, decode_records, encode_record};
pub use cursor::{CURSOR_SIZE, Cursor, LEGACY_CURSOR_SIZE, read_cursor, write_cursor};
pub use series::{SeriesFile, read_committed};
