//! Core types for the cascata bar aggregation engine.
//!
//! This crate provides the fundamental data structures used throughout
//! cascata:
//!
//! - [`Symbol`] - Instrument identifier scoping all per-instrument state
//! - [`BarRecord`] - A single OHLCV bar
//! - [`TimeframeDef`] - A timeframe with its bucketing rule and cascade source
//! - [`Session`] - A trading session with origin anchor and era validity
//! - [`CascataError`] - The run-fatal error taxonomy

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod error;
mod session;
mod symbol;
mod timeframe;

pub use bar::BarRecord;
pub use error::{CascataError, Result};
pub use session::{DstShift, Session, SessionScope};
pub use symbol::{Symbol, SymbolParseError};
pub use timeframe::{BucketRule, CalendarRule, Edge, SymbolOverride, TimeframeDef};
