//! Cascaded session-aware resampler for cascata.
//!
//! Each timeframe consumes the committed output of its source series and
//! produces its own append-only bucket series:
//!
//! - [`Resampler`] - one (symbol, timeframe) resampling unit
//! - [`ResampleOutcome`] - what one batch consumed and produced

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bucket;
mod resampler;

pub use resampler::{ResampleOutcome, Resampler};
