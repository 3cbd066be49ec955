//! Minute-bar aggregation engine for cascata.
//!
//! This crate merges the upstream per-day minute files into the single
//! continuous, append-only minute series per symbol:
//!
//! - [`aggregate_symbol`] - run one aggregation batch for a symbol
//! - [`AggregateOutcome`] - what the batch consumed and produced

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;

pub use engine::{AggregateOutcome, aggregate_symbol};
