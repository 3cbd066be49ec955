//! Session and bucket-origin resolution for the cascata engine.
//!
//! This crate answers one question: for a given symbol and UTC instant,
//! which configured trading session applies, and where is the bucket
//! origin anchor in the symbol's local wall-clock frame?
//!
//! - [`SessionResolver`] - immutable per-run resolver (built once,
//!   explicitly passed; no process-wide state)
//! - [`SymbolSessions`] - a symbol's timezone and session lists per scope
//! - [`Resolved`] - the resolution result consumed by the resampler

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod resolver;

pub use resolver::{MS_PER_DAY, Resolved, SessionResolver, SymbolSessions};
