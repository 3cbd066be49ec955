//! Run configuration and the parallel pipeline coordinator for cascata.
//!
//! - [`RunConfig`] - the JSON run configuration and its validation
//! - [`run`] / [`rebuild`] / [`status`] - the pipeline entry points
//! - [`PipelineLock`] - the advisory data-directory lock

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cascata-dev/cascata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod lock;
mod run;

pub use config::{RunConfig, SymbolConfig};
pub use lock::PipelineLock;
pub use run::{RunReport, SeriesStatus, rebuild, run, status};
