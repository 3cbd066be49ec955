//! CLI command implementations.

pub(crate) mod rebuild;
pub(crate) mod run;
pub(crate) mod status;
