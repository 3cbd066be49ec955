//! Instrument identifiers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// An instrument identifier (e.g., "eurusd", "xauusd").
///
/// Symbols scope all per-instrument configuration and series state. They
/// are stored lowercase; directory and file names derive from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol, normalizing to lowercase.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error for invalid symbol identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolParseError {
    /// The identifier was empty.
    #[error("Symbol identifier must not be empty")]
    Empty,

    /// The identifier contained a path separator or other illegal character.
    #[error("Symbol identifier contains illegal character: {0:?}")]
    IllegalChar(char),
}

impl FromStr for Symbol {
    type Err = SymbolParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SymbolParseError::Empty);
        }
        // Symbols become directory names; keep them path-safe.
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
            return Err(SymbolParseError::IllegalChar(c));
        }
        Ok(Self::new(s))
    }
}
