//! Run configuration: the JSON document driving one pipeline invocation.

use cascata_session::{SessionResolver, SymbolSessions};
use cascata_store::layout::MINUTE_SERIES_ID;
use cascata_types::{
    BucketRule, CascataError, DstShift, Result, Session, Symbol, SymbolOverride, TimeframeDef,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-symbol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    /// The instrument identifier.
    pub symbol: Symbol,
    /// The symbol's IANA timezone.
    pub timezone: Tz,
    /// Symbol-scope sessions.
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Session-scope overrides, scanned before `sessions`.
    #[serde(default)]
    pub session_overrides: Vec<Session>,
    /// Resampling overrides (rounding, batching, skipped timeframes).
    #[serde(default)]
    pub overrides: SymbolOverride,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the per-symbol data directories.
    pub data_dir: PathBuf,
    /// Timezone whose UTC offset keys the DST shift table.
    pub reference_timezone: Tz,
    /// DST shift table entries.
    #[serde(default)]
    pub dst_shifts: Vec<DstShift>,
    /// Session used when no configured session matches an instant.
    pub fallback_session: Session,
    /// Global default session list (least specific scope).
    #[serde(default)]
    pub default_sessions: Vec<Session>,
    /// The timeframe cascade.
    pub timeframes: Vec<TimeframeDef>,
    /// Symbols to process.
    pub symbols: Vec<SymbolConfig>,
}

impl RunConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails [`Self::validate`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`CascataError::ConfigResolution`] on duplicate, empty,
    /// path-unsafe, or zero-length timeframe ids, a timeframe id clashing
    /// with the minute series, duplicate symbols, a zero batch size, or a
    /// cascade that does not form valid chains.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for tf in &self.timeframes {
            if tf.id == MINUTE_SERIES_ID {
                return Err(CascataError::ConfigResolution(format!(
                    "timeframe id '{MINUTE_SERIES_ID}' is reserved for the minute series"
                )));
            }
            if tf.id.is_empty() {
                return Err(CascataError::ConfigResolution(
                    "timeframe id must not be empty".into(),
                ));
            }
            // Timeframe ids become series file stems; keep them path-safe
            // under the same rules as symbols.
            if let Some(c) = tf.id.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
                return Err(CascataError::ConfigResolution(format!(
                    "timeframe id '{}' contains illegal character {c:?}",
                    tf.id
                )));
            }
            if matches!(tf.rule, BucketRule::Fixed { minutes: 0 }) {
                return Err(CascataError::ConfigResolution(format!(
                    "timeframe '{}' has a zero-minute bucket",
                    tf.id
                )));
            }
            if !ids.insert(tf.id.as_str()) {
                return Err(CascataError::ConfigResolution(format!(
                    "duplicate timeframe id '{}'",
                    tf.id
                )));
            }
        }

        let mut symbols = HashSet::new();
        for sym in &self.symbols {
            if !symbols.insert(&sym.symbol) {
                return Err(CascataError::ConfigResolution(format!(
                    "duplicate symbol '{}'",
                    sym.symbol
                )));
            }
            if sym.overrides.batch_size == Some(0) {
                return Err(CascataError::ConfigResolution(format!(
                    "symbol '{}' has a zero batch size",
                    sym.symbol
                )));
            }
        }

        self.cascade_order().map(drop)
    }

    /// Returns the timeframes in cascade order: every timeframe appears
    /// after the one it consumes.
    ///
    /// # Errors
    ///
    /// Returns [`CascataError::ConfigResolution`] if a `source` names an
    /// unknown timeframe or the chain contains a cycle.
    pub fn cascade_order(&self) -> Result<Vec<&TimeframeDef>> {
        let ids: HashSet<&str> = self.timeframes.iter().map(|tf| tf.id.as_str()).collect();
        for tf in &self.timeframes {
            if let Some(source) = &tf.source {
                if !ids.contains(source.as_str()) && source != MINUTE_SERIES_ID {
                    return Err(CascataError::ConfigResolution(format!(
                        "timeframe '{}' consumes unknown source '{source}'",
                        tf.id
                    )));
                }
            }
        }

        let mut ordered: Vec<&TimeframeDef> = Vec::with_capacity(self.timeframes.len());
        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&TimeframeDef> = self.timeframes.iter().collect();
        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|tf| {
                let ready = match tf.source.as_deref() {
                    None | Some(MINUTE_SERIES_ID) => true,
                    Some(source) => placed.contains(source),
                };
                if ready {
                    placed.insert(tf.id.as_str());
                    ordered.push(tf);
                }
                !ready
            });
            if remaining.len() == before {
                let stuck: Vec<&str> = remaining.iter().map(|tf| tf.id.as_str()).collect();
                return Err(CascataError::ConfigResolution(format!(
                    "timeframe cascade contains a cycle through: {}",
                    stuck.join(", ")
                )));
            }
        }
        Ok(ordered)
    }

    /// Builds the run-global session resolver.
    #[must_use]
    pub fn resolver(&self) -> SessionResolver {
        SessionResolver::new(
            self.reference_timezone,
            self.dst_shifts.clone(),
            self.default_sessions.clone(),
            self.fallback_session.clone(),
        )
    }

    /// Builds a symbol's session configuration.
    #[must_use]
    pub fn symbol_sessions(symbol: &SymbolConfig) -> SymbolSessions {
        SymbolSessions {
            timezone: symbol.timezone,
            overrides: symbol.session_overrides.clone(),
            sessions: symbol.sessions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn fallback() -> Session {
        Session {
            id: "fallback".into(),
            from: NaiveTime::MIN,
            to: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            origin: NaiveTime::MIN,
            from_date: None,
            to_date: None,
            ghost_label: None,
        }
    }

    fn config(timeframes: Vec<TimeframeDef>) -> RunConfig {
        RunConfig {
            data_dir: PathBuf::from("/data"),
            reference_timezone: chrono_tz::UTC,
            dst_shifts: Vec::new(),
            fallback_session: fallback(),
            default_sessions: Vec::new(),
            timeframes,
            symbols: Vec::new(),
        }
    }

    #[test]
    fn test_cascade_order_follows_sources() {
        let config = config(vec![
            TimeframeDef::fixed("1d", 1440, Some("h4".into())),
            TimeframeDef::fixed("5m", 5, None),
            TimeframeDef::fixed("h4", 240, Some("5m".into())),
        ]);
        let order: Vec<&str> = config
            .cascade_order()
            .unwrap()
            .iter()
            .map(|tf| tf.id.as_str())
            .collect();
        assert_eq!(order, vec!["5m", "h4", "1d"]);
    }

    #[test]
    fn test_unknown_source_rejected() {
        let config = config(vec![TimeframeDef::fixed("h4", 240, Some("5m".into()))]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown source"));
    }

    #[test]
    fn test_cycle_rejected() {
        let config = config(vec![
            TimeframeDef::fixed("a", 5, Some("b".into())),
            TimeframeDef::fixed("b", 15, Some("a".into())),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_duplicate_timeframe_rejected() {
        let config = config(vec![
            TimeframeDef::fixed("5m", 5, None),
            TimeframeDef::fixed("5m", 5, None),
        ]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_unsafe_timeframe_id_rejected() {
        let config = config(vec![TimeframeDef::fixed("../x", 5, None)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("illegal character"));
    }

    #[test]
    fn test_zero_minute_timeframe_rejected() {
        let config = config(vec![TimeframeDef::fixed("5m", 0, None)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("zero-minute"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = config(vec![TimeframeDef::fixed("5m", 5, None)]);
        config.symbols.push(SymbolConfig {
            symbol: Symbol::new("eurusd"),
            timezone: chrono_tz::UTC,
            sessions: Vec::new(),
            session_overrides: Vec::new(),
            overrides: SymbolOverride {
                batch_size: Some(0),
                ..Default::default()
            },
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("zero batch size"));
    }

    #[test]
    fn test_minute_id_reserved() {
        let config = config(vec![TimeframeDef::fixed("1m", 1, None)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "data_dir": "/var/lib/cascata",
            "reference_timezone": "America/New_York",
            "dst_shifts": [{ "utc_offset_secs": -14400, "shift_ms": 3600000 }],
            "fallback_session": {
                "id": "all-day",
                "from": "00:00:00",
                "to": "23:59:00",
                "origin": "00:00:00"
            },
            "timeframes": [
                { "id": "5m", "rule": { "kind": "fixed", "minutes": 5 } },
                {
                    "id": "1w",
                    "rule": { "kind": "calendar", "rule": { "unit": "week", "anchor": "Mon" } },
                    "source": "5m",
                    "label": "right"
                }
            ],
            "symbols": [
                {
                    "symbol": "eurusd",
                    "timezone": "Europe/Berlin",
                    "overrides": { "round_decimals": 5, "skip": ["1w"] }
                }
            ]
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.symbols[0].timezone, chrono_tz::Europe::Berlin);
        assert!(config.symbols[0].overrides.skips("1w"));
        assert_eq!(config.dst_shifts[0].shift_ms, 3_600_000);
    }
}
