//! Timeframe definitions and bucketing rules.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Which bucket boundary an operation refers to.
///
/// Used for both the `label` setting (which boundary is stored as the
/// bucket's timestamp) and the `closed` setting (which boundary is
/// inclusive for boundary-exact source timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// The bucket's start boundary.
    #[default]
    Left,
    /// The bucket's end boundary.
    Right,
}

/// Calendar-anchored bucketing rules for timeframes that do not have a
/// fixed millisecond duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "unit")]
pub enum CalendarRule {
    /// Weekly buckets starting on the given weekday.
    Week {
        /// Weekday each bucket starts on.
        anchor: Weekday,
    },
    /// Monthly buckets starting on the given day of month.
    ///
    /// Anchor days past a month's end clamp to its last day.
    Month {
        /// Day of month (1-31) each bucket starts on.
        anchor_day: u32,
    },
    /// Calendar-year buckets starting January 1st.
    Year,
}

/// How source timestamps map onto bucket boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum BucketRule {
    /// Fixed-duration buckets (e.g. 5 minutes, 4 hours).
    Fixed {
        /// Bucket duration in minutes.
        minutes: u32,
    },
    /// Calendar-anchored buckets (weeks, months, years).
    Calendar {
        /// The calendar rule.
        rule: CalendarRule,
    },
}

impl BucketRule {
    /// Returns the bucket duration in milliseconds for fixed rules, or
    /// `None` for calendar rules.
    #[must_use]
    pub const fn duration_ms(&self) -> Option<i64> {
        match self {
            Self::Fixed { minutes } => Some(*minutes as i64 * 60_000),
            Self::Calendar { .. } => None,
        }
    }
}

/// A timeframe definition: one level of the resampling cascade.
///
/// Timeframe definitions form a strict chain (e.g. 1m -> 5m -> 15m -> ...):
/// each consumes the committed output of its `source`, or the minute
/// Aggregate Series when `source` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeDef {
    /// Identifier (e.g. "5m", "h4", "1w"); also the series file stem.
    pub id: String,
    /// Bucketing rule.
    pub rule: BucketRule,
    /// Which boundary is stored as the bucket's timestamp.
    #[serde(default)]
    pub label: Edge,
    /// Which boundary is inclusive for boundary-exact timestamps.
    #[serde(default)]
    pub closed: Edge,
    /// Source timeframe id, or `None` to consume the minute series.
    #[serde(default)]
    pub source: Option<String>,
}

impl TimeframeDef {
    /// Creates a fixed-duration timeframe with default (left/left) edges.
    #[must_use]
    pub fn fixed(id: impl Into<String>, minutes: u32, source: Option<String>) -> Self {
        Self {
            id: id.into(),
            rule: BucketRule::Fixed { minutes },
            label: Edge::Left,
            closed: Edge::Left,
            source,
        }
    }
}

/// Per-symbol resampling overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SymbolOverride {
    /// Round output prices to this many decimals.
    #[serde(default)]
    pub round_decimals: Option<u32>,
    /// Maximum source records consumed per commit.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Timeframe ids not produced for this symbol.
    #[serde(default)]
    pub skip: Vec<String>,
}

impl SymbolOverride {
    /// Returns true if the given timeframe is skipped for this symbol.
    #[must_use]
    pub fn skips(&self, timeframe_id: &str) -> bool {
        self.skip.iter().any(|id| id == timeframe_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_duration_ms() {
        let rule = BucketRule::Fixed { minutes: 5 };
        assert_eq!(rule.duration_ms(), Some(300_000));

        let h4 = BucketRule::Fixed { minutes: 240 };
        assert_eq!(h4.duration_ms(), Some(14_400_000));
    }

    #[test]
    fn test_calendar_has_no_fixed_duration() {
        let rule = BucketRule::Calendar {
            rule: CalendarRule::Year,
        };
        assert_eq!(rule.duration_ms(), None);
    }

    #[test]
    fn test_default_edges_are_left() {
        let tf = TimeframeDef::fixed("5m", 5, None);
        assert_eq!(tf.label, Edge::Left);
        assert_eq!(tf.closed, Edge::Left);
    }

    #[test]
    fn test_override_skip() {
        let ov = SymbolOverride {
            skip: vec!["1w".into()],
            ..Default::default()
        };
        assert!(ov.skips("1w"));
        assert!(!ov.skips("5m"));
    }
}
