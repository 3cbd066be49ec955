//! Trading session definitions.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Specificity level at which a session is configured.
///
/// The resolver scans scopes from most to least specific; the first scope
/// with an eligible session wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// Session-scope override for a single symbol.
    Override,
    /// Symbol-scope session.
    Symbol,
    /// Global default list.
    Default,
}

/// A configured trading session.
///
/// A session is active during a local wall-clock window `[from, to)` and,
/// optionally, only inside a date validity window (an *era*). It carries
/// the bucket origin anchor for its window and may name a ghost label: a
/// bucket start time that must be folded into the preceding bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier, used in error reporting.
    pub id: String,
    /// Local wall-clock window start (inclusive).
    pub from: NaiveTime,
    /// Local wall-clock window end (exclusive). May precede `from`, in
    /// which case the window wraps past midnight.
    pub to: NaiveTime,
    /// Time-of-day anchor from which bucket boundaries are computed.
    pub origin: NaiveTime,
    /// Era start date (inclusive), if this session is historically scoped.
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    /// Era end date (exclusive), if this session is historically scoped.
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    /// Bucket start time whose bucket is folded into its predecessor and
    /// dropped (session-transition correction).
    #[serde(default)]
    pub ghost_label: Option<NaiveTime>,
}

impl Session {
    /// Returns true if the local wall-clock time falls inside the active
    /// window, honoring windows that wrap past midnight.
    #[must_use]
    pub fn contains_time(&self, t: NaiveTime) -> bool {
        if self.from <= self.to {
            t >= self.from && t < self.to
        } else {
            t >= self.from || t < self.to
        }
    }

    /// Returns true if the local date falls inside the era window.
    /// Sessions without an era are valid for all dates.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        if let Some(from_date) = self.from_date {
            if date < from_date {
                return false;
            }
        }
        if let Some(to_date) = self.to_date {
            if date >= to_date {
                return false;
            }
        }
        true
    }
}

/// One entry of the DST shift table.
///
/// Maps an observed reference-timezone UTC offset to a millisecond shift
/// applied to the symbol's wall clock, emulating the reference platform's
/// server-time DST convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DstShift {
    /// Reference timezone UTC offset (seconds east) this entry matches.
    pub utc_offset_secs: i32,
    /// Wall-clock shift to apply, in milliseconds.
    pub shift_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn session(from: NaiveTime, to: NaiveTime) -> Session {
        Session {
            id: "day".into(),
            from,
            to,
            origin: t(2, 30),
            from_date: None,
            to_date: None,
            ghost_label: None,
        }
    }

    #[test]
    fn test_contains_time_plain_window() {
        let s = session(t(8, 0), t(17, 0));
        assert!(s.contains_time(t(8, 0)));
        assert!(s.contains_time(t(12, 30)));
        assert!(!s.contains_time(t(17, 0)));
        assert!(!s.contains_time(t(3, 0)));
    }

    #[test]
    fn test_contains_time_wrapping_window() {
        let s = session(t(22, 0), t(6, 0));
        assert!(s.contains_time(t(23, 30)));
        assert!(s.contains_time(t(2, 0)));
        assert!(!s.contains_time(t(6, 0)));
        assert!(!s.contains_time(t(12, 0)));
    }

    #[test]
    fn test_contains_date_era() {
        let mut s = session(t(8, 0), t(17, 0));
        s.from_date = NaiveDate::from_ymd_opt(2019, 1, 1);
        s.to_date = NaiveDate::from_ymd_opt(2021, 1, 1);

        assert!(!s.contains_date(NaiveDate::from_ymd_opt(2018, 12, 31).unwrap()));
        assert!(s.contains_date(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()));
        assert!(s.contains_date(NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()));
        assert!(!s.contains_date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()));
    }
}
