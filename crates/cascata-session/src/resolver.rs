//! Session scan and wall-clock computation.

use cascata_types::{CascataError, DstShift, Result, Session, SessionScope};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

/// Milliseconds per day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// A symbol's session configuration: its timezone and the session lists
/// scanned in specificity order.
#[derive(Debug, Clone)]
pub struct SymbolSessions {
    /// The symbol's IANA timezone.
    pub timezone: Tz,
    /// Session-scope overrides (most specific).
    pub overrides: Vec<Session>,
    /// Symbol-scope sessions.
    pub sessions: Vec<Session>,
}

/// Result of resolving an instant against a symbol's configuration.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// The selected session.
    pub session: &'a Session,
    /// Scope the session was found at.
    pub scope: SessionScope,
    /// The instant in the symbol's local wall-clock frame (epoch ms plus
    /// the total offset below).
    pub local_ms: i64,
    /// The session origin anchored to the instant's local date, in the
    /// same local frame. Always `<= local_ms`.
    pub origin_local_ms: i64,
    /// Total local-minus-UTC offset applied (timezone plus DST shift),
    /// used to convert bucket boundaries back to UTC.
    pub offset_ms: i64,
}

/// Immutable per-run session resolver.
///
/// Holds the run-global pieces: the reference timezone and DST shift table
/// (emulating the target platform's server-time DST convention), the
/// global default session list, and the fallback session used when nothing
/// matches.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    reference_tz: Tz,
    dst_shifts: Vec<DstShift>,
    default_sessions: Vec<Session>,
    fallback: Session,
}

impl SessionResolver {
    /// Creates a resolver from run-global configuration.
    #[must_use]
    pub const fn new(
        reference_tz: Tz,
        dst_shifts: Vec<DstShift>,
        default_sessions: Vec<Session>,
        fallback: Session,
    ) -> Self {
        Self {
            reference_tz,
            dst_shifts,
            default_sessions,
            fallback,
        }
    }

    /// Returns the global fallback session.
    #[must_use]
    pub const fn fallback(&self) -> &Session {
        &self.fallback
    }

    /// Resolves the session and effective origin for one instant.
    ///
    /// The local wall clock is the symbol timezone's offset plus the DST
    /// shift looked up from the reference timezone's offset at the same
    /// instant. Scopes are scanned most-specific first; the first scope
    /// holding exactly one eligible session wins.
    ///
    /// # Errors
    ///
    /// Returns [`CascataError::ConfigResolution`] when two sessions are
    /// simultaneously eligible at the same scope. Ambiguity is a
    /// configuration defect, never a silent pick.
    pub fn resolve<'a>(&'a self, symbol: &'a SymbolSessions, utc_ms: i64) -> Result<Resolved<'a>> {
        let offset_ms = self.offset_ms(symbol.timezone, utc_ms);
        let local_ms = utc_ms + offset_ms;
        let local = local_datetime(local_ms);
        let (time, date) = (local.time(), local.date());

        let scopes: [(SessionScope, &[Session]); 3] = [
            (SessionScope::Override, &symbol.overrides),
            (SessionScope::Symbol, &symbol.sessions),
            (SessionScope::Default, &self.default_sessions),
        ];

        for (scope, sessions) in scopes {
            let mut eligible = sessions
                .iter()
                .filter(|s| s.contains_time(time) && s.contains_date(date));
            if let Some(session) = eligible.next() {
                if let Some(second) = eligible.next() {
                    return Err(CascataError::ConfigResolution(format!(
                        "sessions '{}' and '{}' both eligible at {} (scope {scope:?})",
                        session.id, second.id, local
                    )));
                }
                return Ok(self.resolved(session, scope, local_ms, offset_ms));
            }
        }

        tracing::debug!(local = %local, "no session matched, using global default");
        Ok(self.resolved(&self.fallback, SessionScope::Default, local_ms, offset_ms))
    }

    fn resolved<'a>(
        &'a self,
        session: &'a Session,
        scope: SessionScope,
        local_ms: i64,
        offset_ms: i64,
    ) -> Resolved<'a> {
        Resolved {
            session,
            scope,
            local_ms,
            origin_local_ms: anchor_origin(session.origin, local_ms),
            offset_ms,
        }
    }

    /// Total local-minus-UTC offset: symbol timezone offset plus the DST
    /// shift for the reference timezone's offset at this instant.
    fn offset_ms(&self, timezone: Tz, utc_ms: i64) -> i64 {
        let utc = DateTime::from_timestamp_millis(utc_ms)
            .expect("instant out of range")
            .naive_utc();
        let tz_offset = i64::from(
            timezone
                .offset_from_utc_datetime(&utc)
                .fix()
                .local_minus_utc(),
        ) * 1000;

        let ref_offset = self
            .reference_tz
            .offset_from_utc_datetime(&utc)
            .fix()
            .local_minus_utc();
        let shift = self
            .dst_shifts
            .iter()
            .find(|s| s.utc_offset_secs == ref_offset)
            .map_or(0, |s| s.shift_ms);

        tz_offset + shift
    }
}

/// Interprets local-frame epoch milliseconds as a naive datetime.
fn local_datetime(local_ms: i64) -> NaiveDateTime {
    DateTime::from_timestamp_millis(local_ms)
        .expect("local instant out of range")
        .naive_utc()
}

/// Anchors an origin time-of-day to the instant's local date, taking the
/// previous day's anchor when the wall clock precedes it.
fn anchor_origin(origin: NaiveTime, local_ms: i64) -> i64 {
    let origin_of_day = origin.signed_duration_since(NaiveTime::MIN).num_milliseconds();
    let midnight = local_ms.div_euclid(MS_PER_DAY) * MS_PER_DAY;
    let anchor = midnight + origin_of_day;
    if anchor > local_ms {
        anchor - MS_PER_DAY
    } else {
        anchor
    }
}
