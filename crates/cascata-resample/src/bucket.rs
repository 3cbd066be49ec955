//! Bucket boundary arithmetic.
//!
//! All computation happens in the symbol's local wall-clock frame; the
//! resampler converts boundaries back to UTC for storage using the offset
//! the resolver applied to the record.

use cascata_session::MS_PER_DAY;
use cascata_types::{BucketRule, CalendarRule, Edge};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime};

/// One bucket's boundaries in the local frame (`[start, end)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BucketBounds {
    pub(crate) start_local: i64,
    pub(crate) end_local: i64,
}

/// Computes the bucket containing a local-frame instant.
///
/// `origin_local_ms` is the session origin anchored to the instant's local
/// day (fixed rules); `origin` is the raw origin time-of-day (calendar
/// rules). With `closed = Right` a boundary-exact instant belongs to the
/// preceding bucket, which is the same as bucketing the instant one
/// millisecond earlier.
pub(crate) fn bucket_for(
    rule: &BucketRule,
    closed: Edge,
    origin: NaiveTime,
    origin_local_ms: i64,
    local_ms: i64,
) -> BucketBounds {
    let effective = match closed {
        Edge::Left => local_ms,
        Edge::Right => local_ms - 1,
    };

    match rule {
        BucketRule::Fixed { minutes } => {
            let dur = i64::from(*minutes) * 60_000;
            let idx = (effective - origin_local_ms).div_euclid(dur);
            let start_local = origin_local_ms + idx * dur;
            BucketBounds {
                start_local,
                end_local: start_local + dur,
            }
        }
        BucketRule::Calendar { rule } => calendar_bounds(*rule, origin, effective),
    }
}

/// Bucket start time-of-day in the local frame, for ghost-label matching.
pub(crate) fn start_time_of_day(start_local: i64) -> NaiveTime {
    let ms_of_day = start_local.rem_euclid(MS_PER_DAY);
    NaiveTime::MIN + Duration::milliseconds(ms_of_day)
}

fn calendar_bounds(rule: CalendarRule, origin: NaiveTime, effective: i64) -> BucketBounds {
    let origin_ms = origin.signed_duration_since(NaiveTime::MIN).num_milliseconds();
    let date = local_date(effective);

    let (anchor, next) = match rule {
        CalendarRule::Week { anchor } => {
            let back = (date.weekday().num_days_from_monday() + 7
                - anchor.num_days_from_monday())
                % 7;
            let mut candidate = date - Duration::days(i64::from(back));
            if date_ms(candidate) + origin_ms > effective {
                candidate -= Duration::days(7);
            }
            (candidate, candidate + Duration::days(7))
        }
        CalendarRule::Month { anchor_day } => {
            let mut candidate = month_anchor(date.year(), date.month(), anchor_day);
            if date_ms(candidate) + origin_ms > effective {
                let (y, m) = previous_month(date.year(), date.month());
                candidate = month_anchor(y, m, anchor_day);
            }
            let (ny, nm) = next_month(candidate.year(), candidate.month());
            (candidate, month_anchor(ny, nm, anchor_day))
        }
        CalendarRule::Year => {
            let mut year = date.year();
            let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).expect("January 1st exists");
            if date_ms(jan1) + origin_ms > effective {
                year -= 1;
            }
            (
                NaiveDate::from_ymd_opt(year, 1, 1).expect("January 1st exists"),
                NaiveDate::from_ymd_opt(year + 1, 1, 1).expect("January 1st exists"),
            )
        }
    };

    BucketBounds {
        start_local: date_ms(anchor) + origin_ms,
        end_local: date_ms(next) + origin_ms,
    }
}

/// Anchor day clamped to the month's length.
fn month_anchor(year: i32, month: u32, anchor_day: u32) -> NaiveDate {
    let day = anchor_day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = next_month(year, month);
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .expect("first of month exists")
        .pred_opt()
        .expect("previous day exists")
        .day()
}

const fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

const fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

fn local_date(local_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(local_ms)
        .expect("local instant out of range")
        .date_naive()
}

fn date_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
