//! Conversions between epoch-millisecond strings and local calendar ranges.
//!
//! Upstream endpoints speak epoch milliseconds encoded as strings; bucketing
//! and chart axes speak local calendar days. Everything here works in the
//! device's local time zone so an event shortly after UTC midnight still lands
//! on the local day it happened.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

/// Date format used by endpoints that take calendar-day parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render an instant as an epoch-millisecond string.
pub fn milliseconds_string<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.timestamp_millis().to_string()
}

/// Parse an epoch-millisecond string. Non-numeric input yields `None`.
pub fn millis_from_string(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Inverse of [`milliseconds_string`].
pub fn date_from_milliseconds_string(value: &str) -> Option<DateTime<Local>> {
    millis_from_string(value).and_then(local_from_millis)
}

pub fn local_from_millis(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

/// Local calendar day containing the instant `ms`.
pub fn local_date_of_millis(ms: i64) -> Option<NaiveDate> {
    local_from_millis(ms).map(|dt| dt.date_naive())
}

/// Local wall-clock start of the hour containing `ms`.
pub fn local_hour_start_of_millis(ms: i64) -> Option<NaiveDateTime> {
    let local = local_from_millis(ms)?;
    local.date_naive().and_hms_opt(local.hour(), 0, 0)
}

/// Resolve a local wall-clock time to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// DST gap are shifted forward by an hour.
pub fn resolve_local(naive: NaiveDateTime) -> DateTime<Local> {
    if let Some(dt) = naive.and_local_timezone(Local).earliest() {
        return dt;
    }
    let shifted = naive + Duration::hours(1);
    shifted
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Local midnight at the start of `date`.
pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    resolve_local(date.and_time(NaiveTime::default()))
}

/// `(startOfDayMs, endOfDayMs)` for a local calendar day. The end is the
/// start of the next local day minus one millisecond.
pub fn day_range(date: NaiveDate) -> (i64, i64) {
    let start = local_midnight(date).timestamp_millis();
    let next = date.succ_opt().map(local_midnight);
    let end = match next {
        Some(next) => next.timestamp_millis() - 1,
        None => start + Duration::days(1).num_milliseconds() - 1,
    };
    (start, end)
}

fn first_day_of_window(days: u32, today: NaiveDate) -> NaiveDate {
    let back = i64::from(days.max(1)) - 1;
    today - Duration::days(back)
}

/// `(startMs, nowMs)` where the start is local midnight `days - 1` days
/// before today, so the window covers `days` calendar days including today.
pub fn days_ago_to_now_range_at(days: u32, now: DateTime<Local>) -> (i64, i64) {
    let start = local_midnight(first_day_of_window(days, now.date_naive()));
    (start.timestamp_millis(), now.timestamp_millis())
}

/// Same window as [`days_ago_to_now_range_at`], as `YYYY-MM-DD` strings.
pub fn days_ago_to_today_range_at(days: u32, now: DateTime<Local>) -> (String, String) {
    let today = now.date_naive();
    let start = first_day_of_window(days, today);
    (
        start.format(DATE_FORMAT).to_string(),
        today.format(DATE_FORMAT).to_string(),
    )
}

/// `(startMs, nowMs)` from local midnight yesterday until now.
pub fn yesterday_to_now_range_at(now: DateTime<Local>) -> (i64, i64) {
    days_ago_to_now_range_at(2, now)
}

pub fn yesterday_to_now_range() -> (i64, i64) {
    yesterday_to_now_range_at(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(date: NaiveDate) -> DateTime<Local> {
        resolve_local(date.and_hms_opt(12, 0, 0).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn milliseconds_string_round_trips_through_local_time() {
        let instant = noon(date(2025, 3, 14));
        let encoded = milliseconds_string(&instant);
        assert_eq!(date_from_milliseconds_string(&encoded), Some(instant));
    }

    #[test]
    fn non_numeric_milliseconds_string_is_none() {
        assert!(date_from_milliseconds_string("abc").is_none());
        assert!(date_from_milliseconds_string("").is_none());
        assert!(millis_from_string("12.5").is_none());
    }

    #[test]
    fn day_range_spans_local_midnight_to_last_millisecond() {
        let day = date(2025, 6, 10);
        let (start, end) = day_range(day);
        assert_eq!(local_date_of_millis(start), Some(day));
        assert_eq!(local_date_of_millis(end), Some(day));
        assert_eq!(local_date_of_millis(end + 1), Some(date(2025, 6, 11)));
        assert_eq!(local_date_of_millis(start - 1), Some(date(2025, 6, 9)));
    }

    #[test]
    fn days_ago_window_covers_requested_days_including_today() {
        let now = noon(date(2025, 6, 10));
        let (start, end) = days_ago_to_now_range_at(7, now);
        assert_eq!(end, now.timestamp_millis());
        assert_eq!(local_date_of_millis(start), Some(date(2025, 6, 4)));
        assert_eq!(start, local_midnight(date(2025, 6, 4)).timestamp_millis());
    }

    #[test]
    fn days_ago_to_today_uses_calendar_strings() {
        let now = noon(date(2025, 1, 3));
        let (start, end) = days_ago_to_today_range_at(7, now);
        assert_eq!(start, "2024-12-28");
        assert_eq!(end, "2025-01-03");
    }

    #[test]
    fn zero_days_is_treated_as_today_only() {
        let now = noon(date(2025, 1, 3));
        let (start, end) = days_ago_to_today_range_at(0, now);
        assert_eq!(start, "2025-01-03");
        assert_eq!(end, "2025-01-03");
    }

    #[test]
    fn yesterday_to_now_starts_at_yesterday_midnight() {
        let now = noon(date(2025, 6, 10));
        let (start, end) = yesterday_to_now_range_at(now);
        assert_eq!(start, local_midnight(date(2025, 6, 9)).timestamp_millis());
        assert_eq!(end, now.timestamp_millis());
    }

    #[test]
    fn hour_start_truncates_minutes() {
        let at = resolve_local(date(2025, 6, 10).and_hms_opt(14, 37, 12).unwrap());
        let hour = local_hour_start_of_millis(at.timestamp_millis()).unwrap();
        assert_eq!(hour, date(2025, 6, 10).and_hms_opt(14, 0, 0).unwrap());
    }
}
