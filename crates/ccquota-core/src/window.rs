//! Time window math for the usage gauge
//!
//! Two window shapes are tracked:
//! - a rolling window covering the trailing five hours, sliding with `now`
//! - a calendar week starting at local midnight of a configurable weekday
//!
//! All boundaries are computed in the observer's time zone and then stored as
//! UTC instants so readers can compare raw timestamps without zone lookups.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

/// Length of the rolling window in hours
pub const ROLLING_WINDOW_HOURS: i64 = 5;

/// Length of the rolling window
pub fn rolling_window() -> Duration {
    Duration::hours(ROLLING_WINDOW_HOURS)
}

/// Local midnight of `date` in `tz`, as a UTC instant
///
/// Some zones skip midnight on DST transition days; in that case the first
/// whole hour that exists on that day is used.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    for hour in 0..24 {
        let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
            continue;
        };
        if let Some(local) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    // No valid local hour at all; fall back to UTC midnight
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First day of the calendar week containing `today`
pub fn week_start(today: NaiveDate, first_weekday: Weekday) -> NaiveDate {
    let offset = (7 + today.weekday().num_days_from_monday()
        - first_weekday.num_days_from_monday())
        % 7;
    today - Duration::days(offset as i64)
}

/// Next calendar-week boundary strictly after `now`
pub fn weekly_reset_at<Tz: TimeZone>(now: &DateTime<Tz>, first_weekday: Weekday) -> DateTime<Utc> {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let mut boundary = week_start(now.date_naive(), first_weekday);
    let mut reset = start_of_day(boundary, &tz);
    while reset <= now_utc {
        boundary += Duration::days(7);
        reset = start_of_day(boundary, &tz);
    }
    reset
}

/// All window boundaries needed by one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageWindows {
    pub now: DateTime<Utc>,
    /// Exclusive lower bound of the rolling window
    pub rolling_start: DateTime<Utc>,
    pub today_start: DateTime<Utc>,
    pub tomorrow_start: DateTime<Utc>,
    /// Local calendar day of `now`
    pub today: NaiveDate,
    /// Local calendar day the current week started on
    pub week_start: NaiveDate,
    pub weekly_reset_at: DateTime<Utc>,
}

impl UsageWindows {
    pub fn compute<Tz: TimeZone>(now: &DateTime<Tz>, first_weekday: Weekday) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);
        let tomorrow = today.succ_opt().unwrap_or(today);

        Self {
            now: now_utc,
            rolling_start: now_utc - rolling_window(),
            today_start: start_of_day(today, &tz),
            tomorrow_start: start_of_day(tomorrow, &tz),
            today,
            week_start: week_start(today, first_weekday),
            weekly_reset_at: weekly_reset_at(now, first_weekday),
        }
    }

    /// True if `ts` falls on the local calendar day of `now`
    pub fn is_today(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.today_start && ts < self.tomorrow_start
    }

    /// True if `ts` is inside `(now - 5h, now]`
    pub fn in_rolling_window(&self, ts: DateTime<Utc>) -> bool {
        ts > self.rolling_start && ts <= self.now
    }

    /// True if `ts` is older than both the day start and the rolling window
    pub fn is_before_all_windows(&self, ts: DateTime<Utc>) -> bool {
        ts < self.today_start && ts <= self.rolling_start
    }

    /// Local day key in `YYYY-MM-DD` form
    pub fn day_key(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }

    /// UTC calendar days overlapped by today's local span
    ///
    /// Session timestamps are written in UTC, so a local day maps to one or
    /// two UTC date prefixes.
    pub fn utc_day_prefixes(&self) -> Vec<String> {
        let first = self.today_start.date_naive();
        let last = (self.tomorrow_start - Duration::nanoseconds(1)).date_naive();
        let mut prefixes = vec![first.format("%Y-%m-%d").to_string()];
        if last != first {
            prefixes.push(last.format("%Y-%m-%d").to_string());
        }
        prefixes
    }
}
