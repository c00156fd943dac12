//! Log entries and per-source counts

use crate::window::UsageWindows;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// One timestamped record found while scanning a log
///
/// Entries only live for the duration of a pass; they are folded into
/// [`SourceCounts`] and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub is_user_authored: bool,
    pub source_file: PathBuf,
}

/// What one source reports for a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    /// Entries inside the rolling window
    pub five_hour_count: u64,
    /// Oldest timestamp inside the rolling window
    pub oldest_in_window: Option<DateTime<Utc>>,
    /// Entries on the local calendar day
    pub today_count: u64,
}

impl SourceCounts {
    /// Fold one entry into the counts
    ///
    /// Entries not authored by the user never count. Day and rolling-window
    /// membership are checked independently.
    pub fn record(&mut self, entry: &LogEntry, windows: &UsageWindows) {
        if !entry.is_user_authored {
            return;
        }
        self.record_timestamp(entry.timestamp, windows);
    }

    fn record_timestamp(&mut self, ts: DateTime<Utc>, windows: &UsageWindows) {
        if windows.is_today(ts) {
            self.today_count += 1;
        }
        if windows.in_rolling_window(ts) {
            self.five_hour_count += 1;
            self.oldest_in_window = Some(match self.oldest_in_window {
                Some(oldest) if oldest <= ts => oldest,
                _ => ts,
            });
        }
    }

    /// Moment the rolling window rolls past the oldest in-window entry
    pub fn five_hour_reset_at(&self) -> Option<DateTime<Utc>> {
        self.oldest_in_window
            .map(|oldest| oldest + crate::window::rolling_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Weekday};

    fn entry(ts: DateTime<Utc>, user: bool) -> LogEntry {
        LogEntry {
            timestamp: ts,
            is_user_authored: user,
            source_file: PathBuf::from("session.jsonl"),
        }
    }

    #[test]
    fn test_record_tracks_oldest_in_window() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
        let windows = UsageWindows::compute(&now, Weekday::Mon);
        let mut counts = SourceCounts::default();

        counts.record(&entry(now - Duration::hours(1), true), &windows);
        counts.record(&entry(now - Duration::hours(3), true), &windows);
        counts.record(&entry(now - Duration::hours(2), true), &windows);
        counts.record(&entry(now - Duration::hours(7), true), &windows);

        assert_eq!(counts.five_hour_count, 3);
        assert_eq!(counts.today_count, 4);
        assert_eq!(counts.oldest_in_window, Some(now - Duration::hours(3)));
        assert_eq!(
            counts.five_hour_reset_at(),
            Some(now + Duration::hours(2))
        );
    }

    #[test]
    fn test_non_user_entries_ignored() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
        let windows = UsageWindows::compute(&now, Weekday::Mon);
        let mut counts = SourceCounts::default();

        counts.record(&entry(now, false), &windows);

        assert_eq!(counts, SourceCounts::default());
        assert_eq!(counts.five_hour_reset_at(), None);
    }
}
