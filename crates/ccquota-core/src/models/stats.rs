//! Aggregate cache model from ~/.claude/stats-cache.json
//!
//! The file is rewritten periodically by Claude Code and lags the live logs.
//! Only `dailyActivity[].date` and `dailyActivity[].messageCount` feed the
//! gauge; everything else is tolerated and ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Top-level stats cache structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsCache {
    /// Version of the stats format
    #[serde(default)]
    pub version: u32,

    /// Last computed date (YYYY-MM-DD)
    #[serde(default)]
    pub last_computed_date: Option<String>,

    /// Daily activity entries
    #[serde(default)]
    pub daily_activity: Vec<DailyActivityEntry>,
}

/// Daily activity entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivityEntry {
    pub date: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub session_count: u64,
    #[serde(default)]
    pub tool_call_count: u64,
}

impl DailyActivityEntry {
    /// Parse the `YYYY-MM-DD` date key
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

impl StatsCache {
    /// Messages on days in `[week_start, today)`
    ///
    /// Today is excluded because the live sources own it.
    pub fn weekly_backfill(&self, week_start: NaiveDate, today: NaiveDate) -> u64 {
        self.daily_activity
            .iter()
            .filter_map(|entry| entry.day().map(|day| (day, entry.message_count)))
            .filter(|(day, _)| *day >= week_start && *day < today)
            .map(|(_, count)| count)
            .sum()
    }
}
