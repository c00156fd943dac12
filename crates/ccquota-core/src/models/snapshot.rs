//! The published usage snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable result of one reconciliation pass
///
/// A new snapshot is built on every pass and replaces the previous one
/// wholesale; nothing mutates a snapshot after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub five_hour_count: u64,
    pub five_hour_limit: u64,
    pub five_hour_percentage: f64,
    pub five_hour_reset_at: Option<DateTime<Utc>>,

    pub weekly_count: u64,
    pub weekly_limit: u64,
    pub weekly_percentage: f64,
    pub weekly_reset_at: DateTime<Utc>,

    pub today_message_count: u64,

    pub plan: String,
    pub computed_at: DateTime<Utc>,
    pub is_available: bool,
}

impl UsageSnapshot {
    /// `count / limit`, or 0 when no limit is configured
    pub fn percentage(count: u64, limit: u64) -> f64 {
        if limit == 0 {
            return 0.0;
        }
        count as f64 / limit as f64
    }

    /// True once the rolling window has reached its limit
    pub fn five_hour_exhausted(&self) -> bool {
        self.five_hour_limit > 0 && self.five_hour_count >= self.five_hour_limit
    }

    pub fn weekly_exhausted(&self) -> bool {
        self.weekly_limit > 0 && self.weekly_count >= self.weekly_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_limit() {
        assert_eq!(UsageSnapshot::percentage(10, 0), 0.0);
        assert!((UsageSnapshot::percentage(10, 40) - 0.25).abs() < f64::EPSILON);
        assert!((UsageSnapshot::percentage(50, 40) - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serializes_camel_case() {
        let snapshot = UsageSnapshot {
            five_hour_count: 2,
            five_hour_limit: 45,
            five_hour_percentage: UsageSnapshot::percentage(2, 45),
            five_hour_reset_at: None,
            weekly_count: 3,
            weekly_limit: 1500,
            weekly_percentage: UsageSnapshot::percentage(3, 1500),
            weekly_reset_at: Utc::now(),
            today_message_count: 3,
            plan: "pro".to_string(),
            computed_at: Utc::now(),
            is_available: true,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["fiveHourCount"], 2);
        assert_eq!(json["todayMessageCount"], 3);
        assert!(json["fiveHourResetAt"].is_null());
        assert!(!snapshot.five_hour_exhausted());
    }
}
