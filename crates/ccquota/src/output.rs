//! Terminal rendering of usage snapshots

use ccquota_core::{ErrorSeverity, PassReport, SubscriptionPlan, UsageSnapshot};
use chrono::{DateTime, Local, Utc};

const BAR_WIDTH: usize = 24;

// ============================================================================
// Gauge
// ============================================================================

/// Multi-line gauge for `ccquota status`
pub fn format_gauge(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> String {
    if !snapshot.is_available {
        return "No Claude Code usage data found".to_string();
    }

    let mut lines = vec![];
    lines.push(format!(
        "Plan:             {}",
        SubscriptionPlan::parse(&snapshot.plan).display_name()
    ));
    lines.push(format!(
        "5-hour window:    {} {}",
        bar(snapshot.five_hour_percentage, snapshot.five_hour_limit),
        format_usage(snapshot.five_hour_count, snapshot.five_hour_limit)
    ));
    lines.push(format!(
        "  Resets:         {}",
        snapshot
            .five_hour_reset_at
            .map(|at| format_reset(at, now))
            .unwrap_or_else(|| "-".to_string())
    ));
    lines.push(format!(
        "Weekly:           {} {}",
        bar(snapshot.weekly_percentage, snapshot.weekly_limit),
        format_usage(snapshot.weekly_count, snapshot.weekly_limit)
    ));
    lines.push(format!(
        "  Resets:         {}",
        format_reset(snapshot.weekly_reset_at, now)
    ));
    lines.push(format!("Today:            {} messages", snapshot.today_message_count));
    if snapshot.five_hour_exhausted() || snapshot.weekly_exhausted() {
        lines.push(String::new());
        lines.push("Limit reached".to_string());
    }

    lines.join("\n")
}

/// One line per snapshot for `ccquota watch`
pub fn format_watch_line(snapshot: &UsageSnapshot) -> String {
    let at = snapshot.computed_at.with_timezone(&Local).format("%H:%M:%S");
    if !snapshot.is_available {
        return format!("[{}] no usage data", at);
    }
    format!(
        "[{}] 5h {} ({}) | week {} ({}) | today {}",
        at,
        format_usage(snapshot.five_hour_count, snapshot.five_hour_limit),
        format_percent(snapshot.five_hour_percentage, snapshot.five_hour_limit),
        format_usage(snapshot.weekly_count, snapshot.weekly_limit),
        format_percent(snapshot.weekly_percentage, snapshot.weekly_limit),
        snapshot.today_message_count
    )
}

/// Snapshot as pretty JSON (camelCase keys)
pub fn format_json(snapshot: &UsageSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

/// Degraded sources with their suggestions, one block per source error
pub fn format_degraded(report: &PassReport) -> Vec<String> {
    report
        .errors
        .iter()
        .map(|e| {
            let level = match e.severity {
                ErrorSeverity::Warning => "warning",
                ErrorSeverity::Error => "error",
            };
            match &e.suggestion {
                Some(hint) => format!("{} [{}]: {}\n  hint: {}", level, e.source, e.message, hint),
                None => format!("{} [{}]: {}", level, e.source, e.message),
            }
        })
        .collect()
}

// ============================================================================
// Utilities
// ============================================================================

fn bar(fraction: f64, limit: u64) -> String {
    if limit == 0 {
        return format!("[{}]", " ".repeat(BAR_WIDTH));
    }
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn format_usage(count: u64, limit: u64) -> String {
    if limit == 0 {
        format!("{} (no limit)", count)
    } else {
        format!("{}/{}", count, limit)
    }
}

fn format_percent(fraction: f64, limit: u64) -> String {
    if limit == 0 {
        "-".to_string()
    } else {
        format!("{:.0}%", fraction * 100.0)
    }
}

fn format_reset(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local).format("%a %H:%M");
    format!("{} (in {})", local, format_duration(at - now))
}

fn format_duration(d: chrono::Duration) -> String {
    let minutes = d.num_minutes().max(0);
    let (days, hours, mins) = (minutes / 1440, (minutes % 1440) / 60, minutes % 60);
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}
