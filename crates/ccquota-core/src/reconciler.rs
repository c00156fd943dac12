//! Reconciler: merges the three sources into one snapshot
//!
//! Per pass:
//! 1. Session tree and history log are counted independently.
//! 2. Rolling and today counts take the larger of the two sources. The
//!    session tree is the broader source but loses data when files are
//!    pruned; history misses non-interactive callers. Neither wins outright.
//! 3. The reset instant follows whichever source supplied the rolling count,
//!    with ties going to the session tree.
//! 4. Weekly usage is today's live count plus the stats cache's prior days.
//!    Past days are immutable, so a stale cache is still correct for them.

use crate::config::{ConfigSource, QuotaConfig, SourcePaths};
use crate::error::PassReport;
use crate::models::{SourceCounts, UsageSnapshot};
use crate::parsers::{HistoryReader, LineSource, SessionScanner, StatsCacheReader, WholeFile};
use crate::window::UsageWindows;
use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one pass: the snapshot plus what degraded along the way
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub snapshot: UsageSnapshot,
    pub report: PassReport,
}

/// Inputs to [`merge`], gathered from the readers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceInputs {
    pub sessions: SourceCounts,
    pub history: SourceCounts,
    /// Messages on prior days of the current week, from the stats cache
    pub weekly_backfill: u64,
    pub stats_cache_exists: bool,
}

/// Pure merge policy
pub fn merge(inputs: &SourceInputs, windows: &UsageWindows, config: &QuotaConfig) -> UsageSnapshot {
    let SourceInputs {
        sessions, history, ..
    } = inputs;

    let rolling_source = if sessions.five_hour_count >= history.five_hour_count {
        sessions
    } else {
        history
    };
    let five_hour_count = rolling_source.five_hour_count;
    let five_hour_reset_at = rolling_source.five_hour_reset_at();

    let today_message_count = sessions.today_count.max(history.today_count);
    let weekly_count = today_message_count + inputs.weekly_backfill;

    let five_hour_limit = config.five_hour_limit();
    let weekly_limit = config.weekly_limit();

    UsageSnapshot {
        five_hour_count,
        five_hour_limit,
        five_hour_percentage: UsageSnapshot::percentage(five_hour_count, five_hour_limit),
        five_hour_reset_at,
        weekly_count,
        weekly_limit,
        weekly_percentage: UsageSnapshot::percentage(weekly_count, weekly_limit),
        weekly_reset_at: windows.weekly_reset_at,
        today_message_count,
        plan: config.plan.clone(),
        computed_at: windows.now,
        is_available: today_message_count > 0 || inputs.stats_cache_exists,
    }
}

/// Runs the readers and the merge policy
pub struct Reconciler {
    paths: SourcePaths,
    config: Arc<dyn ConfigSource>,
    sessions: SessionScanner,
    history: HistoryReader,
    stats: StatsCacheReader,
}

impl Reconciler {
    pub fn new(paths: SourcePaths, config: Arc<dyn ConfigSource>) -> Self {
        Self::with_line_source(paths, config, Arc::new(WholeFile))
    }

    /// Use a custom line source for the session and history readers
    pub fn with_line_source(
        paths: SourcePaths,
        config: Arc<dyn ConfigSource>,
        lines: Arc<dyn LineSource>,
    ) -> Self {
        Self {
            paths,
            config,
            sessions: SessionScanner::new(Arc::clone(&lines)),
            history: HistoryReader::new(lines),
            stats: StatsCacheReader::new(),
        }
    }

    pub fn paths(&self) -> &SourcePaths {
        &self.paths
    }

    /// One pass against the local clock
    pub fn reconcile(&self) -> PassOutcome {
        self.reconcile_at(&Local::now())
    }

    /// One pass as of `now`; never fails
    pub fn reconcile_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> PassOutcome {
        let config = self.config.load();
        let windows = UsageWindows::compute(now, config.first_weekday);
        let mut report = PassReport::new();

        let sessions = self
            .sessions
            .scan(&self.paths.projects_dir, &windows, &mut report);
        let history = self
            .history
            .read(&self.paths.history_file, &windows, &mut report);

        let stats_cache_exists = self.paths.stats_cache.exists();
        let weekly_backfill = self
            .stats
            .read(&self.paths.stats_cache, &mut report)
            .map(|stats| stats.weekly_backfill(windows.week_start, windows.today))
            .unwrap_or(0);

        if sessions.five_hour_count != history.five_hour_count {
            debug!(
                sessions = sessions.five_hour_count,
                history = history.five_hour_count,
                "Sources disagree on rolling count, taking the larger"
            );
        }

        let inputs = SourceInputs {
            sessions,
            history,
            weekly_backfill,
            stats_cache_exists,
        };
        let snapshot = merge(&inputs, &windows, &config);

        let (warnings, errors) = report.error_count();
        if errors > 0 {
            warn!(warnings, errors, "Reconciliation pass degraded");
        }
        debug!(
            five_hour = snapshot.five_hour_count,
            today = snapshot.today_message_count,
            weekly = snapshot.weekly_count,
            backfill = weekly_backfill,
            "Reconciliation pass complete"
        );

        PassOutcome { snapshot, report }
    }
}
