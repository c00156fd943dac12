//! Stats cache reader for ~/.claude/stats-cache.json
//!
//! The cache only backfills prior days of the current week. A missing or
//! broken file means no backfill, never a failed pass. There is no retry
//! loop here: if the file was caught mid-rewrite, the write event that
//! finishes it triggers the next pass.

use crate::error::{CoreError, PassReport, SourceError};
use crate::models::StatsCache;
use std::path::Path;
use tracing::{debug, warn};

/// Parser for stats-cache.json
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsCacheReader;

impl StatsCacheReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse the cache file
    pub fn parse(&self, path: &Path) -> Result<StatsCache, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::from_io(path, e))?;

        serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })
    }

    /// Parse with graceful degradation, recording errors in the pass report
    pub fn read(&self, path: &Path, report: &mut PassReport) -> Option<StatsCache> {
        match self.parse(path) {
            Ok(stats) => {
                report.stats_cache_loaded = true;
                debug!(days = stats.daily_activity.len(), "Stats cache loaded");
                Some(stats)
            }
            Err(e) if e.is_absent() => {
                report.add_error(SourceError::from_core_error("stats-cache", &e));
                None
            }
            Err(e) => {
                warn!(error = %e, "Stats cache unreadable, skipping weekly backfill");
                report.add_error(SourceError::from_core_error("stats-cache", &e));
                None
            }
        }
    }
}
