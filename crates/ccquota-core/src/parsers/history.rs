//! History log reader for ~/.claude/history.jsonl
//!
//! Each line is a prompt the user submitted, with an epoch-millisecond
//! `timestamp`. The file is append-only, so it is read newest-first and the
//! walk stops at the first record older than every window of interest.
//!
//! That early exit trusts append order. A record appended out of order
//! (clock skew between concurrent writers) that sits behind an older one is
//! never reached and goes uncounted.

use crate::error::{PassReport, SourceError};
use crate::models::{LogEntry, SourceCounts};
use crate::parsers::lines::LineSource;
use crate::window::UsageWindows;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Minimal view of a history record
#[derive(Debug, Deserialize)]
struct HistoryRecord {
    #[serde(default)]
    timestamp: Option<serde_json::Number>,
}

impl HistoryRecord {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        let number = self.timestamp.as_ref()?;
        let millis = number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Reader for the global prompt history log
pub struct HistoryReader {
    lines: Arc<dyn LineSource>,
}

impl HistoryReader {
    pub fn new(lines: Arc<dyn LineSource>) -> Self {
        Self { lines }
    }

    /// Count history records in the rolling window and on today's date
    pub fn read(&self, path: &Path, windows: &UsageWindows, report: &mut PassReport) -> SourceCounts {
        let mut counts = SourceCounts::default();

        let lines = match self.lines.read_lines(path) {
            Ok(lines) => lines,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "History log unavailable");
                report.add_error(SourceError::from_core_error("history", &e));
                return counts;
            }
        };

        let mut read = 0usize;
        for line in lines.iter().rev() {
            read += 1;
            let record: HistoryRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    trace!(error = %e, "Skipping malformed history line");
                    continue;
                }
            };
            let Some(timestamp) = record.timestamp() else {
                continue;
            };
            if windows.is_before_all_windows(timestamp) {
                break;
            }

            counts.record(
                &LogEntry {
                    timestamp,
                    is_user_authored: true,
                    source_file: path.to_path_buf(),
                },
                windows,
            );
        }

        report.history_lines_read += read;
        debug!(
            lines_read = read,
            five_hour = counts.five_hour_count,
            today = counts.today_count,
            "History log read"
        );

        counts
    }
}
