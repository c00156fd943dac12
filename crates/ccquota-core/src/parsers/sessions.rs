//! Session directory scanner
//!
//! Walks ~/.claude/projects and counts user-authored records written today.
//!
//! Session files are append-only, so a file last modified before today
//! cannot contain today's records and is skipped without being opened.
//! Within a file, a cheap substring test picks candidate lines; only those
//! are parsed as JSON, and the parse result has the final say.

use crate::error::{CoreError, PassReport, SourceError};
use crate::models::{LogEntry, SourceCounts};
use crate::parsers::lines::LineSource;
use crate::window::UsageWindows;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Substring every counted line must contain
const USER_MARKER: &str = r#""type":"user""#;

/// Lines carrying tool output are continuations, not user turns
const TOOL_RESULT_MARKER: &str = "tool_result";

/// Minimal view of a session JSONL record
#[derive(Debug, Deserialize)]
struct SessionRecord {
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Counts produced by one directory walk
#[derive(Debug, Default)]
struct ScanStats {
    files_seen: usize,
    files_skipped: usize,
    files_failed: usize,
    lines_matched: usize,
}

/// Scanner for the per-session log tree
pub struct SessionScanner {
    lines: Arc<dyn LineSource>,
}

impl SessionScanner {
    pub fn new(lines: Arc<dyn LineSource>) -> Self {
        Self { lines }
    }

    /// Scan `root` for today's user messages
    pub fn scan(&self, root: &Path, windows: &UsageWindows, report: &mut PassReport) -> SourceCounts {
        let mut counts = SourceCounts::default();

        if !root.is_dir() {
            report.add_error(SourceError::from_core_error(
                "sessions",
                &CoreError::DirectoryNotFound {
                    path: root.to_path_buf(),
                },
            ));
            return counts;
        }

        let prefixes = windows.utc_day_prefixes();
        let today_start: SystemTime = windows.today_start.into();
        let mut stats = ScanStats::default();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    trace!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            stats.files_seen += 1;

            // Unknown mtime: scan rather than risk missing today's data
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if modified.is_some_and(|m| m < today_start) {
                stats.files_skipped += 1;
                continue;
            }

            let path = entry.path();
            let lines = match self.lines.read_lines(path) {
                Ok(lines) => lines,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Failed to read session file");
                    stats.files_failed += 1;
                    continue;
                }
            };

            for line in &lines {
                if let Some(log_entry) = parse_session_line(line, &prefixes, path) {
                    if windows.is_today(log_entry.timestamp) {
                        stats.lines_matched += 1;
                        counts.record(&log_entry, windows);
                    }
                }
            }
        }

        debug!(
            root = %root.display(),
            files_seen = stats.files_seen,
            files_skipped = stats.files_skipped,
            files_failed = stats.files_failed,
            lines_matched = stats.lines_matched,
            five_hour = counts.five_hour_count,
            today = counts.today_count,
            "Session scan complete"
        );

        report.session_files_scanned += stats.files_seen - stats.files_skipped;
        report.session_files_skipped += stats.files_skipped;
        report.session_files_failed += stats.files_failed;

        counts
    }
}

/// Turn one session line into a user-authored entry, if it is one
///
/// `day_prefixes` are the UTC dates today's local span covers. A `Z`-suffixed
/// timestamp starting with none of them cannot be from today. Offset
/// timestamps carry a local date, so they always go through the full parse.
fn parse_session_line(line: &str, day_prefixes: &[String], path: &Path) -> Option<LogEntry> {
    if !line.contains(USER_MARKER) || line.contains(TOOL_RESULT_MARKER) {
        return None;
    }

    let record: SessionRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            trace!(path = %path.display(), error = %e, "Skipping malformed JSONL line");
            return None;
        }
    };
    if record.record_type != "user" {
        return None;
    }

    let raw = record.timestamp?;
    if raw.ends_with('Z') && !day_prefixes.iter().any(|p| raw.starts_with(p.as_str())) {
        return None;
    }
    let timestamp = parse_iso_timestamp(&raw)?;

    Some(LogEntry {
        timestamp,
        is_user_authored: true,
        source_file: path.to_path_buf(),
    })
}

/// Parse an RFC 3339 timestamp, fractional seconds optional
fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
