//! Error types for ccquota-core
//!
//! A reconciliation pass never fails as a whole. Reader errors are converted
//! into [`SourceError`] entries on a [`PassReport`] and the source degrades to
//! empty for that pass.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for ccquota operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Watch Errors
    // ===================
    #[error("File watcher error: {message}")]
    WatchError {
        message: String,
        #[source]
        source: Option<notify::Error>,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Claude home directory not found")]
    ClaudeHomeNotFound,
}

impl CoreError {
    /// Map an I/O error on `path` to `FileNotFound` or `FileRead`
    pub fn from_io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        let path = path.into();
        if error.kind() == std::io::ErrorKind::NotFound {
            CoreError::FileNotFound { path }
        } else {
            CoreError::FileRead {
                path,
                source: error,
            }
        }
    }

    /// True when the error means the source simply is not there
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            CoreError::FileNotFound { .. } | CoreError::DirectoryNotFound { .. }
        )
    }
}

/// Severity level for errors during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Source absent, counts as empty
    Warning,
    /// Source present but unreadable or unparseable
    Error,
}

/// Individual error entry in a pass report
#[derive(Debug, Clone)]
pub struct SourceError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl SourceError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion) = match error {
            CoreError::FileNotFound { path } => (
                format!("File not found: {}", path.display()),
                Some(format!("Check if file exists: ls {}", path.display())),
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
            ),
            CoreError::DirectoryNotFound { path } => (
                format!("Directory not found: {}", path.display()),
                Some("Run 'claude' at least once to create it".to_string()),
            ),
            CoreError::JsonParse { path, message, .. } => (
                format!("Invalid JSON in {}: {}", path.display(), message),
                Some("Validate JSON syntax with: jq . <file>".to_string()),
            ),
            CoreError::ClaudeHomeNotFound => (
                "Claude home directory not found".to_string(),
                Some("Pass --claude-home or set CCQUOTA_CLAUDE_HOME".to_string()),
            ),
            _ => (error.to_string(), None),
        };

        let severity = if error.is_absent() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        };

        Self {
            source,
            message,
            severity,
            suggestion,
        }
    }
}

/// Report of what went wrong during one reconciliation pass
///
/// Readers push errors here instead of returning them, so one bad source
/// never takes the others down with it.
#[derive(Debug, Default, Clone)]
pub struct PassReport {
    pub errors: Vec<SourceError>,
    pub session_files_scanned: usize,
    pub session_files_skipped: usize,
    pub session_files_failed: usize,
    pub history_lines_read: usize,
    pub stats_cache_loaded: bool,
}

impl PassReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: SourceError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SourceError::warning(source, message));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Names of sources that were degraded this pass, deduplicated
    pub fn degraded_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.errors.iter().map(|e| e.source.clone()).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Returns (warnings, errors)
    pub fn error_count(&self) -> (usize, usize) {
        let warnings = self
            .errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
            .count();
        (warnings, self.errors.len() - warnings)
    }
}
