//! Line-producing file access
//!
//! Readers pull lines through [`LineSource`] rather than touching the
//! filesystem directly, so the whole-file strategy can be swapped for a
//! streamed one without changing the reconciler.

use crate::error::CoreError;
use std::path::Path;

/// Produces the lines of a line-delimited file
pub trait LineSource: Send + Sync {
    /// All lines of `path`, oldest first, without line terminators
    fn read_lines(&self, path: &Path) -> Result<Vec<String>, CoreError>;
}

/// Reads the whole file into memory and splits it
///
/// Fine at expected log sizes, which are bounded by daily rotation.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeFile;

impl LineSource for WholeFile {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>, CoreError> {
        let bytes = std::fs::read(path).map_err(|e| CoreError::from_io(path, e))?;
        // Lossy decode: one bad byte must not cost the whole file
        let content = String::from_utf8_lossy(&bytes);
        Ok(content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_splits_and_strips_crlf() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "first\r\nsecond\n\nthird").unwrap();

        let lines = WholeFile.read_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ok\n\xff\xfe broken\nalso ok\n").unwrap();

        let lines = WholeFile.read_lines(file.path()).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "also ok");
    }

    #[test]
    fn test_missing_file_is_absent() {
        let err = WholeFile
            .read_lines(Path::new("/nonexistent/history.jsonl"))
            .unwrap_err();
        assert!(err.is_absent());
    }
}
