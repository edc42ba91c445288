//! Raw VRChat log line extraction
//!
//! Reads client log files and keeps only lines that carry a parseable
//! timestamp prefix and match one of the include patterns. Files are read
//! lossily: the client can be killed mid-write, and a truncated multibyte
//! character at the tail must not poison the rest of the file.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use valbum_common::time::RAW_LOG_FORMAT;

/// Line extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Specified log file does not exist
    #[error("Log file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Cannot read log file
    #[error("Cannot read log file {}: {}", .0.display(), .1)]
    Unreadable(PathBuf, std::io::Error),
}

/// One filtered log line with its parsed timestamp
#[derive(Debug, Clone)]
pub struct RawLogLine {
    /// Timestamp parsed from the line head, local wall-clock time
    pub timestamp: NaiveDateTime,

    /// The full line text, including the timestamp prefix
    pub text: String,

    /// File the line came from
    pub source_file: PathBuf,
}

/// Substring patterns matching exactly the line shapes the record parser
/// understands. Everything else in a client log (shader warnings, network
/// chatter) is noise and never reaches the store.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &[
    "VRC Analytics Initialized",
    "[Behaviour] Joining ",
    "[Behaviour] OnPlayerJoined",
    "[Behaviour] OnPlayerLeft",
    "VRCApplication: HandleApplicationQuit",
    "[VRC Camera] Took screenshot to:",
];

/// VRChat log line extractor
pub struct LineExtractor;

impl LineExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract matching lines from several files, in the order given.
    ///
    /// Strict: any unreadable file aborts the whole extraction. Callers that
    /// prefer to skip bad files call [`extract_file`](Self::extract_file) per
    /// file and decide themselves.
    pub fn extract(
        &self,
        paths: &[PathBuf],
        include: &[&str],
    ) -> Result<Vec<RawLogLine>, ExtractError> {
        let mut lines = Vec::new();
        for path in paths {
            lines.extend(self.extract_file(path, include)?);
        }
        Ok(lines)
    }

    /// Extract matching lines from one file.
    ///
    /// An empty `include` slice keeps every timestamped line; that is how
    /// store files (already filtered at append time) are read back.
    pub fn extract_file(
        &self,
        path: &Path,
        include: &[&str],
    ) -> Result<Vec<RawLogLine>, ExtractError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::NotFound(path.to_path_buf())
            } else {
                ExtractError::Unreadable(path.to_path_buf(), e)
            }
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let mut lines = Vec::new();
        for line in content.lines() {
            if !keep_line(line, include) {
                continue;
            }
            if let Some(timestamp) = parse_leading_timestamp(line) {
                lines.push(RawLogLine {
                    timestamp,
                    text: line.to_string(),
                    source_file: path.to_path_buf(),
                });
            }
        }
        Ok(lines)
    }
}

impl Default for LineExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the line matches any include pattern (or none were given).
fn keep_line(line: &str, include: &[&str]) -> bool {
    include.is_empty() || include.iter().any(|p| line.contains(p))
}

/// Parse the `YYYY.MM.DD HH:MM:SS` prefix every client log line starts with.
///
/// Returns None for continuation lines, stack traces, and garbage.
pub(crate) fn parse_leading_timestamp(line: &str) -> Option<NaiveDateTime> {
    let head = line.get(..19)?;
    NaiveDateTime::parse_from_str(head, RAW_LOG_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_log(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_extract_keeps_only_matching_timestamped_lines() {
        let temp = TempDir::new().unwrap();
        let path = write_log(
            &temp,
            "output_log_2024-01-15.txt",
            "2024.01.15 23:02:40 Log        -  [Network] Connecting\n\
             2024.01.15 23:02:45 Log        -  [Behaviour] OnPlayerJoined Alice\n\
             UnityException: something broke\n\
             2024.01.15 23:02:50 Log        -  [Behaviour] OnPlayerLeft Alice\n",
        );

        let extractor = LineExtractor::new();
        let lines = extractor
            .extract_file(&path, DEFAULT_INCLUDE_PATTERNS)
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].text.contains("OnPlayerJoined Alice"));
        assert!(lines[1].text.contains("OnPlayerLeft Alice"));
        assert_eq!(
            lines[0].timestamp,
            NaiveDateTime::parse_from_str("2024.01.15 23:02:45", RAW_LOG_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_matching_line_without_timestamp_is_dropped() {
        let temp = TempDir::new().unwrap();
        let path = write_log(
            &temp,
            "output_log.txt",
            "[Behaviour] OnPlayerJoined NoTimestamp\n\
             garbage 23:02:45 [Behaviour] OnPlayerJoined AlsoBad\n",
        );

        let extractor = LineExtractor::new();
        let lines = extractor
            .extract_file(&path, DEFAULT_INCLUDE_PATTERNS)
            .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_empty_include_keeps_all_timestamped_lines() {
        let temp = TempDir::new().unwrap();
        let path = write_log(
            &temp,
            "store.txt",
            "2024.01.15 23:02:45 Log        -  [Behaviour] OnPlayerJoined Alice\n\
             2024.01.15 23:02:50 Log        -  anything at all\n\
             no timestamp here\n",
        );

        let extractor = LineExtractor::new();
        let lines = extractor.extract_file(&path, &[]).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let extractor = LineExtractor::new();
        let err = extractor
            .extract_file(&temp.path().join("absent.txt"), &[])
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_strict_extract_aborts_on_missing_file() {
        let temp = TempDir::new().unwrap();
        let present = write_log(
            &temp,
            "present.txt",
            "2024.01.15 23:02:45 Log        -  [Behaviour] OnPlayerJoined Alice\n",
        );
        let absent = temp.path().join("absent.txt");

        let extractor = LineExtractor::new();
        let result = extractor.extract(&[present, absent], DEFAULT_INCLUDE_PATTERNS);
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }

    #[test]
    fn test_invalid_utf8_does_not_poison_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("torn.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"2024.01.15 23:02:45 Log        -  [Behaviour] OnPlayerJoined Alice\n")
            .unwrap();
        // Torn multibyte character from a mid-write kill
        file.write_all(&[0xE3, 0x81]).unwrap();

        let extractor = LineExtractor::new();
        let lines = extractor
            .extract_file(&path, DEFAULT_INCLUDE_PATTERNS)
            .unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_parse_leading_timestamp_rejects_short_lines() {
        assert!(parse_leading_timestamp("2024.01.15").is_none());
        assert!(parse_leading_timestamp("").is_none());
    }
}
