//! Month-partitioned log store
//!
//! The store is the durable, append-only archive of filtered log lines.
//! Layout under the store root:
//!
//! ```text
//! logStore/
//!   2024-01/
//!     logStore-2024-01.txt                    (base file, created first)
//!     logStore-2024-01-20240115231533123.txt  (rotation sibling)
//!   2024-02/
//!     logStore-2024-02.txt
//! ```
//!
//! Lines land in the partition of their own timestamp, not of the wall clock
//! at append time. Once a file grows past [`MAX_STORE_FILE_BYTES`], the next
//! line starts a sibling named with the rotation wall-clock time. Reading a
//! month in creation order means the base file first, then siblings in name
//! order.
//!
//! Raw client logs vanish when VRChat prunes them. The store is what makes
//! every record reconstructible from local data alone.

use crate::services::line_extractor::RawLogLine;
use chrono::{Datelike, Local};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rotation threshold. A file that has grown past this many bytes stops
/// receiving lines; the next line opens a sibling.
pub const MAX_STORE_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Log store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure against a store path
    #[error("Log store I/O error at {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of one append pass
#[derive(Debug, Clone, Default)]
pub struct AppendOutcome {
    /// Store files written to, in write order
    pub store_file_paths: Vec<PathBuf>,

    /// Lines appended across all partitions
    pub appended_lines: usize,
}

/// Append-only writer and reader for the month-partitioned store
pub struct LogStoreWriter {
    store_dir: PathBuf,
    max_file_bytes: u64,
}

impl LogStoreWriter {
    pub fn new(store_dir: PathBuf) -> Self {
        Self {
            store_dir,
            max_file_bytes: MAX_STORE_FILE_BYTES,
        }
    }

    /// Override the rotation threshold. Exists for tests; production callers
    /// keep the default.
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Append lines to their month partitions.
    ///
    /// Within one partition the input order is preserved. Every touched file
    /// is fsynced before this returns; a batch that straddles the rotation
    /// threshold syncs the full file before opening the sibling.
    pub fn append(&self, lines: &[RawLogLine]) -> Result<AppendOutcome, StoreError> {
        let mut outcome = AppendOutcome::default();
        if lines.is_empty() {
            return Ok(outcome);
        }

        let mut months: BTreeMap<(i32, u32), Vec<&RawLogLine>> = BTreeMap::new();
        for line in lines {
            let key = (line.timestamp.year(), line.timestamp.month());
            months.entry(key).or_default().push(line);
        }

        for ((year, month), month_lines) in &months {
            self.append_month(*year, *month, month_lines, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn append_month(
        &self,
        year: i32,
        month: u32,
        lines: &[&RawLogLine],
        outcome: &mut AppendOutcome,
    ) -> Result<(), StoreError> {
        let month_dir = self.store_dir.join(month_dir_name(year, month));
        std::fs::create_dir_all(&month_dir).map_err(|e| StoreError::io(&month_dir, e))?;

        // Continue the newest file of the partition, or start the base file
        let mut path = self
            .month_files_in_creation_order(&month_dir, year, month)?
            .pop()
            .unwrap_or_else(|| month_dir.join(base_file_name(year, month)));
        let mut written = file_len(&path);
        let mut writer = BufWriter::new(open_append(&path)?);
        outcome.store_file_paths.push(path.clone());

        for line in lines {
            if written > self.max_file_bytes {
                finish_file(&mut writer, &path)?;
                path = month_dir.join(rotated_file_name(year, month));
                written = file_len(&path);
                writer = BufWriter::new(open_append(&path)?);
                outcome.store_file_paths.push(path.clone());
            }
            writer
                .write_all(line.text.as_bytes())
                .map_err(|e| StoreError::io(&path, e))?;
            writer.write_all(b"\n").map_err(|e| StoreError::io(&path, e))?;
            written += line.text.len() as u64 + 1;
            outcome.appended_lines += 1;
        }

        finish_file(&mut writer, &path)
    }

    /// Every store file, oldest partition first, each partition in creation
    /// order. A store directory that does not exist yet is simply empty.
    pub fn store_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        self.collect_files(None)
    }

    /// Store files of partitions at or after the given month.
    pub fn store_files_since(&self, year: i32, month: u32) -> Result<Vec<PathBuf>, StoreError> {
        self.collect_files(Some((year, month)))
    }

    fn collect_files(&self, since: Option<(i32, u32)>) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match std::fs::read_dir(&self.store_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.store_dir, e)),
        };

        let mut partitions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.store_dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some((year, month)) = parse_month_dir(name) else {
                continue;
            };
            if let Some((since_year, since_month)) = since {
                if (year, month) < (since_year, since_month) {
                    continue;
                }
            }
            partitions.push((year, month, entry.path()));
        }
        partitions.sort();

        let mut files = Vec::new();
        for (year, month, dir) in partitions {
            files.extend(self.month_files_in_creation_order(&dir, year, month)?);
        }
        Ok(files)
    }

    /// Files of one partition in creation order: the base file first, then
    /// rotation siblings in name order. Lexicographic order alone would put
    /// siblings before the base file (`-` sorts before `.`), so the base file
    /// is pulled to the front explicitly.
    fn month_files_in_creation_order(
        &self,
        month_dir: &Path,
        year: i32,
        month: u32,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match std::fs::read_dir(month_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(month_dir, e)),
        };

        let base_name = base_file_name(year, month);
        let sibling_prefix = format!("logStore-{}-", month_dir_name(year, month));

        let mut base = None;
        let mut siblings = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(month_dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == base_name {
                base = Some(entry.path());
            } else if name.starts_with(&sibling_prefix) && name.ends_with(".txt") {
                siblings.push(entry.path());
            }
        }
        siblings.sort();

        let mut files = Vec::new();
        files.extend(base);
        files.extend(siblings);
        Ok(files)
    }
}

fn month_dir_name(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

fn base_file_name(year: i32, month: u32) -> String {
    format!("logStore-{}.txt", month_dir_name(year, month))
}

fn rotated_file_name(year: i32, month: u32) -> String {
    format!(
        "logStore-{}-{}.txt",
        month_dir_name(year, month),
        Local::now().format("%Y%m%d%H%M%S%3f")
    )
}

/// Parse a partition directory name (`YYYY-MM`).
fn parse_month_dir(name: &str) -> Option<(i32, u32)> {
    let (year, month) = name.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn open_append(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))
}

fn finish_file(writer: &mut BufWriter<File>, path: &Path) -> Result<(), StoreError> {
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    writer.get_ref().sync_all().map_err(|e| StoreError::io(path, e))
}
