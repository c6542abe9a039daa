//! Disk space preflight checks.
//!
//! Reports capacity of the filesystem holding a path and fails fast when a
//! prospective download would not fit. Paths that do not exist yet resolve to
//! their nearest existing ancestor, so a model directory can be checked
//! before it is created.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::format::{format_bytes, BYTES_PER_GB};

/// Default safety margin added on top of an artifact's size, in percent.
pub const DEFAULT_BUFFER_PERCENT: u32 = 10;

/// Typical size of a local LLM model used when none is declared (8 GB).
pub const DEFAULT_MODEL_SIZE_BYTES: u64 = 8 * BYTES_PER_GB;

/// Capacity of the filesystem holding a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskSpaceReport {
    /// Directory that was actually queried.
    pub path: PathBuf,
    /// Total capacity in bytes.
    pub total: u64,
    /// Bytes available to unprivileged users.
    pub free: u64,
    /// `total - free`.
    pub used: u64,
    /// Used share of capacity in `[0, 100]`.
    pub used_percent: f64,
    pub total_formatted: String,
    pub free_formatted: String,
    pub used_formatted: String,
}

/// Not enough free space for a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DiskSpaceError {
    /// Path that was checked.
    pub path: PathBuf,
    /// Bytes required.
    pub required: u64,
    /// Bytes available.
    pub available: u64,
    /// Human-readable description.
    pub message: String,
}

impl DiskSpaceError {
    fn new(path: &Path, required: u64, available: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            required,
            available,
            message: format!(
                "insufficient disk space at {}: need {}, have {} free",
                path.display(),
                format_bytes(required),
                format_bytes(available)
            ),
        }
    }
}

/// Errors from a disk space check.
#[derive(Debug, Error)]
pub enum DiskCheckError {
    /// The filesystem could not be queried.
    #[error("cannot query disk space for {}: {source}", path.display())]
    Query {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The filesystem does not have enough free space.
    #[error(transparent)]
    Insufficient(#[from] DiskSpaceError),
}

/// Report capacity of the filesystem containing `path`.
///
/// Files resolve to their parent directory; missing paths resolve to their
/// nearest existing ancestor.
pub fn disk_space(path: &Path) -> Result<DiskSpaceReport, DiskCheckError> {
    let dir = resolve_existing_dir(path)?;

    let query_err = |source| DiskCheckError::Query {
        path: dir.clone(),
        source,
    };
    let total = fs2::total_space(&dir).map_err(query_err)?;
    let free = fs2::available_space(&dir).map_err(query_err)?;

    let used = total.saturating_sub(free);
    let used_percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Ok(DiskSpaceReport {
        total_formatted: format_bytes(total),
        free_formatted: format_bytes(free),
        used_formatted: format_bytes(used),
        path: dir,
        total,
        free,
        used,
        used_percent,
    })
}

/// Fail unless at least `required` bytes are free at `path`.
pub fn check_disk_space(path: &Path, required: u64) -> Result<DiskSpaceReport, DiskCheckError> {
    let report = disk_space(path)?;
    if report.free < required {
        return Err(DiskSpaceError::new(path, required, report.free).into());
    }
    Ok(report)
}

/// Bytes needed to store `size` bytes while keeping `buffer_percent` spare.
pub fn required_with_buffer(size: u64, buffer_percent: u32) -> u64 {
    let buffer = (u128::from(size) * u128::from(buffer_percent) / 100).min(u128::from(u64::MAX));
    size.saturating_add(buffer as u64)
}

/// Fail unless `dir` can hold an artifact of `size` bytes plus a
/// `buffer_percent` safety margin.
pub fn check_disk_space_for_model(
    dir: &Path,
    size: u64,
    buffer_percent: u32,
) -> Result<DiskSpaceReport, DiskCheckError> {
    check_disk_space(dir, required_with_buffer(size, buffer_percent))
}

/// [`check_disk_space_for_model`] with [`DEFAULT_MODEL_SIZE_BYTES`] and
/// [`DEFAULT_BUFFER_PERCENT`].
pub fn check_disk_space_for_default_model(dir: &Path) -> Result<DiskSpaceReport, DiskCheckError> {
    check_disk_space_for_model(dir, DEFAULT_MODEL_SIZE_BYTES, DEFAULT_BUFFER_PERCENT)
}

fn resolve_existing_dir(path: &Path) -> Result<PathBuf, DiskCheckError> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };

    let mut last_err = None;
    for candidate in path.ancestors() {
        if candidate.as_os_str().is_empty() {
            continue;
        }
        match candidate.metadata() {
            Ok(meta) if meta.is_dir() => return Ok(candidate.to_path_buf()),
            Ok(_) => {
                // A file: its own directory holds it
                if let Some(parent) = candidate.parent().filter(|p| !p.as_os_str().is_empty()) {
                    return Ok(parent.to_path_buf());
                }
                return Ok(PathBuf::from("."));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => last_err = Some(e),
            Err(e) => {
                return Err(DiskCheckError::Query {
                    path: candidate.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    // Relative paths whose every component is missing live under the cwd.
    if path.is_relative() {
        return Ok(PathBuf::from("."));
    }

    Err(DiskCheckError::Query {
        path: path.to_path_buf(),
        source: last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_space_for_directory() {
        let temp = TempDir::new().unwrap();
        let report = disk_space(temp.path()).unwrap();

        assert_eq!(report.path, temp.path());
        assert!(report.total > 0);
        assert!(report.free <= report.total);
        assert_eq!(report.used, report.total - report.free);
        assert!((0.0..=100.0).contains(&report.used_percent));
        assert!(!report.free_formatted.is_empty());
    }

    #[test]
    fn test_disk_space_for_file_uses_parent() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("model.gguf");
        std::fs::write(&file, b"weights").unwrap();

        let report = disk_space(&file).unwrap();
        assert_eq!(report.path, temp.path());
    }

    #[test]
    fn test_disk_space_for_missing_path_uses_ancestor() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("models").join("nested").join("x.bin");

        let report = disk_space(&missing).unwrap();
        assert_eq!(report.path, temp.path());
    }

    #[test]
    fn test_check_disk_space_passes_for_small_request() {
        let temp = TempDir::new().unwrap();
        assert!(check_disk_space(temp.path(), 1).is_ok());
        assert!(check_disk_space(temp.path(), 0).is_ok());
    }

    #[test]
    fn test_check_disk_space_fails_for_huge_request() {
        let temp = TempDir::new().unwrap();
        let err = check_disk_space(temp.path(), u64::MAX).unwrap_err();

        match err {
            DiskCheckError::Insufficient(e) => {
                assert_eq!(e.required, u64::MAX);
                assert_eq!(e.path, temp.path());
                assert!(e.available < e.required);
                assert!(e.to_string().contains("insufficient disk space"));
            }
            other => panic!("Expected Insufficient, got {other:?}"),
        }
    }

    #[test]
    fn test_required_with_buffer() {
        assert_eq!(required_with_buffer(1000, 10), 1100);
        assert_eq!(required_with_buffer(1000, 0), 1000);
        assert_eq!(required_with_buffer(0, 50), 0);
        assert_eq!(required_with_buffer(u64::MAX, 10), u64::MAX);
    }

    #[test]
    fn test_check_disk_space_for_model_applies_buffer() {
        let temp = TempDir::new().unwrap();
        let free = disk_space(temp.path()).unwrap().free;

        // Fits without a buffer but not with a 100% one
        let size = free / 2 + 1024 * 1024;
        assert!(check_disk_space_for_model(temp.path(), size, 0).is_ok());
        assert!(matches!(
            check_disk_space_for_model(temp.path(), size, 100),
            Err(DiskCheckError::Insufficient(_))
        ));
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_MODEL_SIZE_BYTES, 8 * BYTES_PER_GB);
        assert_eq!(DEFAULT_BUFFER_PERCENT, 10);
    }
}
