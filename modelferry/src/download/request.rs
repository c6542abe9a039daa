//! Download request and result types.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::progress::{ProgressCallback, ProgressTracker};

/// Parameters for one download.
#[derive(Clone, Default)]
pub struct DownloadRequest {
    /// Source URL.
    pub url: String,
    /// Destination file path.
    pub destination: PathBuf,
    /// Expected SHA-256 as 64 hex characters; `None` skips verification.
    pub expected_sha256: Option<String>,
    /// Called with progress snapshots while streaming.
    pub progress: Option<ProgressCallback>,
    /// Tracker advanced while streaming, for callers polling progress.
    pub tracker: Option<Arc<ProgressTracker>>,
    /// Continue from an existing partial file.
    pub resume: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Verify the finished file against this hash. An empty string disables
    /// verification.
    pub fn with_expected_sha256(mut self, sha256: impl Into<String>) -> Self {
        let sha256 = sha256.into();
        self.expected_sha256 = (!sha256.is_empty()).then_some(sha256);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
}

impl std::fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.url)
            .field("destination", &self.destination)
            .field("expected_sha256", &self.expected_sha256)
            .field("progress", &self.progress.is_some())
            .field("tracker", &self.tracker.is_some())
            .field("resume", &self.resume)
            .finish()
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// Bytes transferred in this session.
    pub bytes_downloaded: u64,
    /// Full size of the resource (0 if unknown).
    pub total_bytes: u64,
    /// Whether the transfer continued an existing partial file.
    pub resumed: bool,
    /// Whether the file was verified against an expected checksum.
    pub checksum_valid: bool,
    /// Destination path.
    pub path: PathBuf,
}

impl DownloadResult {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
