//! Model acquisition: make a named artifact available on local disk.
//!
//! [`ModelManager::ensure_available`] resolves an artifact from the registry
//! and returns as soon as a usable copy exists. Otherwise it checks free disk
//! space and then downloads with retries:
//!
//! ```text
//! lookup ─► existing file? ─► disk preflight ─► attempt 1 ─► attempt 2 ─► ...
//!              │ verified                         │ ok           (base·2^(n-2) wait)
//!              ▼                                  ▼
//!            done                               done
//! ```
//!
//! Every attempt resumes from what previous attempts left on disk. Only
//! network, protocol and local I/O failures are retried; cancellation,
//! checksum mismatches and disk space shortfalls end the loop at once.

mod artifact;
mod backoff;
mod config;
mod error;

pub use artifact::{
    default_artifacts, ArtifactDescriptor, ArtifactRegistry, DEFAULT_IMAGE_MODEL,
    DEFAULT_TEXT_MODEL, DEFAULT_VISION_PROJECTOR,
};
pub use backoff::{BackoffPolicy, DEFAULT_BASE_RETRY_DELAY, DEFAULT_MAX_RETRIES};
pub use config::ModelManagerBuilder;
pub use error::{AcquireError, AcquisitionError};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checksum::sha256_file;
use crate::disk::check_disk_space_for_model;
use crate::download::{download, DownloadError, DownloadRequest, DownloadResult};
use crate::format::format_bytes;
use crate::progress::ProgressCallback;
use crate::transport::HttpTransport;

/// Result of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOutcome {
    /// Local path of the artifact.
    pub path: PathBuf,
    /// Download attempts made; 0 when the file was already present.
    pub attempts: u32,
    /// Result of the successful attempt, if one was needed.
    pub download: Option<DownloadResult>,
}

impl AcquireOutcome {
    /// Whether the artifact was already present.
    pub fn was_present(&self) -> bool {
        self.download.is_none()
    }
}

/// What was found at an artifact's destination.
enum Existing {
    Verified,
    /// Missing or empty.
    Absent,
}

/// Ensures registered artifacts are present in a model directory.
///
/// Cheap to share: independent acquisitions may run concurrently and share
/// only the immutable registry and the transport.
pub struct ModelManager {
    model_dir: PathBuf,
    transport: Arc<dyn HttpTransport>,
    registry: Arc<ArtifactRegistry>,
    backoff: BackoffPolicy,
    disk_buffer_percent: u32,
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("model_dir", &self.model_dir)
            .field("registry", &self.registry)
            .field("backoff", &self.backoff)
            .field("disk_buffer_percent", &self.disk_buffer_percent)
            .finish_non_exhaustive()
    }
}

impl ModelManager {
    /// Start configuring a manager for `model_dir`.
    pub fn builder(model_dir: impl Into<PathBuf>) -> ModelManagerBuilder {
        ModelManagerBuilder::new(model_dir)
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    pub fn disk_buffer_percent(&self) -> u32 {
        self.disk_buffer_percent
    }

    pub fn artifact(&self, name: &str) -> Option<&ArtifactDescriptor> {
        self.registry.get(name)
    }

    /// Registered artifact names, sorted.
    pub fn artifact_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Where `name` lives on disk. Does not check that the file exists.
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf, AcquireError> {
        self.lookup(name)
            .map(|artifact| self.model_dir.join(&artifact.filename))
    }

    /// Make `name` available locally, downloading it if needed.
    pub async fn ensure_available(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<AcquireOutcome, AcquireError> {
        self.acquire(name, cancel, None).await
    }

    /// [`ensure_available`](Self::ensure_available) reporting download
    /// progress to `callback`.
    pub async fn ensure_available_with_progress(
        &self,
        name: &str,
        cancel: &CancellationToken,
        callback: ProgressCallback,
    ) -> Result<AcquireOutcome, AcquireError> {
        self.acquire(name, cancel, Some(callback)).await
    }

    fn lookup(&self, name: &str) -> Result<&ArtifactDescriptor, AcquireError> {
        self.registry
            .get(name)
            .ok_or_else(|| AcquireError::UnknownArtifact {
                name: name.to_string(),
                available: self.registry.names(),
            })
    }

    async fn acquire(
        &self,
        name: &str,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<AcquireOutcome, AcquireError> {
        let artifact = self.lookup(name)?;
        let path = self.model_dir.join(&artifact.filename);

        if let Existing::Verified = inspect_existing(artifact, &path).await? {
            debug!(artifact = name, path = %path.display(), "Artifact already present");
            return Ok(AcquireOutcome {
                path,
                attempts: 0,
                download: None,
            });
        }

        if artifact.size_bytes > 0 {
            check_disk_space_for_model(
                &self.model_dir,
                artifact.size_bytes,
                self.disk_buffer_percent,
            )
            .map_err(|source| AcquireError::DiskSpace {
                name: name.to_string(),
                buffer_percent: self.disk_buffer_percent,
                source,
            })?;
        }

        fs::create_dir_all(&self.model_dir)
            .await
            .map_err(|source| AcquireError::Io {
                path: self.model_dir.clone(),
                source,
            })?;

        let mut request = DownloadRequest::new(&artifact.url, &path)
            .with_expected_sha256(&artifact.sha256)
            .with_resume(true);
        request.progress = progress;

        info!(
            artifact = name,
            url = %artifact.url,
            size = %format_bytes(artifact.size_bytes),
            "Downloading artifact"
        );

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }
            if attempt > 1 {
                let delay = self.backoff.delay_before(attempt);
                debug!(artifact = name, attempt, ?delay, "Waiting before retry");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match download(&request, self.transport.as_ref(), cancel).await {
                Ok(result) => {
                    info!(
                        artifact = name,
                        attempt,
                        bytes = result.bytes_downloaded,
                        "Artifact ready"
                    );
                    return Ok(AcquireOutcome {
                        path,
                        attempts: attempt,
                        download: Some(result),
                    });
                }
                Err(DownloadError::Cancelled) => return Err(AcquireError::Cancelled),
                Err(e) => {
                    let retry = e.is_retryable() && self.backoff.allows_retry_after(attempt);
                    warn!(
                        artifact = name,
                        attempt,
                        kind = %e.kind(),
                        error = %e,
                        retry,
                        "Download attempt failed"
                    );
                    if !retry {
                        return Err(self.failure(artifact, path, e, attempt).into());
                    }
                }
            }
            attempt += 1;
        }
    }

    fn failure(
        &self,
        artifact: &ArtifactDescriptor,
        destination: PathBuf,
        cause: DownloadError,
        attempts: u32,
    ) -> AcquisitionError {
        let message = if cause.is_retryable() {
            format!("download failed after {attempts} attempts")
        } else {
            format!("download failed on attempt {attempts} ({} error)", cause.kind())
        };
        AcquisitionError {
            name: artifact.name.clone(),
            cause,
            message,
            url: artifact.url.clone(),
            destination,
            expected_sha256: artifact.sha256.clone(),
            attempts,
        }
    }
}

/// Classify the file at `path`.
///
/// A file whose checksum does not match is corrupt and is left in place
/// for the operator; it is never downloaded over.
async fn inspect_existing(
    artifact: &ArtifactDescriptor,
    path: &Path,
) -> Result<Existing, AcquireError> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Existing::Absent),
        Err(source) => {
            return Err(AcquireError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if meta.is_dir() {
        return Err(AcquireError::IsDirectory {
            path: path.to_path_buf(),
        });
    }
    if meta.len() == 0 {
        return Ok(Existing::Absent);
    }
    if !artifact.has_checksum() {
        return Ok(Existing::Verified);
    }

    let owned = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || sha256_file(&owned))
        .await
        .map_err(|e| AcquireError::Io {
            path: path.to_path_buf(),
            source: io::Error::other(e),
        })?
        .map_err(|source| AcquireError::Checksum {
            path: path.to_path_buf(),
            source,
        })?;

    if actual.eq_ignore_ascii_case(&artifact.sha256) {
        return Ok(Existing::Verified);
    }

    Err(AcquireError::CorruptArtifact {
        name: artifact.name.clone(),
        path: path.to_path_buf(),
        expected: artifact.sha256.to_ascii_lowercase(),
        actual,
    })
}
