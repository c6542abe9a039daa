//! Single-attempt resumable downloader.
//!
//! [`download`] runs one attempt of a download:
//!
//! ```text
//! validate ─► stat destination ─► GET (Range if resuming)
//!                                   ├── 200 ─► truncate, stream
//!                                   ├── 206 ─► append, stream
//!                                   ├── 416 ─► already complete? done
//!                                   │          else delete, restart once
//!                                   └── other ─► UnexpectedStatus
//! stream ─► flush + sync ─► verify checksum ─► DownloadResult
//! ```
//!
//! It never retries on its own apart from the single 416 restart; retry
//! policy belongs to the caller (see [`crate::acquisition`]). A failed attempt
//! leaves whatever was received on disk so the next attempt can resume.

mod error;
mod request;
mod stream;

pub use error::{DownloadError, ErrorKind};
pub use request::{DownloadRequest, DownloadResult};
pub use stream::CALLBACK_INTERVAL_BYTES;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checksum::{sha256_file, validate_sha256};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::range::{build_range_header, parse_content_range};
use crate::transport::{ByteStream, HttpTransport, TransportError, TransportResponse};

use self::stream::ProgressSink;

/// Write buffer for the destination file (64KB).
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// How one pass through the state machine ended.
enum Attempt {
    Complete(DownloadResult),
    /// The server rejected the resume offset and the local file is not a
    /// verified copy.
    RangeNotSatisfiable,
}

/// Download `request.url` to `request.destination`.
///
/// Resumes from an existing partial file when `request.resume` is set and
/// verifies the result when an expected checksum is given. The request and
/// every body read race against `cancel`.
pub async fn download(
    request: &DownloadRequest,
    transport: &dyn HttpTransport,
    cancel: &CancellationToken,
) -> Result<DownloadResult, DownloadError> {
    validate(request)?;
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    ensure_parent_dir(&request.destination).await?;

    match attempt(request, transport, cancel, request.resume).await? {
        Attempt::Complete(result) => Ok(result),
        Attempt::RangeNotSatisfiable => {
            warn!(
                url = %request.url,
                path = %request.destination.display(),
                "Range not satisfiable, restarting without resume"
            );
            remove_partial(&request.destination).await?;
            match attempt(request, transport, cancel, false).await? {
                Attempt::Complete(result) => Ok(result),
                Attempt::RangeNotSatisfiable => Err(DownloadError::UnexpectedStatus {
                    url: request.url.clone(),
                    status: 416,
                }),
            }
        }
    }
}

/// Download without resume or checksum verification.
pub async fn download_simple(
    url: &str,
    destination: impl Into<PathBuf>,
    progress: Option<ProgressCallback>,
    transport: &dyn HttpTransport,
    cancel: &CancellationToken,
) -> Result<DownloadResult, DownloadError> {
    let mut request = DownloadRequest::new(url, destination);
    request.progress = progress;
    download(&request, transport, cancel).await
}

/// Download with resume and, when `expected_sha256` is non-empty, checksum
/// verification.
pub async fn download_with_resume(
    url: &str,
    destination: impl Into<PathBuf>,
    expected_sha256: &str,
    progress: Option<ProgressCallback>,
    transport: &dyn HttpTransport,
    cancel: &CancellationToken,
) -> Result<DownloadResult, DownloadError> {
    let mut request = DownloadRequest::new(url, destination)
        .with_expected_sha256(expected_sha256)
        .with_resume(true);
    request.progress = progress;
    download(&request, transport, cancel).await
}

fn validate(request: &DownloadRequest) -> Result<(), DownloadError> {
    if request.url.trim().is_empty() {
        return Err(DownloadError::MissingUrl);
    }
    if request.destination.as_os_str().is_empty() {
        return Err(DownloadError::MissingDestination);
    }
    if let Some(expected) = &request.expected_sha256 {
        validate_sha256(expected).map_err(DownloadError::InvalidExpectedChecksum)?;
    }
    Ok(())
}

async fn attempt(
    request: &DownloadRequest,
    transport: &dyn HttpTransport,
    cancel: &CancellationToken,
    resume: bool,
) -> Result<Attempt, DownloadError> {
    let dest = request.destination.as_path();
    let offset = if resume { existing_len(dest).await? } else { 0 };

    let mut headers = HeaderMap::new();
    if offset > 0 {
        let range = build_range_header(i64::try_from(offset).unwrap_or(i64::MAX));
        let value = HeaderValue::from_str(&range).map_err(|e| DownloadError::Transport {
            url: request.url.clone(),
            source: TransportError::Request(format!("invalid Range header {range:?}: {e}")),
        })?;
        headers.insert(RANGE, value);
    }

    debug!(url = %request.url, offset, "Sending request");
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        response = transport.get(&request.url, headers) => {
            response.map_err(|source| DownloadError::Transport {
                url: request.url.clone(),
                source,
            })?
        }
    };

    let (resumed, total) = match response.status {
        200 => {
            if offset > 0 {
                debug!(url = %request.url, offset, "Server ignored Range, starting over");
            }
            (false, response.content_length().unwrap_or(0))
        }
        206 => (offset > 0, partial_total(&response, offset)?),
        416 if offset > 0 => return range_not_satisfiable(request, offset).await,
        status => {
            return Err(DownloadError::UnexpectedStatus {
                url: request.url.clone(),
                status,
            })
        }
    };
    debug!(
        url = %request.url,
        status = response.status,
        resumed,
        total,
        "Streaming response"
    );

    let start = if resumed { offset } else { 0 };
    let tracker = match &request.tracker {
        Some(tracker) => {
            tracker.reset(total);
            Arc::clone(tracker)
        }
        None => Arc::new(ProgressTracker::new(total)),
    };
    tracker.set_downloaded(start);
    let mut sink = ProgressSink::new(tracker, request.progress.clone());

    let mut options = OpenOptions::new();
    options.create(true);
    if resumed {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let file = options
        .open(dest)
        .await
        .map_err(|e| DownloadError::io(dest, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    // Flush even when the copy fails so the partial file holds every
    // received byte for the next resume.
    let span = (start, total);
    let copied = copy_body(response.body, &mut writer, &mut sink, cancel, request, span).await;
    let synced = finish_file(writer).await;
    let written = copied?;
    synced.map_err(|e| DownloadError::io(dest, e))?;
    sink.finish();

    let on_disk = start + written;
    if total > 0 && on_disk < total {
        return Err(DownloadError::IncompleteTransfer {
            received: on_disk,
            expected: total,
        });
    }

    let checksum_valid = match &request.expected_sha256 {
        Some(expected) => {
            verify_file(dest, expected).await?;
            true
        }
        None => false,
    };

    info!(
        url = %request.url,
        path = %dest.display(),
        bytes = written,
        resumed,
        checksum_valid,
        "Download complete"
    );

    Ok(Attempt::Complete(DownloadResult {
        bytes_downloaded: written,
        total_bytes: total,
        resumed,
        checksum_valid,
        path: dest.to_path_buf(),
    }))
}

/// Total size for a 206 response.
///
/// A present `Content-Range` must parse and start at the requested offset;
/// otherwise the total falls back to offset + declared length.
fn partial_total(response: &TransportResponse, offset: u64) -> Result<u64, DownloadError> {
    let declared = response.content_length().map(|len| offset + len);
    let Some(header) = response.content_range() else {
        return Ok(declared.unwrap_or(0));
    };

    let range = parse_content_range(header).map_err(DownloadError::MalformedContentRange)?;
    if range.start != offset {
        return Err(DownloadError::ResumeOffsetMismatch {
            expected: offset,
            actual: range.start,
        });
    }
    Ok(range.total.or(declared).unwrap_or(0))
}

async fn range_not_satisfiable(
    request: &DownloadRequest,
    offset: u64,
) -> Result<Attempt, DownloadError> {
    let dest = request.destination.as_path();
    let Some(expected) = &request.expected_sha256 else {
        return Ok(Attempt::RangeNotSatisfiable);
    };

    let actual = file_sha256(dest).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        debug!(path = %dest.display(), "Existing file does not match expected checksum");
        return Ok(Attempt::RangeNotSatisfiable);
    }

    info!(path = %dest.display(), "File already complete and verified");
    if let Some(tracker) = &request.tracker {
        tracker.reset(offset);
        tracker.set_downloaded(offset);
    }
    if let Some(callback) = &request.progress {
        let tracker = ProgressTracker::new(offset);
        tracker.set_downloaded(offset);
        callback(&tracker.snapshot());
    }

    Ok(Attempt::Complete(DownloadResult {
        bytes_downloaded: 0,
        total_bytes: offset,
        resumed: true,
        checksum_valid: true,
        path: dest.to_path_buf(),
    }))
}

async fn copy_body(
    mut body: ByteStream,
    writer: &mut BufWriter<fs::File>,
    sink: &mut ProgressSink,
    cancel: &CancellationToken,
    request: &DownloadRequest,
    (start, total): (u64, u64),
) -> Result<u64, DownloadError> {
    // Never write past the declared total
    let limit = (total > 0).then(|| total.saturating_sub(start));
    let mut written = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            next = body.next() => next,
        };
        let Some(chunk) = next else {
            return Ok(written);
        };
        let chunk = chunk.map_err(|source| DownloadError::Transport {
            url: request.url.clone(),
            source,
        })?;

        let n = chunk.len() as u64;
        let allowed = match limit {
            Some(limit) if written + n > limit => limit - written,
            _ => n,
        };
        writer
            .write_all(&chunk[..allowed as usize])
            .await
            .map_err(|e| DownloadError::io(&request.destination, e))?;
        written += allowed;
        sink.record(allowed);

        if allowed < n {
            return Err(DownloadError::OversizedTransfer {
                received: start + written + (n - allowed),
                expected: total,
            });
        }
    }
}

/// Flush buffered data and sync it to durable storage, releasing the handle.
async fn finish_file(mut writer: BufWriter<fs::File>) -> io::Result<()> {
    writer.flush().await?;
    let file = writer.into_inner();
    file.sync_all().await
}

async fn verify_file(path: &Path, expected: &str) -> Result<(), DownloadError> {
    let actual = file_sha256(path).await?;
    if actual.eq_ignore_ascii_case(expected) {
        debug!(path = %path.display(), "Checksum verified");
        Ok(())
    } else {
        Err(DownloadError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_ascii_lowercase(),
            actual,
        })
    }
}

async fn file_sha256(path: &Path) -> Result<String, DownloadError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha256_file(&owned))
        .await
        .map_err(|e| DownloadError::io(path, io::Error::other(e)))?
        .map_err(DownloadError::Checksum)
}

/// Length of an existing regular file at `path`, 0 if there is none.
async fn existing_len(path: &Path) -> Result<u64, DownloadError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Ok(0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), DownloadError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e)),
        None => Ok(()),
    }
}

async fn remove_partial(path: &Path) -> Result<(), DownloadError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}
