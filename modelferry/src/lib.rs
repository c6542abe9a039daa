//! modelferry - resumable, verified downloads of large model artifacts
//!
//! The crate fetches multi-gigabyte files over HTTP, resuming interrupted
//! transfers with Range requests and verifying them with SHA-256, and keeps a
//! registry of named artifacts that [`acquisition::ModelManager`] makes
//! available on local disk with retries and a disk space preflight.
//!
//! # Modules
//!
//! - [`checksum`]: SHA-256 hashing, verification and `.sha256` sidecar files
//! - [`range`]: `Range` / `Content-Range` header building and parsing
//! - [`progress`]: thread-safe progress tracker with smoothed speed and ETA
//! - [`disk`]: free space reports and preflight checks
//! - [`transport`]: the pluggable HTTP transport and its reqwest implementation
//! - [`download`]: single-attempt resumable download orchestrator
//! - [`acquisition`]: named artifact registry with retrying acquisition
//! - [`format`]: human-readable byte and speed formatting
//!
//! # Example
//!
//! ```ignore
//! use modelferry::acquisition::{ModelManager, DEFAULT_TEXT_MODEL};
//! use tokio_util::sync::CancellationToken;
//!
//! let manager = ModelManager::builder("/var/lib/models").build()?;
//! let outcome = manager
//!     .ensure_available(DEFAULT_TEXT_MODEL, &CancellationToken::new())
//!     .await?;
//! println!("model at {}", outcome.path.display());
//! ```

pub mod acquisition;
pub mod checksum;
pub mod disk;
pub mod download;
pub mod format;
pub mod progress;
pub mod range;
pub mod transport;

pub use acquisition::{
    AcquireError, AcquireOutcome, AcquisitionError, ArtifactDescriptor, ModelManager,
    ModelManagerBuilder,
};
pub use download::{
    download, download_simple, download_with_resume, DownloadError, DownloadRequest,
    DownloadResult, ErrorKind,
};
pub use progress::{ProgressCallback, ProgressSnapshot, ProgressTracker};
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
