//! Download error types and their retry classification.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::range::RangeError;
use crate::transport::TransportError;

/// Closed set of failure classes.
///
/// Retry decisions are made on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, rejected before any I/O.
    Validation,
    /// Connection or transfer failure.
    Network,
    /// The server answered in a way the protocol does not allow here.
    Protocol,
    /// Content does not match its expected checksum.
    Integrity,
    /// Not enough free disk space.
    DiskSpace,
    /// The caller cancelled the operation.
    Cancelled,
    /// Local filesystem failure.
    Io,
}

impl ErrorKind {
    /// Whether another attempt could succeed.
    pub fn is_retryable(self) -> bool {
        match self {
            Self::Network | Self::Protocol | Self::Io => true,
            Self::Validation | Self::Integrity | Self::DiskSpace | Self::Cancelled => false,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Protocol => "protocol",
            Self::Integrity => "integrity",
            Self::DiskSpace => "disk space",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors from a single download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download URL is empty")]
    MissingUrl,

    #[error("download destination is empty")]
    MissingDestination,

    #[error("invalid expected checksum: {0}")]
    InvalidExpectedChecksum(#[source] ChecksumError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("malformed Content-Range header: {0}")]
    MalformedContentRange(#[source] RangeError),

    #[error("server resumed at byte {actual}, requested {expected}")]
    ResumeOffsetMismatch { expected: u64, actual: u64 },

    #[error("download interrupted: received {received} of {expected} bytes")]
    IncompleteTransfer { received: u64, expected: u64 },

    #[error("server sent more than declared: {received} bytes, expected {expected}")]
    OversizedTransfer { received: u64, expected: u64 },

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("checksum verification failed: {0}")]
    Checksum(#[source] ChecksumError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingUrl | Self::MissingDestination | Self::InvalidExpectedChecksum(_) => {
                ErrorKind::Validation
            }
            Self::Transport { .. } | Self::IncompleteTransfer { .. } => ErrorKind::Network,
            Self::UnexpectedStatus { .. }
            | Self::MalformedContentRange(_)
            | Self::ResumeOffsetMismatch { .. }
            | Self::OversizedTransfer { .. } => ErrorKind::Protocol,
            Self::ChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::Checksum(_) | Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Shorthand for `self.kind().is_retryable()`.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kinds() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::Integrity,
            ErrorKind::DiskSpace,
            ErrorKind::Cancelled,
        ] {
            assert!(!kind.is_retryable(), "{kind} should be terminal");
        }
    }

    #[test]
    fn test_retryable_kinds() {
        for kind in [ErrorKind::Network, ErrorKind::Protocol, ErrorKind::Io] {
            assert!(kind.is_retryable(), "{kind} should be retryable");
        }
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(DownloadError::MissingUrl.kind(), ErrorKind::Validation);
        assert_eq!(DownloadError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            DownloadError::UnexpectedStatus {
                url: "http://x".into(),
                status: 500
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            DownloadError::Transport {
                url: "http://x".into(),
                source: TransportError::Request("refused".into()),
            }
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(
            DownloadError::IncompleteTransfer {
                received: 10,
                expected: 20
            }
            .kind(),
            ErrorKind::Network
        );

        let mismatch = DownloadError::ChecksumMismatch {
            path: PathBuf::from("model.gguf"),
            expected: "a".repeat(64),
            actual: "b".repeat(64),
        };
        assert_eq!(mismatch.kind(), ErrorKind::Integrity);
        assert!(!mismatch.is_retryable());
    }

    #[test]
    fn test_classification_ignores_message_text() {
        // A transport failure whose text mentions checksums stays retryable
        let err = DownloadError::Transport {
            url: "http://x".into(),
            source: TransportError::Body("checksum mismatch in proxy".into()),
        };
        assert!(err.is_retryable());
    }
}
