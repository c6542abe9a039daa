//! Error types for artifact acquisition.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::checksum::{ChecksumCommand, ChecksumError};
use crate::disk::DiskCheckError;
use crate::download::{DownloadError, ErrorKind};

/// Errors from [`ModelManager::ensure_available`](super::ModelManager::ensure_available).
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("unknown artifact {name:?} (available: {})", available.join(", "))]
    UnknownArtifact { name: String, available: Vec<String> },

    #[error("artifact path is a directory: {}", path.display())]
    IsDirectory { path: PathBuf },

    #[error(
        "artifact {name} is corrupt: checksum mismatch for {} (expected {expected}, got {actual})",
        path.display()
    )]
    CorruptArtifact {
        name: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("cannot verify existing artifact {}: {source}", path.display())]
    Checksum {
        path: PathBuf,
        #[source]
        source: ChecksumError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not enough disk space for {name} (with {buffer_percent}% buffer): {source}")]
    DiskSpace {
        name: String,
        buffer_percent: u32,
        #[source]
        source: DiskCheckError,
    },

    #[error("acquisition cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] AcquisitionError),
}

impl AcquireError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownArtifact { .. } | Self::IsDirectory { .. } => ErrorKind::Validation,
            Self::CorruptArtifact { .. } => ErrorKind::Integrity,
            Self::Checksum { .. } | Self::Io { .. } => ErrorKind::Io,
            Self::DiskSpace { source, .. } => match source {
                DiskCheckError::Insufficient(_) => ErrorKind::DiskSpace,
                DiskCheckError::Query { .. } => ErrorKind::Io,
            },
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Failed(e) => e.cause.kind(),
        }
    }
}

/// A download that failed for good, with what an operator needs to finish
/// it by hand.
#[derive(Debug)]
pub struct AcquisitionError {
    /// Artifact name.
    pub name: String,
    /// Error of the last attempt.
    pub cause: DownloadError,
    /// Summary, e.g. `download failed after 3 attempts`.
    pub message: String,
    /// Source URL.
    pub url: String,
    /// Where the file must be placed.
    pub destination: PathBuf,
    /// Expected SHA-256, empty if none is published.
    pub expected_sha256: String,
    /// Attempts made.
    pub attempts: u32,
}

impl std::fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "artifact download failed: {}", self.name)?;
        writeln!(f)?;
        writeln!(f, "{}: {}", self.message, self.cause)?;
        writeln!(f)?;
        writeln!(f, "Manual download instructions:")?;
        writeln!(f, "  1. Download: {}", self.url)?;
        writeln!(f, "  2. Save to:  {}", self.destination.display())?;
        if self.expected_sha256.is_empty() {
            writeln!(f, "  3. No checksum is published for this artifact")?;
        } else {
            writeln!(f, "  3. Verify SHA-256: {}", self.expected_sha256)?;
            writeln!(
                f,
                "     e.g. {}",
                ChecksumCommand::for_platform().render(&self.destination)
            )?;
        }
        write!(f, "  4. Run the command again")
    }
}

impl std::error::Error for AcquisitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failure(expected_sha256: &str) -> AcquisitionError {
        AcquisitionError {
            name: "sd-turbo".to_string(),
            cause: DownloadError::UnexpectedStatus {
                url: "https://example.com/sd.bin".to_string(),
                status: 503,
            },
            message: "download failed after 3 attempts".to_string(),
            url: "https://example.com/sd.bin".to_string(),
            destination: PathBuf::from("/models/sd.bin"),
            expected_sha256: expected_sha256.to_string(),
            attempts: 3,
        }
    }

    #[test]
    fn test_manual_instructions() {
        let text = failure(&"ab".repeat(32)).to_string();

        assert!(text.starts_with("artifact download failed: sd-turbo"));
        assert!(text.contains("download failed after 3 attempts"));
        assert!(text.contains("unexpected status code 503"));
        assert!(text.contains("Manual download instructions:"));
        assert!(text.contains("1. Download: https://example.com/sd.bin"));
        assert!(text.contains("2. Save to:  /models/sd.bin"));
        assert!(text.contains(&format!("Verify SHA-256: {}", "ab".repeat(32))));
        assert!(text.contains("sd.bin"));
    }

    #[test]
    fn test_manual_instructions_without_checksum() {
        let text = failure("").to_string();
        assert!(text.contains("No checksum is published"));
        assert!(!text.contains("Verify SHA-256"));
    }

    #[test]
    fn test_failed_keeps_cause_kind_and_source() {
        let err = AcquireError::from(failure(""));
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unknown_artifact_lists_names() {
        let err = AcquireError::UnknownArtifact {
            name: "llama".to_string(),
            available: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "unknown artifact \"llama\" (available: a, b)");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
