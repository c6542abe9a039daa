//! CLI error type.

use std::path::PathBuf;

use modelferry::checksum::ChecksumError;
use modelferry::disk::DiskCheckError;
use modelferry::{AcquireError, TransportError};
use thiserror::Error;

/// Exit code for a run interrupted by Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors surfaced to the user by the `modelferry` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read config file {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to set signal handler: {0}")]
    Signal(String),

    #[error("failed to create HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("{failed} of {total} artifacts could not be fetched")]
    FetchFailed { failed: usize, total: usize },

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("{failed} of {total} files could not be hashed")]
    ChecksumFailed { failed: usize, total: usize },

    #[error("checksum mismatch for {}", path.display())]
    Mismatch { path: PathBuf },

    #[error(transparent)]
    Disk(#[from] DiskCheckError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted | Self::Acquire(AcquireError::Cancelled) => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Interrupted.exit_code(), 130);
        assert_eq!(CliError::Acquire(AcquireError::Cancelled).exit_code(), 130);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
        assert_eq!(
            CliError::Mismatch {
                path: PathBuf::from("m.gguf")
            }
            .exit_code(),
            1
        );
    }
}
