//! SHA-256 checksum calculation for artifact verification.
//!
//! This module provides:
//! - Streaming hashing of files, readers and in-memory buffers
//! - Verification against an expected digest (case-insensitive)
//! - `sha256sum`-compatible sidecar and manifest files (`sidecar`)
//!
//! Every digest is 64 lowercase hexadecimal characters.

mod sidecar;

pub use sidecar::{
    format_checksum_line, parse_checksum_line, read_checksum_file, write_checksum_file,
    write_checksum_files, write_manifest, ChecksumCommand, ChecksumEntry, SidecarResult,
    CHECKSUM_EXTENSION,
};

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Errors produced by the checksum engine.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// A caller-supplied argument was rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A reader failed mid-stream.
    #[error("failed to read data: {0}")]
    Stream(#[source] io::Error),

    /// A checksum file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A checksum line did not match `<hash>  <filename>`.
    #[error("malformed checksum line: {0:?}")]
    MalformedLine(String),
}

/// Calculate the SHA-256 checksum of a file.
///
/// # Errors
///
/// Returns an error if the path is empty or the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String, ChecksumError> {
    if path.as_os_str().is_empty() {
        return Err(ChecksumError::InvalidArgument(
            "file path cannot be empty".to_string(),
        ));
    }

    let file = File::open(path).map_err(|e| ChecksumError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    sha256_reader(file).map_err(|e| match e {
        ChecksumError::Stream(source) => ChecksumError::Read {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Calculate the SHA-256 checksum of everything a reader yields.
pub fn sha256_reader<R: Read>(mut reader: R) -> Result<String, ChecksumError> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChecksumError::Stream(e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the SHA-256 checksum of an in-memory buffer.
pub fn sha256_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Check that `expected` looks like a SHA-256 digest: 64 hex characters.
pub fn validate_sha256(expected: &str) -> Result<(), ChecksumError> {
    if expected.is_empty() {
        return Err(ChecksumError::InvalidArgument(
            "expected hash cannot be empty".to_string(),
        ));
    }
    if expected.len() != SHA256_HEX_LEN {
        return Err(ChecksumError::InvalidArgument(format!(
            "invalid SHA-256 hash length: expected {} characters, got {}",
            SHA256_HEX_LEN,
            expected.len()
        )));
    }
    if !expected.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ChecksumError::InvalidArgument(format!(
            "invalid SHA-256 hash format: {expected:?} is not hexadecimal"
        )));
    }
    Ok(())
}

/// Hash a file and compare it against an expected digest.
///
/// The comparison is case-insensitive. Returns `Ok(false)` on a mismatch;
/// errors are reserved for a malformed `expected` value or unreadable files.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<bool, ChecksumError> {
    validate_sha256(expected)?;
    let actual = sha256_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        assert_eq!(sha256_file(&file_path).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_sha256_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.txt");
        File::create(&file_path).unwrap();

        // SHA-256 of empty string
        assert_eq!(
            sha256_file(&file_path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_nonexistent_file() {
        let result = sha256_file(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(ChecksumError::Read { .. })));
    }

    #[test]
    fn test_sha256_empty_path() {
        let result = sha256_file(Path::new(""));
        assert!(matches!(result, Err(ChecksumError::InvalidArgument(_))));
    }

    #[test]
    fn test_reader_bytes_and_file_agree() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");

        // Larger than the read buffer
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file_path, &data).unwrap();

        let from_file = sha256_file(&file_path).unwrap();
        let from_reader = sha256_reader(io::Cursor::new(&data)).unwrap();
        let from_bytes = sha256_bytes(&data);

        assert_eq!(from_file, from_reader);
        assert_eq!(from_file, from_bytes);
        assert_eq!(from_file.len(), SHA256_HEX_LEN);
    }

    #[test]
    fn test_verify_checksum_match_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        assert!(verify_checksum(&file_path, HELLO_WORLD).unwrap());
        assert!(verify_checksum(&file_path, &HELLO_WORLD.to_uppercase()).unwrap());
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world!").unwrap();

        assert!(!verify_checksum(&file_path, HELLO_WORLD).unwrap());
    }

    #[test]
    fn test_verify_checksum_rejects_bad_expected() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        let candidates = vec![
            String::new(),
            "abc".to_string(),
            "g".repeat(64),
            format!("{HELLO_WORLD}00"),
        ];
        for bad in &candidates {
            let result = verify_checksum(&file_path, bad);
            assert!(
                matches!(result, Err(ChecksumError::InvalidArgument(_))),
                "expected rejection for {bad:?}"
            );
        }
    }
}
