//! `sha256sum`-compatible checksum files.
//!
//! A checksum line is `<64-hex><two spaces><filename>` with the filename only
//! (no directory component), so the files can be checked with
//! `sha256sum -c` or `shasum -a 256 -c` from the directory holding them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::{sha256_file, validate_sha256, ChecksumError};

/// Extension appended to an artifact's filename for its sidecar file.
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// Outcome of writing a single sidecar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarResult {
    /// Path of the written `<file>.sha256`.
    pub checksum_file: PathBuf,
    /// Digest of the artifact.
    pub checksum: String,
}

/// One parsed checksum line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Lowercase hex digest.
    pub hash: String,
    /// Filename the digest applies to.
    pub filename: String,
    /// Whether the line used the `*` binary-mode marker.
    pub binary: bool,
}

/// Format a single checksum line (without the trailing newline).
pub fn format_checksum_line(checksum: &str, filename: &str) -> String {
    format!("{}  {}", checksum, filename)
}

/// Parse a line produced by [`format_checksum_line`] or by `sha256sum`.
///
/// Accepts both the text-mode separator (two spaces) and the binary-mode
/// separator (space followed by `*`).
pub fn parse_checksum_line(line: &str) -> Result<ChecksumEntry, ChecksumError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let malformed = || ChecksumError::MalformedLine(line.to_string());

    let hash = line.get(..super::SHA256_HEX_LEN).ok_or_else(malformed)?;
    let rest = line.get(super::SHA256_HEX_LEN..).ok_or_else(malformed)?;
    validate_sha256(hash).map_err(|_| malformed())?;

    let (binary, filename) = if let Some(name) = rest.strip_prefix("  ") {
        (false, name)
    } else if let Some(name) = rest.strip_prefix(" *") {
        (true, name)
    } else {
        return Err(malformed());
    };

    if filename.is_empty() {
        return Err(malformed());
    }

    Ok(ChecksumEntry {
        hash: hash.to_ascii_lowercase(),
        filename: filename.to_string(),
        binary,
    })
}

/// Read every entry of a checksum file, skipping blank lines.
pub fn read_checksum_file(path: &Path) -> Result<Vec<ChecksumEntry>, ChecksumError> {
    let content = fs::read_to_string(path).map_err(|e| ChecksumError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_checksum_line)
        .collect()
}

/// Hash `path` and write `<path>.sha256` next to it.
///
/// For `release/app.tar.gz` this creates `release/app.tar.gz.sha256`
/// containing `"<hash>  app.tar.gz\n"`.
pub fn write_checksum_file(path: &Path) -> Result<SidecarResult, ChecksumError> {
    let filename = file_name_of(path)?;
    let checksum = sha256_file(path)?;

    let mut sidecar = OsString::from(path.as_os_str());
    sidecar.push(".");
    sidecar.push(CHECKSUM_EXTENSION);
    let checksum_file = PathBuf::from(sidecar);

    let content = format!("{}\n", format_checksum_line(&checksum, &filename));
    fs::write(&checksum_file, content).map_err(|e| ChecksumError::Write {
        path: checksum_file.clone(),
        source: e,
    })?;

    Ok(SidecarResult {
        checksum_file,
        checksum,
    })
}

/// Write a sidecar for each path.
///
/// Every path is processed even when an earlier one fails; the caller gets
/// one result per input.
pub fn write_checksum_files<P: AsRef<Path>>(
    paths: &[P],
) -> BTreeMap<PathBuf, Result<SidecarResult, ChecksumError>> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            (path.to_path_buf(), write_checksum_file(path))
        })
        .collect()
}

/// Write a combined manifest with one checksum line per input file.
///
/// Returns the filename → digest mapping that was written. Nothing is
/// written if any input cannot be hashed or two inputs share a file name.
pub fn write_manifest<P: AsRef<Path>>(
    output: &Path,
    paths: &[P],
) -> Result<BTreeMap<String, String>, ChecksumError> {
    if output.as_os_str().is_empty() {
        return Err(ChecksumError::InvalidArgument(
            "output path cannot be empty".to_string(),
        ));
    }
    if paths.is_empty() {
        return Err(ChecksumError::InvalidArgument(
            "no files provided".to_string(),
        ));
    }

    let mut checksums = BTreeMap::new();
    let mut content = String::new();

    for p in paths {
        let path = p.as_ref();
        let filename = file_name_of(path)?;
        if checksums.contains_key(&filename) {
            return Err(ChecksumError::InvalidArgument(format!(
                "duplicate file name {filename} in manifest"
            )));
        }
        let checksum = sha256_file(path)?;
        let _ = writeln!(content, "{}", format_checksum_line(&checksum, &filename));
        checksums.insert(filename, checksum);
    }

    fs::write(output, content).map_err(|e| ChecksumError::Write {
        path: output.to_path_buf(),
        source: e,
    })?;

    Ok(checksums)
}

fn file_name_of(path: &Path) -> Result<String, ChecksumError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ChecksumError::InvalidArgument(format!("{} has no file name", path.display()))
        })
}

/// Command-line tool an operator can use to hash a file by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumCommand {
    /// GNU coreutils `sha256sum` (Linux).
    Sha256sum,
    /// Perl `shasum -a 256` (macOS).
    Shasum,
    /// `certutil -hashfile <file> SHA256` (Windows).
    Certutil,
}

impl ChecksumCommand {
    /// The command native to the platform this binary was built for.
    pub fn for_platform() -> Self {
        if cfg!(target_os = "windows") {
            Self::Certutil
        } else if cfg!(target_os = "macos") {
            Self::Shasum
        } else {
            Self::Sha256sum
        }
    }

    /// Render the full command line for `path`.
    pub fn render(&self, path: &Path) -> String {
        match self {
            Self::Sha256sum => format!("sha256sum {:?}", path.display().to_string()),
            Self::Shasum => format!("shasum -a 256 {:?}", path.display().to_string()),
            Self::Certutil => {
                format!("certutil -hashfile {:?} SHA256", path.display().to_string())
            }
        }
    }
}
