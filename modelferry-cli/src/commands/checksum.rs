//! `checksum` and `verify` commands.

use std::path::{Path, PathBuf};

use modelferry::checksum::{sha256_file, verify_checksum, write_checksum_files, write_manifest};

use crate::error::CliError;

/// Write `.sha256` sidecars for `files`, or one manifest when `manifest` is set.
pub fn run(files: &[PathBuf], manifest: Option<&Path>) -> Result<(), CliError> {
    if let Some(output) = manifest {
        let entries = write_manifest(output, files)?;
        for (name, hash) in &entries {
            println!("{hash}  {name}");
        }
        println!("Wrote {} entries to {}", entries.len(), output.display());
        return Ok(());
    }

    let results = write_checksum_files(files);
    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(sidecar) => println!("{}  {}", sidecar.checksum, sidecar.checksum_file.display()),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", path.display());
            }
        }
    }

    if failed > 0 {
        return Err(CliError::ChecksumFailed {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

/// Check `file` against an expected SHA-256.
pub fn run_verify(file: &Path, expected: &str) -> Result<(), CliError> {
    if verify_checksum(file, expected)? {
        println!("{}: OK", file.display());
        return Ok(());
    }

    let actual = sha256_file(file)?;
    eprintln!("{}: FAILED", file.display());
    eprintln!("  expected: {}", expected.to_ascii_lowercase());
    eprintln!("  actual:   {actual}");
    Err(CliError::Mismatch {
        path: file.to_path_buf(),
    })
}
