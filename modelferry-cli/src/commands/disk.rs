//! `disk` command.

use std::path::Path;

use serde::Serialize;

use modelferry::disk::{
    check_disk_space_for_default_model, disk_space, DiskCheckError, DiskSpaceReport,
    DEFAULT_MODEL_SIZE_BYTES,
};
use modelferry::format::format_bytes;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct DiskOutput {
    #[serde(flatten)]
    report: DiskSpaceReport,
    fits_default_model: bool,
}

/// Report free space at `path` and whether a default-size model fits.
pub fn run(path: &Path, json: bool) -> Result<(), CliError> {
    let output = disk_output(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let DiskOutput {
        report,
        fits_default_model,
    } = output;

    println!("Disk space at: {}", report.path.display());
    println!("  Total: {}", report.total_formatted);
    println!("  Used:  {} ({:.1}%)", report.used_formatted, report.used_percent);
    println!("  Free:  {}", report.free_formatted);
    println!(
        "  Default model ({}): {}",
        format_bytes(DEFAULT_MODEL_SIZE_BYTES),
        if fits_default_model { "fits" } else { "does not fit" }
    );
    Ok(())
}

fn disk_output(path: &Path) -> Result<DiskOutput, CliError> {
    let report = disk_space(path)?;
    let fits_default_model = match check_disk_space_for_default_model(path) {
        Ok(_) => true,
        Err(DiskCheckError::Insufficient(_)) => false,
        Err(e) => return Err(e.into()),
    };
    Ok(DiskOutput {
        report,
        fits_default_model,
    })
}
