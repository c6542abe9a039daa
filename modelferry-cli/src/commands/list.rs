//! `list` and `path` commands.

use serde::Serialize;

use modelferry::format::format_bytes;
use modelferry::ModelManager;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    filename: &'a str,
    url: &'a str,
    size_bytes: u64,
    sha256: Option<&'a str>,
    path: String,
    present: bool,
}

/// Print the registered artifacts.
pub fn run(manager: &ModelManager, json: bool) -> Result<(), CliError> {
    let entries = list_entries(manager);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Model directory: {}", manager.model_dir().display());
    println!();
    println!("{:<28} {:>10}  {:<8} {:<8}  FILE", "NAME", "SIZE", "SHA256", "STATUS");
    for entry in &entries {
        let size = if entry.size_bytes > 0 {
            format_bytes(entry.size_bytes)
        } else {
            "unknown".to_string()
        };
        println!(
            "{:<28} {:>10}  {:<8} {:<8}  {}",
            entry.name,
            size,
            if entry.sha256.is_some() { "yes" } else { "no" },
            if entry.present { "present" } else { "missing" },
            entry.filename
        );
    }
    Ok(())
}

fn list_entries(manager: &ModelManager) -> Vec<ListEntry<'_>> {
    manager
        .registry()
        .iter()
        .map(|artifact| {
            let path = manager.model_dir().join(&artifact.filename);
            ListEntry {
                name: &artifact.name,
                filename: &artifact.filename,
                url: &artifact.url,
                size_bytes: artifact.size_bytes,
                sha256: artifact.has_checksum().then_some(artifact.sha256.as_str()),
                present: path.is_file(),
                path: path.display().to_string(),
            }
        })
        .collect()
}

/// Print the local path of one artifact.
pub fn run_path(manager: &ModelManager, name: &str) -> Result<(), CliError> {
    let path = manager.artifact_path(name)?;
    println!("{}", path.display());
    Ok(())
}
