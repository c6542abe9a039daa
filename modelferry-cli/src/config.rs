//! INI configuration file.
//!
//! Located at `<config dir>/modelferry/config.ini`:
//!
//! ```ini
//! [download]
//! model_dir = /var/lib/models
//! max_retries = 5
//! retry_delay_secs = 2
//! disk_buffer_percent = 10
//! connect_timeout_secs = 30
//!
//! [artifact.tinyllama]
//! url = https://example.com/tinyllama.gguf
//! filename = tinyllama.gguf
//! sha256 = 0123...
//! size_bytes = 700000000
//! ```
//!
//! A missing default file yields the defaults; values given on the command
//! line override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use modelferry::acquisition::{ArtifactDescriptor, DEFAULT_BASE_RETRY_DELAY, DEFAULT_MAX_RETRIES};
use modelferry::checksum::validate_sha256;
use modelferry::disk::DEFAULT_BUFFER_PERCENT;

use crate::error::CliError;

const DOWNLOAD_SECTION: &str = "download";
const ARTIFACT_PREFIX: &str = "artifact.";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Effective CLI settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub model_dir: PathBuf,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub disk_buffer_percent: u32,
    pub connect_timeout: Duration,
    /// Artifacts registered on top of the built-in ones.
    pub artifacts: Vec<ArtifactDescriptor>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_BASE_RETRY_DELAY,
            disk_buffer_percent: DEFAULT_BUFFER_PERCENT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            artifacts: Vec::new(),
        }
    }
}

/// Default config file location.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("modelferry").join("config.ini"))
}

/// Default model directory: `<data dir>/modelferry/models`.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("modelferry")
        .join("models")
}

impl CliConfig {
    /// Load `explicit` if given (it must exist), else the default file if it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let ini = Ini::load_from_file(&path).map_err(|e| CliError::ConfigFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, CliError> {
        let ini = Ini::load_from_str(text).map_err(|e| CliError::Config(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, CliError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(DOWNLOAD_SECTION)) {
            if let Some(dir) = section.get("model_dir").filter(|v| !v.trim().is_empty()) {
                config.model_dir = PathBuf::from(dir.trim());
            }
            if let Some(n) = parse_key::<u32>(section, DOWNLOAD_SECTION, "max_retries")? {
                if n > 0 {
                    config.max_retries = n;
                }
            }
            if let Some(secs) = parse_key::<u64>(section, DOWNLOAD_SECTION, "retry_delay_secs")? {
                if secs > 0 {
                    config.retry_delay = Duration::from_secs(secs);
                }
            }
            if let Some(pct) = parse_key::<u32>(section, DOWNLOAD_SECTION, "disk_buffer_percent")? {
                config.disk_buffer_percent = pct;
            }
            if let Some(secs) =
                parse_key::<u64>(section, DOWNLOAD_SECTION, "connect_timeout_secs")?
            {
                if secs > 0 {
                    config.connect_timeout = Duration::from_secs(secs);
                }
            }
        }

        for (name, section) in ini.iter() {
            let Some(artifact) = name.and_then(|n| n.strip_prefix(ARTIFACT_PREFIX)) else {
                continue;
            };
            config.artifacts.push(parse_artifact(artifact, section)?);
        }

        Ok(config)
    }
}

fn parse_artifact(name: &str, section: &Properties) -> Result<ArtifactDescriptor, CliError> {
    let section_name = format!("{ARTIFACT_PREFIX}{name}");
    if name.is_empty() {
        return Err(CliError::Config(format!("[{section_name}] has no artifact name")));
    }

    let url = section
        .get("url")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| CliError::Config(format!("[{section_name}] is missing url")))?;

    let filename = match section.get("filename").map(str::trim) {
        Some(f) if !f.is_empty() => f.to_string(),
        _ => filename_from_url(url)
            .ok_or_else(|| CliError::Config(format!("[{section_name}] is missing filename")))?,
    };

    let sha256 = section.get("sha256").map(str::trim).unwrap_or_default();
    if !sha256.is_empty() {
        validate_sha256(sha256)
            .map_err(|e| CliError::Config(format!("[{section_name}] sha256: {e}")))?;
    }

    let size_bytes = parse_key::<u64>(section, &section_name, "size_bytes")?.unwrap_or(0);

    Ok(ArtifactDescriptor::new(name, url, filename)
        .with_sha256(sha256.to_ascii_lowercase())
        .with_size_bytes(size_bytes))
}

/// Last path segment of a URL, without query or fragment.
fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    (!segment.is_empty() && !segment.contains(':')).then(|| segment.to_string())
}

fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, CliError> {
    match section.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            CliError::Config(format!("[{section_name}] {key}: invalid value {raw:?}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CliConfig::from_ini_str("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.disk_buffer_percent, 10);
    }

    #[test]
    fn test_download_section() {
        let config = CliConfig::from_ini_str(
            "[download]\n\
             model_dir = /srv/models\n\
             max_retries = 5\n\
             retry_delay_secs = 7\n\
             disk_buffer_percent = 0\n\
             connect_timeout_secs = 12\n",
        )
        .unwrap();

        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(7));
        assert_eq!(config.disk_buffer_percent, 0);
        assert_eq!(config.connect_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_zero_retries_are_ignored() {
        let config =
            CliConfig::from_ini_str("[download]\nmax_retries = 0\nretry_delay_secs = 0\n").unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_number() {
        let err = CliConfig::from_ini_str("[download]\nmax_retries = many\n").unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_artifact_sections() {
        let sha = "AB".repeat(32);
        let config = CliConfig::from_ini_str(&format!(
            "[artifact.tinyllama]\n\
             url = https://example.com/files/tinyllama.gguf?download=1\n\
             sha256 = {sha}\n\
             size_bytes = 700\n\
             \n\
             [artifact.embed]\n\
             url = https://example.com/embed.bin\n\
             filename = embeddings.bin\n"
        ))
        .unwrap();

        assert_eq!(config.artifacts.len(), 2);
        let tiny = &config.artifacts[0];
        assert_eq!(tiny.name, "tinyllama");
        assert_eq!(tiny.filename, "tinyllama.gguf");
        assert_eq!(tiny.sha256, "ab".repeat(32));
        assert_eq!(tiny.size_bytes, 700);

        let embed = &config.artifacts[1];
        assert_eq!(embed.filename, "embeddings.bin");
        assert!(!embed.has_checksum());
    }

    #[test]
    fn test_artifact_requires_url() {
        let err = CliConfig::from_ini_str("[artifact.broken]\nfilename = x.bin\n").unwrap_err();
        assert!(err.to_string().contains("missing url"));
    }

    #[test]
    fn test_artifact_rejects_bad_hash() {
        let err = CliConfig::from_ini_str("[artifact.bad]\nurl = https://x/y.bin\nsha256 = nope\n")
            .unwrap_err();
        assert!(err.to_string().contains("sha256"));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[download]\nmax_retries = 9\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_retries, 9);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = CliConfig::load(Some(&temp.path().join("nope.ini"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigFile { .. }));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://h/a/b/model.gguf").as_deref(),
            Some("model.gguf")
        );
        assert_eq!(
            filename_from_url("https://h/m.bin?x=1#frag").as_deref(),
            Some("m.bin")
        );
        assert_eq!(filename_from_url("https://h/dir/"), None);
    }
}
