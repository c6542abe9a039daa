//! Subcommand implementations.

pub mod checksum;
pub mod disk;
pub mod fetch;
pub mod list;

use std::sync::Arc;

use modelferry::{ModelManager, ReqwestTransport};

use crate::config::CliConfig;
use crate::error::CliError;

/// Build a manager from the effective configuration.
pub fn build_manager(config: &CliConfig) -> Result<ModelManager, CliError> {
    let transport = ReqwestTransport::with_connect_timeout(config.connect_timeout)?;
    let manager = ModelManager::builder(&config.model_dir)
        .transport(Arc::new(transport))
        .max_retries(config.max_retries)
        .base_retry_delay(config.retry_delay)
        .disk_buffer_percent(config.disk_buffer_percent)
        .artifacts(config.artifacts.iter().cloned())
        .build()?;
    Ok(manager)
}
