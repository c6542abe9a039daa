//! Builder for [`ModelManager`](super::ModelManager).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::artifact::{default_artifacts, ArtifactDescriptor, ArtifactRegistry};
use super::backoff::{BackoffPolicy, DEFAULT_BASE_RETRY_DELAY, DEFAULT_MAX_RETRIES};
use super::ModelManager;
use crate::disk::DEFAULT_BUFFER_PERCENT;
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Collects manager settings; the registry is frozen by [`build`](Self::build).
pub struct ModelManagerBuilder {
    model_dir: PathBuf,
    transport: Option<Arc<dyn HttpTransport>>,
    max_retries: u32,
    base_retry_delay: Duration,
    disk_buffer_percent: u32,
    include_defaults: bool,
    artifacts: Vec<ArtifactDescriptor>,
}

impl ModelManagerBuilder {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            transport: None,
            max_retries: DEFAULT_MAX_RETRIES,
            base_retry_delay: DEFAULT_BASE_RETRY_DELAY,
            disk_buffer_percent: DEFAULT_BUFFER_PERCENT,
            include_defaults: true,
            artifacts: Vec::new(),
        }
    }

    /// Transport used for every download. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Maximum attempts per acquisition. Zero is ignored.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        if max_retries > 0 {
            self.max_retries = max_retries;
        }
        self
    }

    /// Delay before the second attempt. Zero is ignored.
    pub fn base_retry_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.base_retry_delay = delay;
        }
        self
    }

    /// Free space to keep beyond an artifact's size, in percent.
    pub fn disk_buffer_percent(mut self, percent: u32) -> Self {
        self.disk_buffer_percent = percent;
        self
    }

    /// Register an artifact, replacing any default of the same name.
    pub fn artifact(mut self, artifact: ArtifactDescriptor) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = ArtifactDescriptor>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    /// Start from an empty registry instead of the built-in artifacts.
    pub fn without_defaults(mut self) -> Self {
        self.include_defaults = false;
        self
    }

    /// Freeze the configuration.
    ///
    /// Fails only when no transport was given and the default HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<ModelManager, TransportError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let defaults = if self.include_defaults {
            default_artifacts()
        } else {
            Vec::new()
        };
        let registry = ArtifactRegistry::new(defaults.into_iter().chain(self.artifacts));

        Ok(ModelManager {
            model_dir: self.model_dir,
            transport,
            registry: Arc::new(registry),
            backoff: BackoffPolicy::new(self.max_retries, self.base_retry_delay),
            disk_buffer_percent: self.disk_buffer_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn mock() -> Arc<dyn HttpTransport> {
        Arc::new(MockTransport::new(Vec::new()))
    }

    #[test]
    fn test_builder_defaults() {
        let manager = ModelManagerBuilder::new("/models")
            .transport(mock())
            .build()
            .unwrap();

        assert_eq!(manager.model_dir(), std::path::Path::new("/models"));
        assert_eq!(manager.backoff(), BackoffPolicy::default());
        assert_eq!(manager.disk_buffer_percent(), 10);
        assert_eq!(manager.artifact_names().len(), 3);
    }

    #[test]
    fn test_non_positive_settings_are_ignored() {
        let manager = ModelManagerBuilder::new("/models")
            .transport(mock())
            .max_retries(0)
            .base_retry_delay(Duration::ZERO)
            .build()
            .unwrap();

        assert_eq!(manager.backoff().max_attempts, DEFAULT_MAX_RETRIES);
        assert_eq!(manager.backoff().base_delay, DEFAULT_BASE_RETRY_DELAY);
    }

    #[test]
    fn test_custom_settings() {
        let manager = ModelManagerBuilder::new("/models")
            .transport(mock())
            .max_retries(5)
            .base_retry_delay(Duration::from_millis(250))
            .disk_buffer_percent(0)
            .without_defaults()
            .artifact(ArtifactDescriptor::new("tiny", "https://x/tiny", "tiny.bin"))
            .build()
            .unwrap();

        assert_eq!(manager.backoff().max_attempts, 5);
        assert_eq!(manager.backoff().base_delay, Duration::from_millis(250));
        assert_eq!(manager.disk_buffer_percent(), 0);
        assert_eq!(manager.artifact_names(), vec!["tiny".to_string()]);
    }

    #[test]
    fn test_builder_creates_default_transport() {
        assert!(ModelManagerBuilder::new("/models").build().is_ok());
    }
}
