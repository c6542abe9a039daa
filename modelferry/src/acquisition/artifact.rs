//! Artifact descriptors and the registry of known artifacts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::format::{BYTES_PER_GB, BYTES_PER_MB};

/// Name of the default text model.
pub const DEFAULT_TEXT_MODEL: &str = "bunny-v1.1-llama-3.2-4b";

/// Name of the default vision projector.
pub const DEFAULT_VISION_PROJECTOR: &str = "bunny-mmproj";

/// Name of the default image generation model.
pub const DEFAULT_IMAGE_MODEL: &str = "sd-turbo";

/// A downloadable artifact: where it comes from and how to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    /// Registry key.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// File name inside the model directory.
    pub filename: String,
    /// Expected SHA-256; empty skips verification.
    pub sha256: String,
    /// Approximate size in bytes; 0 skips the disk space preflight.
    pub size_bytes: u64,
}

impl ArtifactDescriptor {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            filename: filename.into(),
            sha256: String::new(),
            size_bytes: 0,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = sha256.into();
        self
    }

    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Whether a checksum is published for this artifact.
    pub fn has_checksum(&self) -> bool {
        !self.sha256.is_empty()
    }
}

/// The built-in artifacts: a 4B text model, its vision projector and an
/// image generation model.
pub fn default_artifacts() -> Vec<ArtifactDescriptor> {
    vec![
        ArtifactDescriptor::new(
            DEFAULT_TEXT_MODEL,
            "https://huggingface.co/BAAI/Bunny-v1_1-4B/resolve/main/ggml-model-Q4_K_M.gguf",
            "bunny-v1.1-llama-3.2-4b-Q4_K_M.gguf",
        )
        .with_size_bytes(3 * BYTES_PER_GB),
        ArtifactDescriptor::new(
            DEFAULT_VISION_PROJECTOR,
            "https://huggingface.co/BAAI/Bunny-v1_1-4B/resolve/main/mmproj-model-f16.gguf",
            "bunny-mmproj-f16.gguf",
        )
        .with_size_bytes(600 * BYTES_PER_MB),
        ArtifactDescriptor::new(
            DEFAULT_IMAGE_MODEL,
            "https://huggingface.co/stabilityai/sd-turbo/resolve/main/sd_turbo.safetensors",
            "sd-turbo.safetensors",
        )
        .with_size_bytes(2 * BYTES_PER_GB),
    ]
}

/// Immutable name-to-descriptor map.
///
/// Built once and shared; later entries with the same name replace earlier
/// ones, so explicit registrations override the defaults.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    artifacts: BTreeMap<String, ArtifactDescriptor>,
}

impl ArtifactRegistry {
    pub fn new(artifacts: impl IntoIterator<Item = ArtifactDescriptor>) -> Self {
        Self {
            artifacts: artifacts
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect(),
        }
    }

    /// Registry holding only [`default_artifacts`].
    pub fn with_defaults() -> Self {
        Self::new(default_artifacts())
    }

    pub fn get(&self, name: &str) -> Option<&ArtifactDescriptor> {
        self.artifacts.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.artifacts.keys().cloned().collect()
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactDescriptor> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
