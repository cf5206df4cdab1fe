//! The serialized manifest document and the resolved content fed into it.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::packages::{CommitSpec, ContainerSpec, PackageSpec};
use crate::pipeline::{ResolvedInputs, SerializedPipeline};

/// Format version of the manifest document.
pub const MANIFEST_VERSION: &str = "2";

/// Resolved content keyed by pipeline name.
///
/// A pipeline without an entry is primed with empty inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedContent {
    inputs: BTreeMap<String, ResolvedInputs>,
}

impl ResolvedContent {
    /// Creates empty content.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resolved packages of a pipeline.
    #[must_use]
    pub fn with_packages(
        mut self,
        pipeline: impl Into<String>,
        packages: Vec<PackageSpec>,
    ) -> Self {
        self.entry(pipeline).packages = packages;
        self
    }

    /// Sets the resolved containers of a pipeline.
    #[must_use]
    pub fn with_containers(
        mut self,
        pipeline: impl Into<String>,
        containers: Vec<ContainerSpec>,
    ) -> Self {
        self.entry(pipeline).containers = containers;
        self
    }

    /// Sets the resolved commits of a pipeline.
    #[must_use]
    pub fn with_commits(mut self, pipeline: impl Into<String>, commits: Vec<CommitSpec>) -> Self {
        self.entry(pipeline).commits = commits;
        self
    }

    /// Replaces the resolved packages of a pipeline in place.
    pub fn set_packages(&mut self, pipeline: impl Into<String>, packages: Vec<PackageSpec>) {
        self.entry(pipeline).packages = packages;
    }

    /// Inputs recorded for a pipeline.
    #[must_use]
    pub fn get(&self, pipeline: &str) -> Option<&ResolvedInputs> {
        self.inputs.get(pipeline)
    }

    /// Removes and returns the inputs of a pipeline, empty if none were set.
    pub fn take(&mut self, pipeline: &str) -> ResolvedInputs {
        self.inputs.remove(pipeline).unwrap_or_default()
    }

    fn entry(&mut self, pipeline: impl Into<String>) -> &mut ResolvedInputs {
        self.inputs.entry(pipeline.into()).or_default()
    }
}

/// One downloadable item of the curl source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurlItem {
    /// Download URL.
    pub url: String,
}

/// Content fetched by URL, keyed by checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct CurlSource {
    /// Items keyed by checksum.
    pub items: BTreeMap<String, CurlItem>,
}

/// Everything the executor fetches before running pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Sources {
    /// Packages fetched over HTTP.
    #[serde(rename = "org.osbuild.curl", skip_serializing_if = "Option::is_none")]
    pub curl: Option<CurlSource>,
}

impl Sources {
    /// Records every package that carries a download location.
    pub(crate) fn add_packages(&mut self, packages: &[PackageSpec]) {
        for spec in packages {
            if let Some(url) = &spec.remote_location {
                self.curl
                    .get_or_insert_with(CurlSource::default)
                    .items
                    .insert(spec.checksum.clone(), CurlItem { url: url.clone() });
            }
        }
    }

    /// Returns true if nothing needs fetching.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curl.as_ref().map_or(true, |c| c.items.is_empty())
    }
}

/// A cache boundary marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// The checkpointed pipeline.
    pub pipeline: String,
    /// Content address of the pipeline and everything before it.
    pub id: String,
}

/// The document handed to the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedManifest {
    /// Format version, always `"2"`.
    pub version: String,
    /// Pipelines in execution order.
    pub pipelines: Vec<SerializedPipeline>,
    /// Content the executor must fetch.
    pub sources: Sources,
    /// Cache boundaries, in pipeline order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
}

impl SerializedManifest {
    /// Looks up a serialized pipeline by name.
    #[must_use]
    pub fn pipeline(&self, name: &str) -> Option<&SerializedPipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Encodes the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the document as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Hex SHA-256 of the JSON encoding of `pipelines`.
pub(crate) fn checkpoint_id(pipelines: &[SerializedPipeline]) -> Result<String> {
    let json = serde_json::to_vec(pipelines)?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_missing_pipeline_is_empty() {
        let mut content = ResolvedContent::new();
        assert_eq!(content.take("os"), ResolvedInputs::default());
    }

    #[test]
    fn test_take_removes_entry() {
        let mut content =
            ResolvedContent::new().with_packages("os", vec![PackageSpec::new("bash", "sha256:01")]);
        assert_eq!(content.take("os").packages.len(), 1);
        assert!(content.get("os").is_none());
    }

    #[test]
    fn test_sources_keyed_by_checksum() {
        let mut sources = Sources::default();
        sources.add_packages(&[
            PackageSpec::new("zsh", "sha256:02")
                .with_remote_location("https://example.com/zsh.rpm"),
            PackageSpec::new("bash", "sha256:01")
                .with_remote_location("https://example.com/bash.rpm"),
            PackageSpec::new("local", "sha256:03"),
        ]);

        assert_eq!(
            serde_json::to_value(&sources).unwrap(),
            json!({
                "org.osbuild.curl": {
                    "items": {
                        "sha256:01": {"url": "https://example.com/bash.rpm"},
                        "sha256:02": {"url": "https://example.com/zsh.rpm"}
                    }
                }
            })
        );
    }

    #[test]
    fn test_empty_sources() {
        let sources = Sources::default();
        assert!(sources.is_empty());
        assert_eq!(serde_json::to_value(&sources).unwrap(), json!({}));
    }

    #[test]
    fn test_checkpoint_id_is_hex_sha256() {
        let id = checkpoint_id(&[]).unwrap();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, checkpoint_id(&[]).unwrap());
    }
}
