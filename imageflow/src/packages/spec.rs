//! Resolved specifications and repository configuration.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A package resolved by the dependency solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PackageSpec {
    /// Package name.
    pub name: String,
    /// Package epoch.
    #[serde(default)]
    pub epoch: u32,
    /// Package version.
    #[serde(default)]
    pub version: String,
    /// Package release.
    #[serde(default)]
    pub release: String,
    /// Package architecture.
    #[serde(default)]
    pub arch: String,
    /// Where the executor downloads the package from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_location: Option<String>,
    /// Content checksum, e.g. `sha256:...`.
    pub checksum: String,
    /// Whether the package signature must be verified.
    #[serde(default)]
    pub check_gpg: bool,
}

impl PackageSpec {
    /// Creates a package spec from a name and checksum.
    #[must_use]
    pub fn new(name: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            ..Default::default()
        }
    }

    /// Sets the version and release.
    #[must_use]
    pub fn with_evr(
        mut self,
        epoch: u32,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        self.epoch = epoch;
        self.version = version.into();
        self.release = release.into();
        self
    }

    /// Sets the architecture.
    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Sets the download location.
    #[must_use]
    pub fn with_remote_location(mut self, url: impl Into<String>) -> Self {
        self.remote_location = Some(url.into());
        self
    }

    /// Returns the `name-[epoch:]version-release.arch` form.
    #[must_use]
    pub fn nevra(&self) -> String {
        if self.epoch == 0 {
            format!("{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
        } else {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        }
    }

    /// Ordering used for stable package lists: by name first.
    pub(crate) fn stable_cmp(&self, other: &Self) -> Ordering {
        (&self.name, self.epoch, &self.version, &self.release, &self.arch, &self.checksum).cmp(&(
            &other.name,
            other.epoch,
            &other.version,
            &other.release,
            &other.arch,
            &other.checksum,
        ))
    }
}

/// A container image resolved to a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Source reference, e.g. `registry.example.com/app:latest`.
    pub source: String,
    /// Manifest digest.
    pub digest: String,
    /// Image id.
    pub image_id: String,
    /// Name under which the image is stored in the tree.
    pub local_name: String,
}

/// An ostree commit resolved to a checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSpec {
    /// The ostree ref.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Repository URL.
    pub url: String,
    /// Commit checksum.
    pub checksum: String,
}

/// A package repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RepoConfig {
    /// Repository id.
    pub id: String,
    /// Base URLs.
    #[serde(default)]
    pub base_urls: Vec<String>,
    /// Metalink URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
    /// ASCII-armored GPG keys.
    #[serde(default)]
    pub gpg_keys: Vec<String>,
    /// Whether package signatures from this repository are verified.
    #[serde(default)]
    pub check_gpg: bool,
}

impl RepoConfig {
    /// Creates a repository with a single base URL.
    #[must_use]
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_urls: vec![base_url.into()],
            ..Default::default()
        }
    }

    /// Adds a GPG key and enables signature checking.
    #[must_use]
    pub fn with_gpg_key(mut self, key: impl Into<String>) -> Self {
        self.gpg_keys.push(key.into());
        self.check_gpg = true;
        self
    }
}
