//! Typed options for each stage type.
//!
//! The options structs are the wire contract with the executor. Field names
//! match what the executor's stage implementations read.

use serde::{Deserialize, Serialize};

use crate::packages::{ContainerSpec, PackageSpec};

/// Identifier of the package installation stage.
pub const RPM: &str = "org.osbuild.rpm";
/// Identifier of the container embedding stage.
pub const SKOPEO: &str = "org.osbuild.skopeo";
/// Identifier of the first-boot commands stage.
pub const FIRST_BOOT: &str = "org.osbuild.first-boot";
/// Identifier of the bootupd metadata stage.
pub const BOOTUPD_GEN_METADATA: &str = "org.osbuild.bootupd.gen-metadata";
/// Identifier of the SELinux relabeling stage.
pub const SELINUX: &str = "org.osbuild.selinux";
/// Identifier of the ostree tree preparation stage.
pub const OSTREE_PREPTREE: &str = "org.osbuild.ostree.preptree";
/// Identifier of the ostree repository initialization stage.
pub const OSTREE_INIT: &str = "org.osbuild.ostree.init";
/// Identifier of the ostree commit stage.
pub const OSTREE_COMMIT: &str = "org.osbuild.ostree.commit";

/// Options of every stage type the crate knows how to build.
///
/// Serializes as the bare options object; the type identifier is carried by
/// the enclosing [`Stage`](super::Stage).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageOptions {
    /// Install packages.
    Rpm(RpmStageOptions),
    /// Copy container images into the tree.
    Skopeo(SkopeoStageOptions),
    /// Run commands once on first boot.
    FirstBoot(FirstBootStageOptions),
    /// Generate bootloader update metadata.
    BootupdGenMetadata(BootupdGenMetadataStageOptions),
    /// Relabel the tree.
    Selinux(SelinuxStageOptions),
    /// Prepare a tree for committing.
    OstreePrepTree(OstreePrepTreeStageOptions),
    /// Create an ostree repository.
    OstreeInit(OstreeInitStageOptions),
    /// Commit a tree into an ostree repository.
    OstreeCommit(OstreeCommitStageOptions),
    /// A stage type registered by the caller.
    Custom(CustomStageOptions),
}

impl StageOptions {
    /// The type identifier these options belong to.
    #[must_use]
    pub fn stage_type(&self) -> &str {
        match self {
            Self::Rpm(_) => RPM,
            Self::Skopeo(_) => SKOPEO,
            Self::FirstBoot(_) => FIRST_BOOT,
            Self::BootupdGenMetadata(_) => BOOTUPD_GEN_METADATA,
            Self::Selinux(_) => SELINUX,
            Self::OstreePrepTree(_) => OSTREE_PREPTREE,
            Self::OstreeInit(_) => OSTREE_INIT,
            Self::OstreeCommit(_) => OSTREE_COMMIT,
            Self::Custom(custom) => &custom.stage_type,
        }
    }
}

/// A package reference inside the rpm stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmPackage {
    /// Package name.
    pub name: String,
    /// Checksum the executor fetches the package by.
    pub checksum: String,
}

/// Options of `org.osbuild.rpm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RpmStageOptions {
    /// Keys imported before installation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpgkeys: Vec<String>,
    /// Packages to install, sorted by name.
    pub packages: Vec<RpmPackage>,
}

impl RpmStageOptions {
    /// Builds options from resolved specs.
    ///
    /// Packages are sorted by name and exact duplicates removed so the stage
    /// is stable regardless of solver output order.
    #[must_use]
    pub fn from_specs(specs: &[PackageSpec], gpgkeys: Vec<String>) -> Self {
        let mut sorted: Vec<&PackageSpec> = specs.iter().collect();
        sorted.sort_by(|a, b| a.stable_cmp(b));
        sorted.dedup();

        Self {
            gpgkeys,
            packages: sorted
                .into_iter()
                .map(|spec| RpmPackage {
                    name: spec.name.clone(),
                    checksum: spec.checksum.clone(),
                })
                .collect(),
        }
    }
}

/// A container image copied by the skopeo stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkopeoImage {
    /// Source reference.
    pub source: String,
    /// Manifest digest.
    pub digest: String,
    /// Image id.
    pub image_id: String,
    /// Name in local storage.
    pub local_name: String,
}

impl From<&ContainerSpec> for SkopeoImage {
    fn from(spec: &ContainerSpec) -> Self {
        Self {
            source: spec.source.clone(),
            digest: spec.digest.clone(),
            image_id: spec.image_id.clone(),
            local_name: spec.local_name.clone(),
        }
    }
}

/// Options of `org.osbuild.skopeo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkopeoStageOptions {
    /// Storage the images are copied into.
    pub destination: String,
    /// Images in resolved order.
    pub images: Vec<SkopeoImage>,
}

impl SkopeoStageOptions {
    /// Copies the given containers into the tree's container storage.
    #[must_use]
    pub fn containers_storage(containers: &[ContainerSpec]) -> Self {
        Self {
            destination: "containers-storage".to_string(),
            images: containers.iter().map(SkopeoImage::from).collect(),
        }
    }
}

/// Options of `org.osbuild.first-boot`.
///
/// Commands run once, in order, on the first boot of the image. A failing
/// command stops the sequence and is surfaced to the boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstBootStageOptions {
    /// Commands in execution order.
    pub commands: Vec<String>,
    /// Delay the commands until the network is online.
    pub wait_for_network: bool,
}

/// Options of `org.osbuild.bootupd.gen-metadata`. The stage takes none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BootupdGenMetadataStageOptions {}

/// Options of `org.osbuild.selinux`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelinuxStageOptions {
    /// Path of the file contexts inside the tree.
    pub file_contexts: String,
}

impl SelinuxStageOptions {
    /// Options for the given policy name, e.g. `targeted`.
    #[must_use]
    pub fn for_policy(policy: &str) -> Self {
        Self {
            file_contexts: format!("etc/selinux/{policy}/contexts/files/file_contexts"),
        }
    }
}

/// Options of `org.osbuild.ostree.preptree`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreePrepTreeStageOptions {
    /// Groups whose members are kept in `/etc/group`.
    pub etc_group_members: Vec<String>,
}

/// Options of `org.osbuild.ostree.init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreeInitStageOptions {
    /// Repository path inside the tree.
    pub path: String,
}

/// Options of `org.osbuild.ostree.commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstreeCommitStageOptions {
    /// Ref the commit is made on.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Version recorded in the commit metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Parent commit checksum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Pipeline whose tree is committed, as `name:<pipeline>`.
    pub tree: String,
}

/// Options for a caller-registered stage type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomStageOptions {
    #[serde(skip)]
    stage_type: String,
    #[serde(flatten)]
    options: serde_json::Map<String, serde_json::Value>,
}

impl CustomStageOptions {
    /// Creates options for the given stage type.
    #[must_use]
    pub fn new(
        stage_type: impl Into<String>,
        options: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            stage_type: stage_type.into(),
            options,
        }
    }

    /// The raw options object.
    #[must_use]
    pub fn options(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.options
    }
}
