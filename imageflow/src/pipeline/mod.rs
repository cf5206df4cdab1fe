//! Pipelines: named, ordered stage sequences.
//!
//! This module provides:
//! - The closed [`Pipeline`] union over every pipeline kind
//! - The build environment pipeline ([`Build`]) and its shared [`BuildRef`]
//! - The OS tree pipeline ([`Os`])
//! - The ostree commit pipeline ([`OstreeCommit`])
//!
//! Every kind follows the same lifecycle: it is configured by the caller,
//! primed exactly once with resolved content ([`Pipeline::serialize_start`]),
//! and then serialized into stages ([`Pipeline::serialize`]) as a pure
//! function of its state.

mod build;
mod os;
mod ostree_commit;

pub use build::{Build, BuildEnvironment, BuildRef};
pub use os::{Os, OsCustomizations};
pub use ostree_commit::OstreeCommit;

use serde::Serialize;
use std::collections::BTreeSet;

use crate::errors::{CompositionError, ConfigurationError};
use crate::packages::{CommitSpec, ContainerSpec, PackageSet, PackageSpec, RepoConfig};
use crate::stages::Stage;

/// Content resolved outside the crate and injected before serialization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedInputs {
    /// Resolved packages.
    pub packages: Vec<PackageSpec>,
    /// Resolved container images.
    pub containers: Vec<ContainerSpec>,
    /// Resolved ostree commits.
    pub commits: Vec<CommitSpec>,
}

impl ResolvedInputs {
    /// Inputs holding only packages.
    #[must_use]
    pub fn packages(packages: Vec<PackageSpec>) -> Self {
        Self {
            packages,
            ..Default::default()
        }
    }
}

/// A pipeline as the executor consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerializedPipeline {
    /// Pipeline name.
    pub name: String,
    /// Build environment reference, as `name:<build>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Runner identity, only set on build environments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    /// Stages in execution order.
    pub stages: Vec<Stage>,
}

impl SerializedPipeline {
    /// Position of the first stage of the given type.
    #[must_use]
    pub fn stage_position(&self, stage_type: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.stage_type() == stage_type)
    }

    /// First stage of the given type.
    #[must_use]
    pub fn find_stage(&self, stage_type: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.stage_type() == stage_type)
    }
}

/// Every pipeline kind a manifest can hold.
#[derive(Debug, Clone)]
pub enum Pipeline {
    /// A build environment.
    Build(Build),
    /// An OS tree.
    Os(Box<Os>),
    /// An ostree commit of an OS tree.
    OstreeCommit(OstreeCommit),
}

impl Pipeline {
    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Build(p) => p.name(),
            Self::Os(p) => p.name(),
            Self::OstreeCommit(p) => p.name(),
        }
    }

    /// The kind as a lowercase label, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::Os(_) => "os",
            Self::OstreeCommit(_) => "ostree-commit",
        }
    }

    /// The build environment this pipeline runs under, if any.
    #[must_use]
    pub fn build(&self) -> Option<&BuildRef> {
        match self {
            Self::Build(_) => None,
            Self::Os(p) => Some(p.build()),
            Self::OstreeCommit(p) => Some(p.build()),
        }
    }

    /// The package set chain to hand to the solver.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry both includes and excludes a package.
    pub fn package_set_chain(&self) -> Result<Vec<PackageSet>, CompositionError> {
        match self {
            Self::Build(p) => p.package_set_chain(),
            Self::Os(p) => p.package_set_chain(),
            Self::OstreeCommit(_) => Ok(Vec::new()),
        }
    }

    /// Injects resolved content. Must be called exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was already primed or the inputs
    /// don't fit the pipeline kind.
    pub fn serialize_start(&mut self, inputs: ResolvedInputs) -> Result<(), ConfigurationError> {
        match self {
            Self::Build(p) => p.serialize_start(inputs),
            Self::Os(p) => p.serialize_start(inputs),
            Self::OstreeCommit(p) => p.serialize_start(inputs),
        }
    }

    /// Produces the stage sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was not primed or its configuration
    /// is inconsistent.
    pub fn serialize(&self) -> Result<SerializedPipeline, ConfigurationError> {
        match self {
            Self::Build(p) => p.serialize(),
            Self::Os(p) => p.serialize(),
            Self::OstreeCommit(p) => p.serialize(),
        }
    }
}

impl From<Build> for Pipeline {
    fn from(pipeline: Build) -> Self {
        Self::Build(pipeline)
    }
}

impl From<Os> for Pipeline {
    fn from(pipeline: Os) -> Self {
        Self::Os(Box::new(pipeline))
    }
}

impl From<OstreeCommit> for Pipeline {
    fn from(pipeline: OstreeCommit) -> Self {
        Self::OstreeCommit(pipeline)
    }
}

/// GPG keys of the repositories that verify signatures, sorted and unique.
pub(crate) fn gpg_keys(repos: &[RepoConfig]) -> Vec<String> {
    let keys: BTreeSet<&String> = repos
        .iter()
        .filter(|repo| repo.check_gpg)
        .flat_map(|repo| repo.gpg_keys.iter())
        .collect();
    keys.into_iter().cloned().collect()
}

pub(crate) fn check_name(name: &str) -> Result<(), ConfigurationError> {
    if name.trim().is_empty() {
        return Err(ConfigurationError::EmptyName);
    }
    Ok(())
}

pub(crate) fn check_commits(
    pipeline: &str,
    commits: &[CommitSpec],
    max: usize,
) -> Result<(), ConfigurationError> {
    if commits.len() > max {
        return Err(ConfigurationError::TooManyCommits {
            pipeline: pipeline.to_string(),
            max,
            count: commits.len(),
        });
    }
    Ok(())
}
