//! Manifest: the ordered set of pipelines handed to the executor.
//!
//! Pipelines are added in execution order. A pipeline may only be added
//! once the pipelines it depends on are present, so the insertion order is
//! always a valid execution order.
//!
//! Serialization consumes the manifest. Every pipeline is primed with its
//! resolved content and serialized in order; the first error aborts the
//! whole manifest.

mod document;

pub use document::{
    Checkpoint, CurlItem, CurlSource, ResolvedContent, SerializedManifest, Sources,
    MANIFEST_VERSION,
};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{CompositionError, ConfigurationError, Result};
use crate::packages::{PackageSet, PackageSolver};
use crate::pipeline::Pipeline;

/// An ordered collection of pipelines plus checkpoint bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pipelines: Vec<Pipeline>,
    checkpoints: BTreeSet<String>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or a pipeline it depends on has
    /// not been added yet.
    pub fn add_pipeline(
        &mut self,
        pipeline: impl Into<Pipeline>,
    ) -> Result<(), ConfigurationError> {
        let pipeline = pipeline.into();
        let name = pipeline.name();

        if self.get(name).is_some() {
            return Err(ConfigurationError::DuplicatePipeline {
                pipeline: name.to_string(),
            });
        }
        self.check_dependencies(&pipeline)?;

        debug!(pipeline = name, kind = pipeline.kind(), "Added pipeline");
        self.pipelines.push(pipeline);
        Ok(())
    }

    /// The build must be this manifest's own pipeline for the same
    /// environment, not one that only shares its name. A commit's tree must
    /// be an OS pipeline.
    fn check_dependencies(&self, pipeline: &Pipeline) -> Result<(), ConfigurationError> {
        let unknown = |dependency: &str| ConfigurationError::UnknownDependency {
            pipeline: pipeline.name().to_string(),
            dependency: dependency.to_string(),
        };

        if let Some(build) = pipeline.build() {
            let attached = matches!(
                self.get(build.name()),
                Some(Pipeline::Build(own)) if Arc::ptr_eq(own.environment(), build)
            );
            if !attached {
                return Err(unknown(build.name()));
            }
        }
        if let Pipeline::OstreeCommit(commit) = pipeline {
            if !matches!(self.get(commit.tree()), Some(Pipeline::Os(_))) {
                return Err(unknown(commit.tree()));
            }
        }
        Ok(())
    }

    /// Marks a pipeline as a cache boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if no pipeline of that name was added.
    pub fn checkpoint(&mut self, name: &str) -> Result<(), ConfigurationError> {
        if self.get(name).is_none() {
            return Err(ConfigurationError::not_attached(name));
        }
        if self.checkpoints.insert(name.to_string()) {
            debug!(pipeline = name, "Checkpointed pipeline");
        }
        Ok(())
    }

    /// Returns true if the pipeline is a cache boundary.
    #[must_use]
    pub fn is_checkpointed(&self, name: &str) -> bool {
        self.checkpoints.contains(name)
    }

    /// Looks up a pipeline by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    /// Looks up a pipeline by name for further configuration.
    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pipeline> {
        self.pipelines.iter_mut().find(|p| p.name() == name)
    }

    /// Pipeline names in execution order.
    #[must_use]
    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(Pipeline::name).collect()
    }

    /// Returns the number of pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Returns true if no pipeline was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// The package set chain of every pipeline that resolves packages.
    ///
    /// # Errors
    ///
    /// Returns the first include/exclude conflict found.
    pub fn package_set_chains(
        &self,
    ) -> Result<BTreeMap<String, Vec<PackageSet>>, CompositionError> {
        let mut chains = BTreeMap::new();
        for pipeline in &self.pipelines {
            let chain = pipeline.package_set_chain()?;
            if !chain.is_empty() {
                chains.insert(pipeline.name().to_string(), chain);
            }
        }
        Ok(chains)
    }

    /// Primes and serializes every pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any pipeline. No partial manifest
    /// is produced.
    pub fn serialize(self, mut content: ResolvedContent) -> Result<SerializedManifest> {
        let mut pipelines = Vec::with_capacity(self.pipelines.len());
        let mut sources = Sources::default();
        let mut checkpoints = Vec::new();

        for mut pipeline in self.pipelines {
            let inputs = content.take(pipeline.name());
            sources.add_packages(&inputs.packages);
            pipeline.serialize_start(inputs)?;
            pipelines.push(pipeline.serialize()?);

            if self.checkpoints.contains(pipeline.name()) {
                checkpoints.push(Checkpoint {
                    pipeline: pipeline.name().to_string(),
                    id: document::checkpoint_id(&pipelines)?,
                });
            }
        }

        info!(
            pipelines = pipelines.len(),
            checkpoints = checkpoints.len(),
            "Serialized manifest"
        );
        Ok(SerializedManifest {
            version: MANIFEST_VERSION.to_string(),
            pipelines,
            sources,
            checkpoints,
        })
    }

    /// Resolves every chain with `solver`, then serializes.
    ///
    /// Packages already present in `content` for a pipeline with a chain are
    /// replaced by the solver's answer. Containers and commits are kept.
    ///
    /// # Errors
    ///
    /// Returns composition, solver or serialization errors.
    pub fn resolve_and_serialize(
        self,
        solver: &dyn PackageSolver,
        mut content: ResolvedContent,
    ) -> Result<SerializedManifest> {
        for (name, chain) in self.package_set_chains()? {
            let packages = solver.depsolve(&name, &chain)?;
            debug!(pipeline = %name, packages = packages.len(), "Resolved package set chain");
            content.set_packages(name, packages);
        }
        self.serialize(content)
    }
}
