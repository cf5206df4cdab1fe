//! Build environment pipeline.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{check_commits, check_name, ResolvedInputs, SerializedPipeline};
use crate::environment::Runner;
use crate::errors::{CompositionError, ConfigurationError, Result};
use crate::manifest::Manifest;
use crate::packages::{check_conflicts, PackageSet, PackageSpec, RepoConfig};
use crate::stages::{RpmStageOptions, Stage};

/// The immutable identity of a build environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEnvironment {
    name: String,
    runner: Runner,
    repos: Vec<RepoConfig>,
}

impl BuildEnvironment {
    /// The build pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runner executing the environment.
    #[must_use]
    pub fn runner(&self) -> Runner {
        self.runner
    }

    /// Repositories available inside the environment.
    #[must_use]
    pub fn repos(&self) -> &[RepoConfig] {
        &self.repos
    }

    /// The reference dependent pipelines serialize, `name:<build>`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("name:{}", self.name)
    }
}

/// Shared read-only handle on a build environment.
pub type BuildRef = Arc<BuildEnvironment>;

/// The toolchain pipeline every other pipeline of a manifest runs under.
///
/// It carries no conditional logic: it installs the runner's packages plus
/// any extra packages and nothing else.
#[derive(Debug, Clone)]
pub struct Build {
    environment: BuildRef,
    extra_packages: Vec<String>,
    packages: Option<Vec<PackageSpec>>,
}

impl Build {
    /// Default name of the build pipeline.
    pub const DEFAULT_NAME: &'static str = "build";

    /// Creates a build pipeline named `build` and registers it in `manifest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest already holds a pipeline of that name.
    pub fn new(
        manifest: &mut Manifest,
        runner: Runner,
        repos: Vec<RepoConfig>,
        extra_packages: Option<Vec<String>>,
    ) -> Result<BuildRef> {
        Self::with_name(manifest, Self::DEFAULT_NAME, runner, repos, extra_packages)
    }

    /// Creates a named build pipeline and registers it in `manifest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already taken.
    pub fn with_name(
        manifest: &mut Manifest,
        name: impl Into<String>,
        runner: Runner,
        repos: Vec<RepoConfig>,
        extra_packages: Option<Vec<String>>,
    ) -> Result<BuildRef> {
        let name = name.into();
        check_name(&name)?;

        let environment = Arc::new(BuildEnvironment {
            name,
            runner,
            repos,
        });
        let build = Self {
            environment: Arc::clone(&environment),
            extra_packages: extra_packages.unwrap_or_default(),
            packages: None,
        };
        manifest.add_pipeline(build)?;

        debug!(pipeline = environment.name(), runner = %runner, "Registered build pipeline");
        Ok(environment)
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.environment.name()
    }

    /// The shared environment handle.
    #[must_use]
    pub fn environment(&self) -> &BuildRef {
        &self.environment
    }

    /// One entry: the runner's packages plus the extra packages.
    ///
    /// # Errors
    ///
    /// Never fails for a build chain; the signature matches other pipelines.
    pub fn package_set_chain(&self) -> Result<Vec<PackageSet>, CompositionError> {
        let mut include = self.environment.runner.build_packages();
        include.extend(self.extra_packages.iter().cloned());

        let chain =
            vec![PackageSet::include(include).with_repositories(self.environment.repos.clone())];
        check_conflicts(self.name(), &chain)?;
        Ok(chain)
    }

    /// Injects the resolved packages.
    ///
    /// # Errors
    ///
    /// Returns an error if called twice or if commits are supplied.
    pub fn serialize_start(&mut self, inputs: ResolvedInputs) -> Result<(), ConfigurationError> {
        if self.packages.is_some() {
            return Err(ConfigurationError::already_primed(self.name()));
        }
        check_commits(self.name(), &inputs.commits, 0)?;
        self.packages = Some(inputs.packages);
        Ok(())
    }

    /// A single rpm stage, tagged with the runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was not primed.
    pub fn serialize(&self) -> Result<SerializedPipeline, ConfigurationError> {
        let packages = self
            .packages
            .as_ref()
            .ok_or_else(|| ConfigurationError::not_primed(self.name()))?;

        let gpgkeys = super::gpg_keys(&self.environment.repos);
        Ok(SerializedPipeline {
            name: self.name().to_string(),
            build: None,
            runner: Some(self.environment.runner.name()),
            stages: vec![Stage::rpm(RpmStageOptions::from_specs(packages, gpgkeys))],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::include_union;
    use crate::stages::RPM;

    fn fedora() -> Runner {
        Runner::Fedora { version: 37 }
    }

    #[test]
    fn test_build_registers_itself() {
        let mut manifest = Manifest::new();
        let build = Build::new(&mut manifest, fedora(), Vec::new(), None).unwrap();

        assert_eq!(build.name(), "build");
        assert_eq!(manifest.pipeline_names(), vec!["build"]);
    }

    #[test]
    fn test_duplicate_build_rejected() {
        let mut manifest = Manifest::new();
        Build::new(&mut manifest, fedora(), Vec::new(), None).unwrap();
        let err = Build::new(&mut manifest, fedora(), Vec::new(), None).unwrap_err();

        assert_eq!(err.error_info().code, "CONFIG-005-DUPLICATE");
    }

    #[test]
    fn test_build_chain_includes_runner_and_extra_packages() {
        let mut manifest = Manifest::new();
        Build::new(&mut manifest, fedora(), Vec::new(), Some(vec!["lorax".to_string()])).unwrap();

        let chains = manifest.package_set_chains().unwrap();
        let union = include_union(&chains["build"]);
        assert!(union.contains("python3"));
        assert!(union.contains("lorax"));
    }

    #[test]
    fn test_build_serializes_single_rpm_stage() {
        let environment = Arc::new(BuildEnvironment {
            name: "build".to_string(),
            runner: fedora(),
            repos: Vec::new(),
        });
        let mut build = Build {
            environment,
            extra_packages: Vec::new(),
            packages: None,
        };

        assert!(matches!(build.serialize(), Err(ConfigurationError::NotPrimed { .. })));

        build
            .serialize_start(ResolvedInputs::packages(vec![PackageSpec::new("glibc", "sha256:01")]))
            .unwrap();
        let pipeline = build.serialize().unwrap();

        assert_eq!(pipeline.runner.as_deref(), Some("org.osbuild.fedora37"));
        assert!(pipeline.build.is_none());
        assert_eq!(pipeline.stages.len(), 1);
        assert_eq!(pipeline.stages[0].stage_type(), RPM);
    }
}
