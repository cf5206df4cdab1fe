//! Ostree commit pipeline.

use tracing::debug;

use super::{check_commits, check_name, BuildRef, ResolvedInputs, SerializedPipeline};
use crate::errors::ConfigurationError;
use crate::stages::{OstreeCommitStageOptions, OstreeInitStageOptions, Stage, StageOptions};

/// Commits the tree of another pipeline into a fresh ostree repository.
///
/// Resolves no packages. Its only resolved input is an optional parent
/// commit the new commit is chained onto.
#[derive(Debug, Clone)]
pub struct OstreeCommit {
    name: String,
    build: BuildRef,
    tree: String,
    reference: String,
    /// Version recorded in the commit metadata.
    pub os_version: Option<String>,
    parent: Option<String>,
    primed: bool,
}

impl OstreeCommit {
    /// Default name of the commit pipeline.
    pub const DEFAULT_NAME: &'static str = "ostree-commit";

    /// Creates a commit pipeline for the tree produced by `tree`.
    #[must_use]
    pub fn new(build: &BuildRef, tree: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            build: BuildRef::clone(build),
            tree: tree.into(),
            reference: reference.into(),
            os_version: None,
            parent: None,
            primed: false,
        }
    }

    /// Renames the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let name = name.into();
        check_name(&name)?;
        self.name = name;
        Ok(self)
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The build environment the commit is made in.
    #[must_use]
    pub fn build(&self) -> &BuildRef {
        &self.build
    }

    /// Name of the pipeline whose tree is committed.
    #[must_use]
    pub fn tree(&self) -> &str {
        &self.tree
    }

    /// The ref the commit is made on.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Stores the parent commit, if one was resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if called twice or more than one commit is supplied.
    pub fn serialize_start(&mut self, inputs: ResolvedInputs) -> Result<(), ConfigurationError> {
        if self.primed {
            return Err(ConfigurationError::already_primed(&self.name));
        }
        check_commits(&self.name, &inputs.commits, 1)?;
        self.parent = inputs.commits.into_iter().next().map(|c| c.checksum);
        self.primed = true;
        Ok(())
    }

    /// Repository initialization followed by the commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was not primed.
    pub fn serialize(&self) -> Result<SerializedPipeline, ConfigurationError> {
        if !self.primed {
            return Err(ConfigurationError::not_primed(&self.name));
        }

        let stages = vec![
            Stage::new(StageOptions::OstreeInit(OstreeInitStageOptions {
                path: "/repo".to_string(),
            })),
            Stage::new(StageOptions::OstreeCommit(OstreeCommitStageOptions {
                reference: self.reference.clone(),
                os_version: self.os_version.clone(),
                parent: self.parent.clone(),
                tree: format!("name:{}", self.tree),
            })),
        ];

        debug!(
            pipeline = %self.name,
            tree = %self.tree,
            reference = %self.reference,
            "Serialized commit pipeline"
        );
        Ok(SerializedPipeline {
            name: self.name.clone(),
            build: Some(self.build.reference()),
            runner: None,
            stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::CommitSpec;
    use crate::stages::{OSTREE_COMMIT, OSTREE_INIT};
    use crate::testing::test_build;
    use serde_json::json;

    fn parent() -> CommitSpec {
        CommitSpec {
            reference: "fedora/x86_64/iot".to_string(),
            url: "https://example.com/repo".to_string(),
            checksum: "0f1e2d".to_string(),
        }
    }

    #[test]
    fn test_commit_stages() {
        let mut commit = OstreeCommit::new(&test_build(), "os", "fedora/x86_64/iot");
        commit.os_version = Some("37".to_string());
        commit.serialize_start(ResolvedInputs::default()).unwrap();

        let pipeline = commit.serialize().unwrap();
        let types: Vec<&str> = pipeline.stages.iter().map(Stage::stage_type).collect();
        assert_eq!(types, vec![OSTREE_INIT, OSTREE_COMMIT]);
        assert_eq!(
            serde_json::to_value(&pipeline.stages[1]).unwrap(),
            json!({
                "type": "org.osbuild.ostree.commit",
                "options": {"ref": "fedora/x86_64/iot", "os_version": "37", "tree": "name:os"}
            })
        );
    }

    #[test]
    fn test_commit_with_parent() {
        let mut commit = OstreeCommit::new(&test_build(), "os", "fedora/x86_64/iot");
        commit
            .serialize_start(ResolvedInputs {
                commits: vec![parent()],
                ..Default::default()
            })
            .unwrap();

        let pipeline = commit.serialize().unwrap();
        match pipeline.find_stage(OSTREE_COMMIT).map(Stage::options) {
            Some(StageOptions::OstreeCommit(options)) => {
                assert_eq!(options.parent.as_deref(), Some("0f1e2d"));
            }
            other => panic!("Expected commit options, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_rejects_two_parents() {
        let mut commit = OstreeCommit::new(&test_build(), "os", "ref");
        let result = commit.serialize_start(ResolvedInputs {
            commits: vec![parent(), parent()],
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(ConfigurationError::TooManyCommits { max: 1, count: 2, .. })
        ));
    }

    #[test]
    fn test_commit_lifecycle_errors() {
        let mut commit = OstreeCommit::new(&test_build(), "os", "ref");
        assert_eq!(commit.serialize(), Err(ConfigurationError::not_primed("ostree-commit")));

        commit.serialize_start(ResolvedInputs::default()).unwrap();
        assert_eq!(
            commit.serialize_start(ResolvedInputs::default()),
            Err(ConfigurationError::already_primed("ostree-commit"))
        );
    }

    #[test]
    fn test_with_name_rejects_empty() {
        let commit = OstreeCommit::new(&test_build(), "os", "ref");
        assert_eq!(commit.with_name("").unwrap_err(), ConfigurationError::EmptyName);
    }
}
