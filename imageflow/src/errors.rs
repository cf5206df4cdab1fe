//! Error types for the imageflow manifest compiler.
//!
//! Every error is reported synchronously to the caller of the operation
//! that produced it. Each error also exposes an [`ErrorInfo`] record with a
//! stable code and a fix hint for diagnostics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packages::SolverError;

/// Result alias used throughout the crate.
pub type Result<T, E = ImageflowError> = std::result::Result<T, E>;

/// The main error type for imageflow operations.
#[derive(Debug, Error)]
pub enum ImageflowError {
    /// A configuration contract was violated.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A package set chain could not be composed.
    #[error("{0}")]
    Composition(#[from] CompositionError),

    /// A stage does not satisfy its registered contract.
    #[error("{0}")]
    Contract(#[from] ContractViolation),

    /// The external dependency solver failed.
    #[error("{0}")]
    Solver(#[from] SolverError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ImageflowError {
    /// Returns diagnostic information for the error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::Configuration(err) => err.error_info(),
            Self::Composition(err) => err.error_info(),
            Self::Contract(err) => err.error_info(),
            Self::Solver(err) => ErrorInfo::new("SOLVER-001", err.to_string())
                .with_fix_hint("Check the repositories and package names handed to the solver."),
            Self::Serialization(err) => ErrorInfo::new("SERDE-001", err.to_string()),
        }
    }
}

/// Diagnostic metadata attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-001-BOOTUPD").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Programmer or configuration contract violations.
///
/// These are fatal for the manifest being compiled: no partial manifest is
/// returned once one of them is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Bootupd metadata was requested for a tree that is not an ostree commit.
    #[error("Pipeline '{pipeline}' requests bootupd metadata but has no OSTree ref")]
    BootupdWithoutOstreeRef {
        /// The pipeline name.
        pipeline: String,
    },

    /// `serialize` was called before `serialize_start`.
    #[error("Pipeline '{pipeline}' was serialized before its resolved content was supplied")]
    NotPrimed {
        /// The pipeline name.
        pipeline: String,
    },

    /// `serialize_start` was called twice.
    #[error("Pipeline '{pipeline}' already received its resolved content")]
    AlreadyPrimed {
        /// The pipeline name.
        pipeline: String,
    },

    /// A checkpoint was requested for a pipeline the manifest does not hold.
    #[error("Cannot checkpoint '{pipeline}': pipeline is not attached to the manifest")]
    PipelineNotAttached {
        /// The pipeline name.
        pipeline: String,
    },

    /// Two pipelines share a name.
    #[error("Pipeline '{pipeline}' is already part of the manifest")]
    DuplicatePipeline {
        /// The pipeline name.
        pipeline: String,
    },

    /// A pipeline depends on a pipeline the manifest does not hold.
    #[error("Pipeline '{pipeline}' depends on '{dependency}' which is not attached to the manifest")]
    UnknownDependency {
        /// The pipeline name.
        pipeline: String,
        /// The missing pipeline name.
        dependency: String,
    },

    /// More ostree commits were resolved than the pipeline can consume.
    #[error("Pipeline '{pipeline}' accepts at most {max} ostree commits, got {count}")]
    TooManyCommits {
        /// The pipeline name.
        pipeline: String,
        /// Number of commits the pipeline consumes.
        max: usize,
        /// Number of commits supplied.
        count: usize,
    },

    /// A pipeline name was empty or whitespace-only.
    #[error("Pipeline name cannot be empty or whitespace-only")]
    EmptyName,
}

impl ConfigurationError {
    /// Creates a bootupd-without-ref error.
    #[must_use]
    pub fn bootupd_without_ostree_ref(pipeline: impl Into<String>) -> Self {
        Self::BootupdWithoutOstreeRef {
            pipeline: pipeline.into(),
        }
    }

    /// Creates a not-primed error.
    #[must_use]
    pub fn not_primed(pipeline: impl Into<String>) -> Self {
        Self::NotPrimed {
            pipeline: pipeline.into(),
        }
    }

    /// Creates an already-primed error.
    #[must_use]
    pub fn already_primed(pipeline: impl Into<String>) -> Self {
        Self::AlreadyPrimed {
            pipeline: pipeline.into(),
        }
    }

    /// Creates a pipeline-not-attached error.
    #[must_use]
    pub fn not_attached(pipeline: impl Into<String>) -> Self {
        Self::PipelineNotAttached {
            pipeline: pipeline.into(),
        }
    }

    /// Returns diagnostic information for the error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(self.code(), self.to_string());
        match self {
            Self::BootupdWithoutOstreeRef { .. } => {
                info.with_fix_hint("Set an OSTree ref on the pipeline or disable bootupd.")
            }
            Self::NotPrimed { .. } => {
                info.with_fix_hint("Call serialize_start with the resolved package specs first.")
            }
            Self::AlreadyPrimed { .. } => {
                info.with_fix_hint("Resolved content can only be supplied once per pipeline.")
            }
            Self::PipelineNotAttached { .. } => {
                info.with_fix_hint("Add the pipeline to the manifest before checkpointing it.")
            }
            Self::DuplicatePipeline { .. } => {
                info.with_fix_hint("Give every pipeline in a manifest a unique name.")
            }
            Self::UnknownDependency { .. } => {
                info.with_fix_hint("Add the pipelines a pipeline depends on before adding it.")
            }
            Self::TooManyCommits { .. } | Self::EmptyName => info,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::BootupdWithoutOstreeRef { .. } => "CONFIG-001-BOOTUPD",
            Self::NotPrimed { .. } => "CONFIG-002-NOT_PRIMED",
            Self::AlreadyPrimed { .. } => "CONFIG-003-ALREADY_PRIMED",
            Self::PipelineNotAttached { .. } => "CONFIG-004-NOT_ATTACHED",
            Self::DuplicatePipeline { .. } => "CONFIG-005-DUPLICATE",
            Self::UnknownDependency { .. } => "CONFIG-006-UNKNOWN_DEPENDENCY",
            Self::TooManyCommits { .. } => "CONFIG-007-COMMITS",
            Self::EmptyName => "CONFIG-008-EMPTY_NAME",
        }
    }
}

/// A package set entry both includes and excludes the same packages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Package set {entry} of pipeline '{pipeline}' both includes and excludes: {}",
    packages.join(", ")
)]
pub struct CompositionError {
    /// The pipeline that authored the chain.
    pub pipeline: String,
    /// Index of the offending entry in the chain.
    pub entry: usize,
    /// The conflicting package names, sorted.
    pub packages: Vec<String>,
}

impl CompositionError {
    /// Creates a new composition error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, entry: usize, packages: Vec<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            entry,
            packages,
        }
    }

    /// Returns diagnostic information for the error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo::new("COMPOSE-001-CONFLICT", self.to_string())
            .with_fix_hint("Remove the packages from either the requested or the excluded list.")
    }
}

/// A stage does not satisfy the stage registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The options lack a field the contract requires.
    #[error("Stage '{stage_type}' is missing required option '{field}'")]
    MissingField {
        /// The stage type identifier.
        stage_type: String,
        /// The missing field.
        field: String,
    },

    /// No contract is registered for the stage type.
    #[error("Stage type '{stage_type}' is not registered")]
    Unregistered {
        /// The stage type identifier.
        stage_type: String,
    },

    /// A contract was re-registered with a different schema.
    #[error("Stage type '{stage_type}' is already registered with a different schema")]
    SchemaConflict {
        /// The stage type identifier.
        stage_type: String,
    },
}

impl ContractViolation {
    /// Creates a missing-field violation.
    #[must_use]
    pub fn missing_field(stage_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            stage_type: stage_type.into(),
            field: field.into(),
        }
    }

    /// Returns diagnostic information for the error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        let code = match self {
            Self::MissingField { .. } => "CONTRACT-001-MISSING_FIELD",
            Self::Unregistered { .. } => "CONTRACT-002-UNREGISTERED",
            Self::SchemaConflict { .. } => "CONTRACT-003-CONFLICT",
        };
        ErrorInfo::new(code, self.to_string())
    }
}
