//! # Imageflow
//!
//! Compiles operating system image definitions into manifests: ordered,
//! named pipelines of typed stages that an external executor runs.
//!
//! The crate covers:
//!
//! - **Pipelines**: a build environment, the OS tree and an ostree commit
//! - **Package set chains**: ordered include/exclude requests for a solver
//! - **First-boot registration**: subscription, insights and rhc commands
//! - **Stages**: typed options plus a registry of stage contracts
//! - **Checkpoints**: content-addressed cache boundaries in the manifest
//!
//! Dependency resolution and image execution happen elsewhere; resolved
//! content is injected before serialization.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use imageflow::prelude::*;
//!
//! let mut manifest = Manifest::new();
//! let build = Build::new(&mut manifest, Runner::Fedora { version: 37 }, repos.clone(), None)?;
//! manifest.checkpoint(build.name())?;
//!
//! let os = Os::new(&build, Platform::x86_bios(), repos)
//!     .with_customizations(OsCustomizations::new().with_packages(["vim"]));
//! manifest.add_pipeline(os)?;
//!
//! let document = manifest.resolve_and_serialize(&solver, ResolvedContent::new())?;
//! println!("{}", document.to_json()?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod environment;
pub mod errors;
pub mod manifest;
pub mod observability;
pub mod packages;
pub mod pipeline;
pub mod stages;
pub mod subscription;
pub mod testing;

pub use errors::{ImageflowError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::environment::{Arch, Platform, Runner};
    pub use crate::errors::{
        CompositionError, ConfigurationError, ContractViolation, ErrorInfo, ImageflowError,
    };
    pub use crate::manifest::{Manifest, ResolvedContent, SerializedManifest};
    pub use crate::packages::{
        CommitSpec, ContainerSpec, PackageSet, PackageSolver, PackageSpec, RepoConfig, SolverError,
    };
    pub use crate::pipeline::{
        Build, BuildRef, Os, OsCustomizations, OstreeCommit, Pipeline, ResolvedInputs,
        SerializedPipeline,
    };
    pub use crate::stages::{Stage, StageContract, StageOptions, StageRegistry};
    pub use crate::subscription::{registration_commands, Subscription};
}
