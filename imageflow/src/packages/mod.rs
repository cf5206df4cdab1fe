//! Package metadata and package set requests.
//!
//! This module provides:
//! - Resolved specs returned by the solver (packages, containers, commits)
//! - Repository configuration
//! - Package set chains handed to the solver
//! - The solver seam itself

mod chain;
mod solver;
mod spec;

pub use chain::{check_conflicts, include_union, PackageSet};
pub use solver::{PackageSolver, SolverError};
#[cfg(test)]
pub use solver::MockPackageSolver;
pub use spec::{CommitSpec, ContainerSpec, PackageSpec, RepoConfig};
