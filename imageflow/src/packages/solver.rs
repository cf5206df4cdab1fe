//! Seam to the external dependency solver.

use thiserror::Error;

use super::{PackageSet, PackageSpec};

/// Failure reported by a dependency solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Depsolve failed for pipeline '{pipeline}': {reason}")]
pub struct SolverError {
    /// The pipeline whose chain failed to resolve.
    pub pipeline: String,
    /// The solver's explanation.
    pub reason: String,
}

impl SolverError {
    /// Creates a new solver error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            reason: reason.into(),
        }
    }
}

/// Resolves a package set chain into concrete package specs.
///
/// A chain is one atomic resolution unit: implementations must apply the
/// entries in order and return the complete transaction.
#[cfg_attr(test, mockall::automock)]
pub trait PackageSolver: Send + Sync {
    /// Resolves `chain` on behalf of `pipeline`.
    fn depsolve(
        &self,
        pipeline: &str,
        chain: &[PackageSet],
    ) -> Result<Vec<PackageSpec>, SolverError>;
}
