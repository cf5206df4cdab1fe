//! Package set chains.
//!
//! A chain is an ordered `Vec<PackageSet>`. The solver applies entries in
//! order, so a later entry can exclude what an earlier one included. Names
//! repeated across entries are legal and left for the solver to collapse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::RepoConfig;
use crate::errors::CompositionError;

/// One include/exclude request over a set of repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PackageSet {
    /// Package names to install.
    #[serde(default)]
    pub include: Vec<String>,
    /// Package names that must not be installed.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Repositories the entry resolves against, in priority order.
    #[serde(default)]
    pub repositories: Vec<RepoConfig>,
}

impl PackageSet {
    /// Creates an entry including the given names.
    #[must_use]
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the excluded names.
    #[must_use]
    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the repositories.
    #[must_use]
    pub fn with_repositories(mut self, repositories: Vec<RepoConfig>) -> Self {
        self.repositories = repositories;
        self
    }

    /// Names present in both `include` and `exclude`, sorted.
    #[must_use]
    pub fn conflicts(&self) -> Vec<String> {
        let excluded: BTreeSet<&str> = self.exclude.iter().map(String::as_str).collect();
        let conflicting: BTreeSet<&str> = self
            .include
            .iter()
            .map(String::as_str)
            .filter(|name| excluded.contains(name))
            .collect();
        conflicting.into_iter().map(String::from).collect()
    }
}

/// Rejects a chain where any single entry includes and excludes a name.
///
/// # Errors
///
/// Returns the first conflicting entry.
pub fn check_conflicts(pipeline: &str, chain: &[PackageSet]) -> Result<(), CompositionError> {
    for (index, set) in chain.iter().enumerate() {
        let conflicts = set.conflicts();
        if !conflicts.is_empty() {
            return Err(CompositionError::new(pipeline, index, conflicts));
        }
    }
    Ok(())
}

/// The union of every entry's includes, sorted and de-duplicated.
#[must_use]
pub fn include_union(chain: &[PackageSet]) -> BTreeSet<String> {
    chain
        .iter()
        .flat_map(|set| set.include.iter().cloned())
        .collect()
}
