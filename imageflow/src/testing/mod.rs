//! Testing utilities for manifests and pipelines.
//!
//! This module provides:
//! - Fixtures for a primed OS pipeline and a manifest with a build
//! - Assertions over serialized pipelines and package set chains

mod assertions;
mod fixtures;

pub use assertions::{
    assert_chain_excludes, assert_chain_includes, assert_first_boot_commands, find_stage,
};
pub use fixtures::{test_build, test_manifest, test_os, test_subscription, TEST_PACKAGE_CHECKSUM};
