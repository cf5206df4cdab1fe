//! Test fixtures.

use crate::environment::{Platform, Runner};
use crate::manifest::Manifest;
use crate::packages::PackageSpec;
use crate::pipeline::{Build, BuildRef, Os, ResolvedInputs};
use crate::subscription::Subscription;

/// Checksum of the single package the fixture OS is primed with.
pub const TEST_PACKAGE_CHECKSUM: &str = "sha1:7e0ec6e8a1c8f5e1b3f4d2c9a6b5e4d3c2b1a0f9";

/// A manifest holding a checkpointed Fedora 37 build pipeline.
///
/// # Panics
///
/// Panics if the build cannot be registered, which only happens if the
/// fixture itself is broken.
#[must_use]
pub fn test_manifest() -> (Manifest, BuildRef) {
    let mut manifest = Manifest::new();
    let build = Build::new(&mut manifest, Runner::Fedora { version: 37 }, Vec::new(), None)
        .expect("fixture build registers");
    manifest
        .checkpoint(build.name())
        .expect("fixture build is attached");
    (manifest, build)
}

/// The build environment of [`test_manifest`].
#[must_use]
pub fn test_build() -> BuildRef {
    test_manifest().1
}

/// An x86_64 BIOS OS pipeline already primed with one package.
///
/// Callers adjust `customizations` and call `serialize` directly.
///
/// # Panics
///
/// Panics if priming fails, which only happens if the fixture is broken.
#[must_use]
pub fn test_os() -> Os {
    let mut os = Os::new(&test_build(), Platform::x86_bios(), Vec::new());
    os.serialize_start(ResolvedInputs::packages(vec![PackageSpec::new(
        "pkg1",
        TEST_PACKAGE_CHECKSUM,
    )]))
    .expect("fresh pipeline accepts inputs");
    os
}

/// Subscription options with both flags off.
#[must_use]
pub fn test_subscription() -> Subscription {
    Subscription::new(
        "2040324",
        "my-secret-key",
        "subscription.rhsm.redhat.com",
        "http://cdn.redhat.com/",
    )
}
