//! Test assertions for serialized pipelines and chains.

use crate::packages::{include_union, PackageSet};
use crate::pipeline::SerializedPipeline;
use crate::stages::{Stage, StageOptions, FIRST_BOOT};

/// Returns the first stage of the given type.
///
/// # Panics
///
/// Panics if the pipeline has no such stage.
#[must_use]
pub fn find_stage<'a>(pipeline: &'a SerializedPipeline, stage_type: &str) -> &'a Stage {
    pipeline.find_stage(stage_type).unwrap_or_else(|| {
        let types: Vec<&str> = pipeline.stages.iter().map(Stage::stage_type).collect();
        panic!(
            "Expected pipeline '{}' to contain a '{}' stage, stages: {:?}",
            pipeline.name, stage_type, types
        )
    })
}

/// Asserts the first-boot stage runs exactly `expected`, in order.
///
/// # Panics
///
/// Panics if the stage is missing or the commands differ.
pub fn assert_first_boot_commands(pipeline: &SerializedPipeline, expected: &[&str]) {
    match find_stage(pipeline, FIRST_BOOT).options() {
        StageOptions::FirstBoot(options) => assert_eq!(
            options.commands, expected,
            "First-boot commands of pipeline '{}' differ",
            pipeline.name
        ),
        other => panic!("Expected first-boot options, got {other:?}"),
    }
}

/// Asserts every name appears in some entry's include list.
///
/// # Panics
///
/// Panics if a name is missing.
pub fn assert_chain_includes(chain: &[PackageSet], names: &[&str]) {
    let union = include_union(chain);
    for name in names {
        assert!(
            union.contains(*name),
            "Expected chain to include '{}', includes: {:?}",
            name,
            union
        );
    }
}

/// Asserts every name appears in some entry's exclude list.
///
/// # Panics
///
/// Panics if a name is missing.
pub fn assert_chain_excludes(chain: &[PackageSet], names: &[&str]) {
    for name in names {
        assert!(
            chain.iter().any(|set| set.exclude.iter().any(|e| e == name)),
            "Expected chain to exclude '{}'",
            name
        );
    }
}
