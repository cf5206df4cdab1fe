//! Stages: typed, immutable units of build work.
//!
//! A [`Stage`] is a type identifier plus options whose shape that identifier
//! determines. The crate only builds stages; the executor interprets them.
//! The type is derived from the options variant, so the two cannot disagree.

mod options;
mod registry;

pub use options::{
    BootupdGenMetadataStageOptions, CustomStageOptions, FirstBootStageOptions,
    OstreeCommitStageOptions, OstreeInitStageOptions, OstreePrepTreeStageOptions, RpmPackage,
    RpmStageOptions, SelinuxStageOptions, SkopeoImage, SkopeoStageOptions, StageOptions,
    BOOTUPD_GEN_METADATA, FIRST_BOOT, OSTREE_COMMIT, OSTREE_INIT, OSTREE_PREPTREE, RPM, SELINUX,
    SKOPEO,
};
pub use registry::{StageContract, StageRegistry};

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// One unit of build work.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    options: StageOptions,
}

impl Stage {
    /// Creates a stage from its options.
    #[must_use]
    pub fn new(options: StageOptions) -> Self {
        Self { options }
    }

    /// The stage type identifier, e.g. `org.osbuild.rpm`.
    #[must_use]
    pub fn stage_type(&self) -> &str {
        self.options.stage_type()
    }

    /// The typed options.
    #[must_use]
    pub fn options(&self) -> &StageOptions {
        &self.options
    }

    /// Creates an rpm stage.
    #[must_use]
    pub fn rpm(options: RpmStageOptions) -> Self {
        Self::new(StageOptions::Rpm(options))
    }

    /// Creates a first-boot stage.
    #[must_use]
    pub fn first_boot(commands: Vec<String>, wait_for_network: bool) -> Self {
        Self::new(StageOptions::FirstBoot(FirstBootStageOptions {
            commands,
            wait_for_network,
        }))
    }

    /// Creates a bootupd metadata stage.
    #[must_use]
    pub fn bootupd_gen_metadata() -> Self {
        Self::new(StageOptions::BootupdGenMetadata(
            BootupdGenMetadataStageOptions::default(),
        ))
    }
}

impl From<StageOptions> for Stage {
    fn from(options: StageOptions) -> Self {
        Self::new(options)
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Stage", 2)?;
        state.serialize_field("type", self.stage_type())?;
        state.serialize_field("options", &self.options)?;
        state.end()
    }
}
