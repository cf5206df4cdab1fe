//! OS tree pipeline.
//!
//! Assembles the operating system tree: package installation, embedded
//! containers, first-boot registration, bootloader update metadata, SELinux
//! relabeling and ostree preparation.
//!
//! Stage order is fixed:
//!
//! ```text
//! rpm -> skopeo -> first-boot -> bootupd.gen-metadata -> selinux -> ostree.preptree
//! ```
//!
//! Stages whose feature is off are skipped; the rest never reorder.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_commits, check_name, gpg_keys, BuildRef, ResolvedInputs, SerializedPipeline};
use crate::environment::Platform;
use crate::errors::{CompositionError, ConfigurationError};
use crate::packages::{ContainerSpec, PackageSet, PackageSpec, RepoConfig};
use crate::stages::{
    OstreePrepTreeStageOptions, RpmStageOptions, SelinuxStageOptions, SkopeoStageOptions, Stage,
    StageOptions,
};
use crate::subscription::{registration_commands, Subscription};

/// Caller-controlled configuration of an OS tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OsCustomizations {
    /// Packages installed on top of the platform's packages.
    #[serde(default)]
    pub extra_base_packages: Vec<String>,
    /// Packages that must not be installed.
    #[serde(default)]
    pub exclude_base_packages: Vec<String>,
    /// Kernel package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_name: Option<String>,
    /// Registration performed on first boot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    /// Ref the tree will be committed on. Marks the tree as an ostree tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ostree_ref: Option<String>,
    /// Generate bootupd metadata. Requires `ostree_ref`.
    #[serde(default)]
    pub bootupd: bool,
    /// SELinux policy used to relabel the tree, e.g. `targeted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selinux: Option<String>,
}

impl OsCustomizations {
    /// Creates empty customizations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds extra packages.
    #[must_use]
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_base_packages.extend(packages.into_iter().map(Into::into));
        self
    }

    /// Adds excluded packages.
    #[must_use]
    pub fn with_excludes<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_base_packages.extend(packages.into_iter().map(Into::into));
        self
    }

    /// Sets the subscription options.
    #[must_use]
    pub fn with_subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    /// Sets the OSTree ref.
    #[must_use]
    pub fn with_ostree_ref(mut self, reference: impl Into<String>) -> Self {
        self.ostree_ref = Some(reference.into());
        self
    }

    /// Sets the SELinux policy.
    #[must_use]
    pub fn with_selinux(mut self, policy: impl Into<String>) -> Self {
        self.selinux = Some(policy.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
    packages: Vec<PackageSpec>,
    containers: Vec<ContainerSpec>,
}

/// The principal pipeline: an operating system tree.
#[derive(Debug, Clone)]
pub struct Os {
    name: String,
    build: BuildRef,
    platform: Platform,
    repos: Vec<RepoConfig>,
    /// Configuration applied before serialization.
    pub customizations: OsCustomizations,
    resolved: Option<Resolved>,
}

impl Os {
    /// Default name of the OS pipeline.
    pub const DEFAULT_NAME: &'static str = "os";

    /// Creates an OS pipeline named `os`.
    #[must_use]
    pub fn new(build: &BuildRef, platform: Platform, repos: Vec<RepoConfig>) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            build: BuildRef::clone(build),
            platform,
            repos,
            customizations: OsCustomizations::default(),
            resolved: None,
        }
    }

    /// Creates a named OS pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn with_name(
        name: impl Into<String>,
        build: &BuildRef,
        platform: Platform,
        repos: Vec<RepoConfig>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            name,
            ..Self::new(build, platform, repos)
        })
    }

    /// Replaces the customizations.
    #[must_use]
    pub fn with_customizations(mut self, customizations: OsCustomizations) -> Self {
        self.customizations = customizations;
        self
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The build environment the tree is assembled in.
    #[must_use]
    pub fn build(&self) -> &BuildRef {
        &self.build
    }

    /// The target platform.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The package set chain for the solver.
    ///
    /// The first entry holds the base packages and excludes. Subscription
    /// options then append their own entries without touching the base.
    ///
    /// Only packages the caller requested are checked against the excludes.
    /// Excluding a package the pipeline adds on its own is left to the solver.
    ///
    /// # Errors
    ///
    /// Returns an error if a requested package is also excluded.
    pub fn package_set_chain(&self) -> Result<Vec<PackageSet>, CompositionError> {
        let c = &self.customizations;

        let conflicts = PackageSet::include(c.extra_base_packages.iter().cloned())
            .with_exclude(c.exclude_base_packages.iter().cloned())
            .conflicts();
        if !conflicts.is_empty() {
            return Err(CompositionError::new(&self.name, 0, conflicts));
        }

        let mut include = self.platform.packages();
        include.extend(c.kernel_name.iter().cloned());
        if c.ostree_ref.is_some() {
            include.push("rpm-ostree".to_string());
        }
        if c.bootupd {
            include.push("bootupd".to_string());
        }
        include.extend(c.extra_base_packages.iter().cloned());

        let mut chain = vec![PackageSet::include(include)
            .with_exclude(c.exclude_base_packages.iter().cloned())
            .with_repositories(self.repos.clone())];

        if let Some(subscription) = &c.subscription {
            chain.extend(
                subscription
                    .package_sets()
                    .into_iter()
                    .map(|set| set.with_repositories(self.repos.clone())),
            );
        }

        debug!(pipeline = %self.name, entries = chain.len(), "Composed package set chain");
        Ok(chain)
    }

    /// Injects resolved packages and containers.
    ///
    /// # Errors
    ///
    /// Returns an error if called twice or if commits are supplied.
    pub fn serialize_start(&mut self, inputs: ResolvedInputs) -> Result<(), ConfigurationError> {
        if self.resolved.is_some() {
            return Err(ConfigurationError::already_primed(&self.name));
        }
        check_commits(&self.name, &inputs.commits, 0)?;
        self.resolved = Some(Resolved {
            packages: inputs.packages,
            containers: inputs.containers,
        });
        Ok(())
    }

    /// Produces the stage sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was not primed, or bootupd is
    /// requested without an OSTree ref.
    pub fn serialize(&self) -> Result<SerializedPipeline, ConfigurationError> {
        let resolved = self
            .resolved
            .as_ref()
            .ok_or_else(|| ConfigurationError::not_primed(&self.name))?;
        let c = &self.customizations;
        if c.bootupd && c.ostree_ref.is_none() {
            return Err(ConfigurationError::bootupd_without_ostree_ref(&self.name));
        }

        let mut stages = vec![Stage::rpm(RpmStageOptions::from_specs(
            &resolved.packages,
            gpg_keys(&self.repos),
        ))];

        if !resolved.containers.is_empty() {
            stages.push(Stage::new(StageOptions::Skopeo(
                SkopeoStageOptions::containers_storage(&resolved.containers),
            )));
        }

        if let Some(subscription) = &c.subscription {
            stages.push(Stage::first_boot(registration_commands(subscription), true));
        }

        if c.bootupd {
            stages.push(Stage::bootupd_gen_metadata());
        }

        if let Some(policy) = &c.selinux {
            stages.push(Stage::new(StageOptions::Selinux(SelinuxStageOptions::for_policy(
                policy,
            ))));
        }

        if c.ostree_ref.is_some() {
            stages.push(Stage::new(StageOptions::OstreePrepTree(OstreePrepTreeStageOptions {
                etc_group_members: vec!["wheel".to_string()],
            })));
        }

        debug!(pipeline = %self.name, stages = stages.len(), "Serialized OS pipeline");
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
    use crate::environment::Arch;
    use crate::packages::include_union;
    use crate::stages::{BOOTUPD_GEN_METADATA, FIRST_BOOT, OSTREE_PREPTREE, RPM, SELINUX, SKOPEO};
    use crate::testing::{
        assert_chain_excludes, assert_chain_includes, assert_first_boot_commands, test_os,
    };
    use pretty_assertions::assert_eq;

    const REGISTER: &str = "/usr/sbin/subscription-manager register --org=2040324 --activationkey=my-secret-key --serverurl subscription.rhsm.redhat.com --baseurl http://cdn.redhat.com/";

    fn subscription() -> Subscription {
        Subscription::new(
            "2040324",
            "my-secret-key",
            "subscription.rhsm.redhat.com",
            "http://cdn.redhat.com/",
        )
    }

    fn stage_types(pipeline: &SerializedPipeline) -> Vec<&str> {
        pipeline.stages.iter().map(Stage::stage_type).collect()
    }

    #[test]
    fn test_subscription_manager_commands() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription());

        let pipeline = os.serialize().unwrap();
        assert_first_boot_commands(&pipeline, &[REGISTER]);
    }

    #[test]
    fn test_subscription_manager_insights_commands() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription().with_insights(true));

        let pipeline = os.serialize().unwrap();
        assert_first_boot_commands(
            &pipeline,
            &[
                REGISTER,
                "/usr/bin/insights-client --register",
                "restorecon -R /root/.gnupg",
            ],
        );
    }

    #[test]
    fn test_rhc_insights_commands() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription().with_rhc(true));

        let pipeline = os.serialize().unwrap();
        assert_first_boot_commands(
            &pipeline,
            &[
                REGISTER,
                "/usr/bin/rhc connect -o=2040324 -a=my-secret-key --server subscription.rhsm.redhat.com",
                "restorecon -R /root/.gnupg",
                "/usr/sbin/semanage permissive --add rhcd_t",
            ],
        );
    }

    #[test]
    fn test_subscription_manager_packages() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription());

        let chain = os.package_set_chain().unwrap();
        assert_chain_includes(&chain, &["subscription-manager"]);

        let union = include_union(&chain);
        assert!(!union.contains("insights-client"));
        assert!(!union.contains("rhc"));
    }

    #[test]
    fn test_subscription_manager_insights_packages() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription().with_insights(true));

        let chain = os.package_set_chain().unwrap();
        assert_chain_includes(&chain, &["subscription-manager", "insights-client"]);
    }

    #[test]
    fn test_rhc_insights_packages() {
        for insights in [false, true] {
            let mut os = test_os();
            os.customizations.subscription =
                Some(subscription().with_rhc(true).with_insights(insights));

            let chain = os.package_set_chain().unwrap();
            assert_chain_includes(&chain, &["rhc", "subscription-manager", "insights-client"]);
        }
    }

    #[test]
    fn test_subscription_entries_follow_base_entry() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription().with_insights(true).with_rhc(true));

        let chain = os.package_set_chain().unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[1].include, vec!["subscription-manager"]);
        assert_eq!(chain[2].include, vec!["insights-client"]);
        assert_eq!(chain[3].include, vec!["rhc", "subscription-manager", "insights-client"]);
        assert!(!chain[0].include.contains(&"subscription-manager".to_string()));
    }

    #[test]
    fn test_base_entry_contents() {
        let mut os = test_os();
        os.customizations = OsCustomizations::new()
            .with_packages(["vim"])
            .with_excludes(["nano"])
            .with_ostree_ref("fedora/x86_64/iot");
        os.customizations.kernel_name = Some("kernel".to_string());
        os.customizations.bootupd = true;

        let chain = os.package_set_chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(
            chain[0].include,
            vec!["dracut-config-generic", "grub2-pc", "kernel", "rpm-ostree", "bootupd", "vim"]
        );
        assert_eq!(chain[0].exclude, vec!["nano"]);
    }

    #[test]
    fn test_include_exclude_conflict_rejected() {
        let mut os = test_os();
        os.customizations = OsCustomizations::new()
            .with_packages(["vim", "git"])
            .with_excludes(["git"]);

        let err = os.package_set_chain().unwrap_err();
        assert_eq!(err.entry, 0);
        assert_eq!(err.packages, vec!["git".to_string()]);
    }

    #[test]
    fn test_excluding_platform_package_left_to_solver() {
        let os = Os::new(&crate::testing::test_build(), Platform::x86_bios(), Vec::new())
            .with_customizations(OsCustomizations::new().with_excludes(["grub2-pc"]));

        let chain = os.package_set_chain().unwrap();
        assert_chain_includes(&chain, &["grub2-pc"]);
        assert_chain_excludes(&chain, &["grub2-pc"]);
    }

    #[test]
    fn test_excluding_requested_package_rejected() {
        let os = Os::new(&crate::testing::test_build(), Platform::x86_bios(), Vec::new())
            .with_customizations(
                OsCustomizations::new().with_packages(["git"]).with_excludes(["git"]),
            );

        let err = os.package_set_chain().unwrap_err();
        assert_eq!(err, CompositionError::new("os", 0, vec!["git".to_string()]));
    }

    #[test]
    fn test_bootupd_stage() {
        let mut os = test_os();
        os.customizations.ostree_ref = Some("some/ref".to_string());
        os.customizations.bootupd = true;

        let pipeline = os.serialize().unwrap();
        let count = pipeline
            .stages
            .iter()
            .filter(|s| s.stage_type() == BOOTUPD_GEN_METADATA)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_bootupd_without_ostree_ref() {
        let mut os = test_os();
        os.customizations.bootupd = true;

        assert_eq!(
            os.serialize(),
            Err(ConfigurationError::bootupd_without_ostree_ref("os"))
        );
    }

    #[test]
    fn test_serialize_before_start() {
        let os = Os::new(&crate::testing::test_build(), Platform::x86_bios(), Vec::new());
        assert_eq!(os.serialize(), Err(ConfigurationError::not_primed("os")));
    }

    #[test]
    fn test_serialize_start_twice() {
        let mut os = test_os();
        assert_eq!(
            os.serialize_start(ResolvedInputs::default()),
            Err(ConfigurationError::already_primed("os"))
        );
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription().with_insights(true));
        os.customizations.selinux = Some("targeted".to_string());

        let first = os.serialize().unwrap();
        let second = os.serialize().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_full_stage_order() {
        let build = crate::testing::test_build();
        let platform = Platform::new(Arch::X86_64).with_uefi_vendor("fedora");
        let mut os = Os::new(&build, platform, Vec::new()).with_customizations(
            OsCustomizations::new()
                .with_subscription(subscription().with_rhc(true))
                .with_ostree_ref("fedora/x86_64/iot")
                .with_selinux("targeted"),
        );
        os.customizations.bootupd = true;
        os.serialize_start(ResolvedInputs {
            packages: vec![PackageSpec::new("pkg1", "sha256:01")],
            containers: vec![ContainerSpec {
                source: "registry.example.com/app:latest".to_string(),
                digest: "sha256:aa".to_string(),
                image_id: "sha256:bb".to_string(),
                local_name: "app".to_string(),
            }],
            commits: Vec::new(),
        })
        .unwrap();

        let pipeline = os.serialize().unwrap();
        assert_eq!(
            stage_types(&pipeline),
            vec![RPM, SKOPEO, FIRST_BOOT, BOOTUPD_GEN_METADATA, SELINUX, OSTREE_PREPTREE]
        );
        assert_eq!(pipeline.build.as_deref(), Some("name:build"));
    }

    #[test]
    fn test_rpm_precedes_first_boot() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription());

        let pipeline = os.serialize().unwrap();
        let rpm = pipeline.stage_position(RPM).unwrap();
        let first_boot = pipeline.stage_position(FIRST_BOOT).unwrap();
        assert!(rpm < first_boot);
    }

    #[test]
    fn test_first_boot_waits_for_network() {
        let mut os = test_os();
        os.customizations.subscription = Some(subscription());

        let pipeline = os.serialize().unwrap();
        match pipeline.find_stage(FIRST_BOOT).map(Stage::options) {
            Some(StageOptions::FirstBoot(options)) => assert!(options.wait_for_network),
            other => panic!("Expected first-boot options, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_os_has_only_rpm_stage() {
        let os = test_os();
        let pipeline = os.serialize().unwrap();
        assert_eq!(stage_types(&pipeline), vec![RPM]);
    }

    #[test]
    fn test_os_rejects_commits() {
        let build = crate::testing::test_build();
        let mut os = Os::new(&build, Platform::x86_bios(), Vec::new());
        let inputs = ResolvedInputs {
            commits: vec![crate::packages::CommitSpec {
                reference: "r".to_string(),
                url: "u".to_string(),
                checksum: "c".to_string(),
            }],
            ..Default::default()
        };

        assert!(matches!(
            os.serialize_start(inputs),
            Err(ConfigurationError::TooManyCommits { max: 0, count: 1, .. })
        ));
    }
}
