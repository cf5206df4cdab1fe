//! Subscription and registration options.
//!
//! Registration happens on the first boot of the image. The command list is
//! produced by [`registration_commands`], a pure function of the options, so
//! the ordering rules below can be checked in one place:
//!
//! 1. `subscription-manager register` always runs first.
//! 2. With `rhc` set, the host connects through rhc and the insights flag is
//!    ignored. Otherwise, with `insights` set, the host registers with
//!    insights-client. Otherwise nothing else runs.
//!
//! Package requirements are additive across both flags: see
//! [`Subscription::package_sets`].

use serde::{Deserialize, Serialize};

use crate::packages::PackageSet;

const SUBSCRIPTION_MANAGER: &str = "subscription-manager";
const INSIGHTS_CLIENT: &str = "insights-client";
const RHC: &str = "rhc";

/// Options for registering the image with a subscription service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Subscription {
    /// Organization id.
    pub organization: String,
    /// Activation key.
    pub activation_key: String,
    /// Subscription server URL.
    pub server_url: String,
    /// Content base URL.
    pub base_url: String,
    /// Register with Red Hat Insights.
    #[serde(default)]
    pub insights: bool,
    /// Connect through rhc. Takes precedence over `insights` for commands.
    #[serde(default)]
    pub rhc: bool,
}

impl Subscription {
    /// Creates subscription options with both flags off.
    #[must_use]
    pub fn new(
        organization: impl Into<String>,
        activation_key: impl Into<String>,
        server_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            activation_key: activation_key.into(),
            server_url: server_url.into(),
            base_url: base_url.into(),
            insights: false,
            rhc: false,
        }
    }

    /// Sets the insights flag.
    #[must_use]
    pub fn with_insights(mut self, insights: bool) -> Self {
        self.insights = insights;
        self
    }

    /// Sets the rhc flag.
    #[must_use]
    pub fn with_rhc(mut self, rhc: bool) -> Self {
        self.rhc = rhc;
        self
    }

    /// Package set entries the options add to a chain, in order.
    ///
    /// The rhc entry names all three packages even when earlier entries
    /// already did; the solver collapses the duplicates.
    #[must_use]
    pub fn package_sets(&self) -> Vec<PackageSet> {
        let mut sets = vec![PackageSet::include([SUBSCRIPTION_MANAGER])];
        if self.insights {
            sets.push(PackageSet::include([INSIGHTS_CLIENT]));
        }
        if self.rhc {
            sets.push(PackageSet::include([RHC, SUBSCRIPTION_MANAGER, INSIGHTS_CLIENT]));
        }
        sets
    }

    fn register_command(&self) -> String {
        format!(
            "/usr/sbin/subscription-manager register --org={} --activationkey={} --serverurl {} --baseurl {}",
            self.organization, self.activation_key, self.server_url, self.base_url
        )
    }

    fn rhc_connect_command(&self) -> String {
        format!(
            "/usr/bin/rhc connect -o={} -a={} --server {}",
            self.organization, self.activation_key, self.server_url
        )
    }
}

/// Ordered first-boot commands that register a host.
#[must_use]
pub fn registration_commands(subscription: &Subscription) -> Vec<String> {
    let mut commands = vec![subscription.register_command()];

    if subscription.rhc {
        commands.push(subscription.rhc_connect_command());
        commands.push("restorecon -R /root/.gnupg".to_string());
        commands.push("/usr/sbin/semanage permissive --add rhcd_t".to_string());
    } else if subscription.insights {
        commands.push("/usr/bin/insights-client --register".to_string());
        commands.push("restorecon -R /root/.gnupg".to_string());
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::include_union;
    use pretty_assertions::assert_eq;

    const REGISTER: &str = "/usr/sbin/subscription-manager register --org=2040324 --activationkey=my-secret-key --serverurl subscription.rhsm.redhat.com --baseurl http://cdn.redhat.com/";

    fn options() -> Subscription {
        Subscription::new(
            "2040324",
            "my-secret-key",
            "subscription.rhsm.redhat.com",
            "http://cdn.redhat.com/",
        )
    }

    #[test]
    fn test_register_only() {
        assert_eq!(registration_commands(&options()), vec![REGISTER.to_string()]);
    }

    #[test]
    fn test_insights_commands() {
        let commands = registration_commands(&options().with_insights(true));
        assert_eq!(
            commands,
            vec![
                REGISTER.to_string(),
                "/usr/bin/insights-client --register".to_string(),
                "restorecon -R /root/.gnupg".to_string(),
            ]
        );
    }

    #[test]
    fn test_rhc_commands() {
        let commands = registration_commands(&options().with_rhc(true));
        assert_eq!(
            commands,
            vec![
                REGISTER.to_string(),
                "/usr/bin/rhc connect -o=2040324 -a=my-secret-key --server subscription.rhsm.redhat.com"
                    .to_string(),
                "restorecon -R /root/.gnupg".to_string(),
                "/usr/sbin/semanage permissive --add rhcd_t".to_string(),
            ]
        );
    }

    #[test]
    fn test_rhc_takes_precedence_over_insights() {
        let both = registration_commands(&options().with_rhc(true).with_insights(true));
        let rhc_only = registration_commands(&options().with_rhc(true));
        assert_eq!(both, rhc_only);
        assert!(!both.iter().any(|c| c.contains("insights-client")));
    }

    #[test]
    fn test_package_sets_are_additive() {
        let sets = options().with_rhc(true).with_insights(true).package_sets();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[2].include, vec!["rhc", "subscription-manager", "insights-client"]);

        let union = include_union(&options().with_rhc(true).package_sets());
        assert!(union.contains("insights-client"));
    }

    #[test]
    fn test_minimal_package_sets() {
        let sets = options().package_sets();
        assert_eq!(sets, vec![PackageSet::include(["subscription-manager"])]);
    }
}
