//! Runner identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The distribution that executes the stages of a build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "distro", rename_all = "snake_case")]
pub enum Runner {
    /// Fedora of the given release.
    Fedora {
        /// Release number.
        version: u32,
    },
    /// Red Hat Enterprise Linux.
    Rhel {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
    },
    /// CentOS Stream.
    #[serde(rename = "centos")]
    CentOS {
        /// Stream version.
        version: u32,
    },
    /// A generic Linux host.
    Linux,
}

impl Runner {
    /// The executor's runner identifier, e.g. `org.osbuild.fedora37`.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Packages the runner needs inside the build root to execute stages.
    #[must_use]
    pub fn build_packages(&self) -> Vec<String> {
        let packages: &[&str] = match self {
            Self::Fedora { .. } | Self::CentOS { .. } => &["glibc", "systemd", "python3"],
            Self::Rhel { major, .. } if *major >= 8 => &["glibc", "systemd", "platform-python"],
            Self::Rhel { .. } => &["glibc", "systemd", "python3"],
            Self::Linux => &[],
        };
        packages.iter().map(|p| (*p).to_string()).collect()
    }
}

impl fmt::Display for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fedora { version } => write!(f, "org.osbuild.fedora{version}"),
            Self::Rhel { major, minor } => write!(f, "org.osbuild.rhel{major}{minor}"),
            Self::CentOS { version } => write!(f, "org.osbuild.centos{version}"),
            Self::Linux => write!(f, "org.osbuild.linux"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_names() {
        assert_eq!(Runner::Fedora { version: 37 }.name(), "org.osbuild.fedora37");
        assert_eq!(Runner::Rhel { major: 9, minor: 2 }.name(), "org.osbuild.rhel92");
        assert_eq!(Runner::CentOS { version: 9 }.name(), "org.osbuild.centos9");
        assert_eq!(Runner::Linux.name(), "org.osbuild.linux");
    }

    #[test]
    fn test_build_packages() {
        assert!(Runner::Rhel { major: 8, minor: 6 }
            .build_packages()
            .contains(&"platform-python".to_string()));
        assert!(Runner::Rhel { major: 7, minor: 9 }
            .build_packages()
            .contains(&"python3".to_string()));
        assert!(Runner::Linux.build_packages().is_empty());
    }

    #[test]
    fn test_runner_deserializes_from_tagged_json() {
        let runner: Runner = serde_json::from_str(r#"{"distro":"fedora","version":39}"#).unwrap();
        assert_eq!(runner, Runner::Fedora { version: 39 });
    }
}
