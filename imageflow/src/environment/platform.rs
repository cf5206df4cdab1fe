//! Target platform descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU architecture of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    /// 64-bit x86.
    #[default]
    X86_64,
    /// 64-bit ARM.
    Aarch64,
    /// Little-endian 64-bit POWER.
    Ppc64le,
    /// IBM Z.
    S390x,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Aarch64 => write!(f, "aarch64"),
            Self::Ppc64le => write!(f, "ppc64le"),
            Self::S390x => write!(f, "s390x"),
        }
    }
}

/// Architecture plus boot mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Platform {
    /// CPU architecture.
    pub arch: Arch,
    /// Legacy BIOS boot support (x86_64 only).
    #[serde(default)]
    pub bios: bool,
    /// UEFI vendor directory, e.g. `fedora`. `None` disables UEFI boot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uefi_vendor: Option<String>,
}

impl Platform {
    /// Creates a platform for the given architecture with no boot loader.
    #[must_use]
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            bios: false,
            uefi_vendor: None,
        }
    }

    /// An x86_64 platform booting through BIOS.
    #[must_use]
    pub fn x86_bios() -> Self {
        Self::new(Arch::X86_64).with_bios()
    }

    /// Enables BIOS boot.
    #[must_use]
    pub fn with_bios(mut self) -> Self {
        self.bios = true;
        self
    }

    /// Enables UEFI boot with the given vendor.
    #[must_use]
    pub fn with_uefi_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.uefi_vendor = Some(vendor.into());
        self
    }

    /// Packages the platform needs in the OS tree to boot.
    #[must_use]
    pub fn packages(&self) -> Vec<String> {
        let mut packages = vec!["dracut-config-generic"];
        let uefi = self.uefi_vendor.is_some();

        match self.arch {
            Arch::X86_64 => {
                if self.bios {
                    packages.push("grub2-pc");
                }
                if uefi {
                    packages.extend(["grub2-efi-x64", "shim-x64"]);
                }
            }
            Arch::Aarch64 => {
                if uefi {
                    packages.extend(["efibootmgr", "grub2-efi-aa64", "grub2-tools", "shim-aa64"]);
                }
            }
            Arch::Ppc64le => {
                packages.extend(["powerpc-utils", "grub2-ppc64le", "grub2-ppc64le-modules"]);
            }
            Arch::S390x => packages.push("s390utils-base"),
        }

        packages.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_display() {
        assert_eq!(Arch::X86_64.to_string(), "x86_64");
        assert_eq!(Arch::S390x.to_string(), "s390x");
    }

    #[test]
    fn test_x86_bios_packages() {
        let packages = Platform::x86_bios().packages();
        assert_eq!(packages, vec!["dracut-config-generic", "grub2-pc"]);
    }

    #[test]
    fn test_x86_hybrid_packages() {
        let packages = Platform::x86_bios().with_uefi_vendor("fedora").packages();
        assert!(packages.contains(&"grub2-pc".to_string()));
        assert!(packages.contains(&"shim-x64".to_string()));
    }

    #[test]
    fn test_aarch64_without_uefi() {
        let packages = Platform::new(Arch::Aarch64).packages();
        assert_eq!(packages, vec!["dracut-config-generic"]);
    }
}
