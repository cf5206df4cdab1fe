//! Descriptions of where stages run and what they build for.
//!
//! - [`Runner`]: the distribution that executes a build environment
//! - [`Platform`]: the architecture and boot mode of the target image

mod platform;
mod runner;

pub use platform::{Arch, Platform};
pub use runner::Runner;
