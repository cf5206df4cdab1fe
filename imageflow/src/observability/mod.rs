//! Observability utilities.
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the binary embedding it; [`init_logging`] is a convenience for that.

mod logging;

pub use logging::{init_logging, LogFormat, DEFAULT_FILTER};
