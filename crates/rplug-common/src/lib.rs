//! Shared plumbing for the rplug crates.

pub mod logging;
