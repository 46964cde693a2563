//! SPIR-V for the triangle pipeline, compiled from `shaders/` by the build script.

include!(concat!(env!("OUT_DIR"), "/shaders.rs"));

/// Entry point of both stages.
pub const ENTRY_POINT: &std::ffi::CStr = c"main";
