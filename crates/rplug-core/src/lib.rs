//! Backend-neutral half of the native render plugin.
//!
//! Everything here is independent of a particular graphics binding: the
//! host's API and device-event identifiers, the error taxonomy, the plugin
//! configuration, the shared animation clock, the draw transform, and the
//! state machine that owns the active backend between device Initialize and
//! Shutdown.

pub mod backend;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod registry;
pub mod transform;

pub use backend::{LifecycleState, RenderBackend};
pub use clock::AnimationClock;
pub use config::{LoggingConfig, PluginConfig, RenderSettings};
pub use context::PluginContext;
pub use error::{AllocationStage, PluginError, SkipReason};
pub use events::{DeviceEvent, GraphicsApi, DRAW_EVENT_ID};
pub use registry::{BackendFactory, BackendRegistry};
