use crate::error::PluginError;
use crate::events::{DeviceEvent, GraphicsApi};

/// Device lifecycle as seen by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    ShuttingDown,
}

/// One graphics-API implementation of the plugin's device and draw protocol.
///
/// Exactly one backend is alive at a time, between the host's Initialize and
/// Shutdown device events. All calls arrive serially on the host render thread.
pub trait RenderBackend: Send {
    fn api(&self) -> GraphicsApi;

    fn state(&self) -> LifecycleState;

    /// React to a device lifecycle notification. Unknown kinds are ignored.
    fn process_device_event(&mut self, event: DeviceEvent);

    /// Whether the backend's depth buffer uses 1.0 at the near plane.
    fn uses_reverse_z(&self) -> bool;

    /// Record the draw for this frame into the host's current command buffer.
    ///
    /// `PluginError::PreconditionSkip` means nothing was recorded and nothing
    /// went wrong; any other error means the frame was skipped after a failure
    /// that the next call retries from scratch.
    fn draw(&mut self, time: f32) -> Result<(), PluginError>;
}
