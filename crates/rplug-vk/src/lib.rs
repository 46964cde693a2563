//! Vulkan backend of the native render plugin.
//!
//! Draws a spinning, vertex-colored triangle into the host's current render
//! pass. The host owns the instance, device, queue and command buffers; this
//! crate owns one vertex buffer and one graphics pipeline per device lifetime.

pub mod backend;
pub mod buffer;
pub mod device;
pub mod draw;
pub mod host;
pub mod pipeline;
pub mod shaders;
pub mod vertex;

pub use backend::VulkanBackend;
pub use buffer::GpuBuffer;
pub use device::{AshDevice, AshLoader, DeviceApi, DeviceLoader};
pub use host::{EventConfig, QueueAccess, RecordingState, VulkanHost, VulkanInstance};
pub use pipeline::{PipelineCache, PipelineHandles};

use rplug_core::{BackendRegistry, GraphicsApi, RenderBackend, RenderSettings};
use tracing::warn;

/// Register the Vulkan backend with `registry`.
///
/// `connect` is called on every device Initialize reporting Vulkan and yields
/// the host's Vulkan interface, or `None` if the host does not expose one.
pub fn register_vulkan<H, F, L>(
    registry: &mut BackendRegistry,
    connect: F,
    loader: L,
    settings: RenderSettings,
) where
    H: VulkanHost + 'static,
    F: Fn() -> Option<H> + Send + 'static,
    L: DeviceLoader + Clone + 'static,
{
    registry.register(
        GraphicsApi::Vulkan,
        Box::new(move || {
            let Some(host) = connect() else {
                warn!("host reports Vulkan but exposes no Vulkan interface");
                return None;
            };
            let backend = VulkanBackend::new(host, loader.clone(), settings.clone());
            Some(Box::new(backend) as Box<dyn RenderBackend>)
        }),
    );
}
