//! What the plugin needs from the host's Vulkan renderer.

use ash::vk;
use bitflags::bitflags;

/// Handles of the host's Vulkan device, valid between Initialize and Shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct VulkanInstance {
    pub pipeline_cache: vk::PipelineCache,
    pub instance: vk::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: vk::Device,
    pub graphics_queue: vk::Queue,
    pub get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub queue_family_index: u32,
}

/// Snapshot of the host's command recording for the current render event.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingState {
    pub command_buffer: vk::CommandBuffer,
    pub command_buffer_level: vk::CommandBufferLevel,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub subpass_index: u32,
    /// Frame currently being recorded.
    pub current_frame: u64,
    /// Newest frame whose GPU work is known to have completed.
    pub safe_frame: u64,
}

/// Render-pass state the host must establish before delivering an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassPrecondition {
    DontCare,
    EnsureInside,
    EnsureOutside,
}

/// Whether the plugin needs the host's graphics queue during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAccess {
    DontCare,
    Allow,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventConfigFlags: u32 {
        const ENSURE_PREVIOUS_FRAME_SUBMISSION = 1 << 0;
        const FLUSH_COMMAND_BUFFERS = 1 << 1;
        const SYNC_WORKER_THREADS = 1 << 2;
        const MODIFIES_COMMAND_BUFFERS_STATE = 1 << 3;
    }
}

/// Synchronization requirements registered for one render-event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventConfig {
    pub render_pass: RenderPassPrecondition,
    pub queue_access: QueueAccess,
    pub flags: EventConfigFlags,
}

impl EventConfig {
    /// Draw events: inside an active render pass, no claim on the queue.
    pub fn inside_render_pass() -> Self {
        Self {
            render_pass: RenderPassPrecondition::EnsureInside,
            queue_access: QueueAccess::DontCare,
            flags: EventConfigFlags::ENSURE_PREVIOUS_FRAME_SUBMISSION
                | EventConfigFlags::MODIFIES_COMMAND_BUFFERS_STATE,
        }
    }
}

/// The host's Vulkan capability interface.
pub trait VulkanHost: Send {
    /// Device handles for the current device lifetime.
    fn instance(&self) -> VulkanInstance;

    fn configure_event(&self, event_id: i32, config: &EventConfig);

    /// Current recording state, or `None` when the host is not recording.
    fn recording_state(&self, queue_access: QueueAccess) -> Option<RecordingState>;
}
