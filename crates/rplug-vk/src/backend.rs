use ash::vk;
use tracing::{debug, error, info, trace, warn};

use rplug_core::transform::spin_transform;
use rplug_core::{
    DeviceEvent, GraphicsApi, LifecycleState, PluginError, RenderBackend, RenderSettings,
    SkipReason,
};

use crate::buffer::{allocate_buffer, destroy_buffer, upload, GpuBuffer};
use crate::device::DeviceLoader;
use crate::draw::record_triangle;
use crate::host::{EventConfig, QueueAccess, VulkanHost, VulkanInstance};
use crate::pipeline::PipelineCache;
use crate::vertex::triangle_bytes;

fn skip(reason: SkipReason) -> PluginError {
    PluginError::PreconditionSkip(reason)
}

/// The Vulkan implementation of the plugin's device and draw protocol.
///
/// Holds the host's device handles, the resolved function tables, the
/// triangle's vertex buffer and the pipeline cache. All of it is created on
/// Initialize and released on Shutdown.
pub struct VulkanBackend<H: VulkanHost, L: DeviceLoader> {
    host: H,
    loader: L,
    settings: RenderSettings,
    state: LifecycleState,
    instance: Option<VulkanInstance>,
    device: Option<L::Device>,
    vertex_buffer: GpuBuffer,
    pipelines: PipelineCache,
}

impl<H: VulkanHost, L: DeviceLoader> VulkanBackend<H, L> {
    pub fn new(host: H, loader: L, settings: RenderSettings) -> Self {
        Self {
            host,
            loader,
            settings,
            state: LifecycleState::Uninitialized,
            instance: None,
            device: None,
            vertex_buffer: GpuBuffer::default(),
            pipelines: PipelineCache::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn device(&self) -> Option<&L::Device> {
        self.device.as_ref()
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    fn initialize(&mut self) {
        let instance = self.host.instance();

        if self.device.is_none() {
            match self.loader.load(&instance) {
                Some(device) => self.device = Some(device),
                None => {
                    error!("could not load Vulkan device functions; backend inactive");
                    return;
                }
            }
        }
        self.instance = Some(instance);

        let event_id = self.settings.draw_event_id;
        let config = EventConfig::inside_render_pass();
        self.host.configure_event(event_id, &config);
        self.state = LifecycleState::Active;
        info!(
            "Vulkan backend active (queue family {})",
            instance.queue_family_index
        );

        if let Err(e) = self.create_vertex_buffer() {
            warn!("vertex buffer unavailable, will retry at draw time: {}", e);
        }
    }

    /// Allocate and fill the triangle's vertex buffer if it does not exist yet.
    fn create_vertex_buffer(&mut self) -> Result<(), PluginError> {
        if !self.vertex_buffer.is_empty() {
            return Ok(());
        }
        let (Some(device), Some(instance)) = (self.device.as_ref(), self.instance.as_ref()) else {
            return Err(skip(SkipReason::DeviceNotInitialized));
        };

        let data = triangle_bytes();
        let mut buffer = allocate_buffer(
            device,
            instance.queue_family_index,
            data.len() as vk::DeviceSize,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        if let Err(e) = upload(device, &buffer, data) {
            destroy_buffer(device, &mut buffer);
            return Err(e);
        }

        debug!("triangle uploaded ({} bytes)", data.len());
        self.vertex_buffer = buffer;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.state == LifecycleState::Uninitialized && self.device.is_none() {
            return;
        }
        self.state = LifecycleState::ShuttingDown;

        if let Some(device) = self.device.as_ref() {
            destroy_buffer(device, &mut self.vertex_buffer);
            self.pipelines.destroy(device);
        }
        self.device = None;
        self.instance = None;
        self.state = LifecycleState::Uninitialized;
        info!("Vulkan backend shut down");
    }
}

impl<H: VulkanHost, L: DeviceLoader> RenderBackend for VulkanBackend<H, L> {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn process_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Initialize => self.initialize(),
            DeviceEvent::Shutdown => self.shutdown(),
            other => trace!("ignoring device event {:?}", other),
        }
    }

    fn uses_reverse_z(&self) -> bool {
        true
    }

    fn draw(&mut self, time: f32) -> Result<(), PluginError> {
        if self.state != LifecycleState::Active {
            return Err(skip(SkipReason::DeviceNotInitialized));
        }

        let recording = self
            .host
            .recording_state(QueueAccess::DontCare)
            .filter(|r| r.command_buffer != vk::CommandBuffer::null())
            .ok_or(skip(SkipReason::NotRecording))?;

        if self.vertex_buffer.is_empty() {
            if let Err(e) = self.create_vertex_buffer() {
                debug!("no vertex buffer this frame: {}", e);
                return Err(skip(SkipReason::NoVertexBuffer));
            }
        }

        let transform = spin_transform(time, self.settings.triangle_depth, self.uses_reverse_z());
        let (Some(device), Some(instance)) = (self.device.as_ref(), self.instance.as_ref()) else {
            return Err(skip(SkipReason::DeviceNotInitialized));
        };

        let pipeline = self
            .pipelines
            .ensure(device, &recording, instance.pipeline_cache)?;
        record_triangle(
            device,
            recording.command_buffer,
            self.vertex_buffer.buffer,
            pipeline,
            &transform,
        );
        Ok(())
    }
}

impl<H: VulkanHost, L: DeviceLoader> Drop for VulkanBackend<H, L> {
    fn drop(&mut self) {
        if self.state != LifecycleState::Uninitialized {
            self.shutdown();
        }
    }
}
