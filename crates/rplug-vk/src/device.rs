//! Native Vulkan entry points used by the plugin, and how they are loaded.
//!
//! The plugin does not link the Vulkan loader. Function pointers are resolved
//! through the host's `vkGetInstanceProcAddr` once per device lifetime. A
//! missing entry point is not detected here; ash leaves a stub that panics
//! on first use, which is the accepted failure mode for a plugin living in
//! the host's address space.

use std::ffi::c_void;

use ash::prelude::VkResult;
use ash::vk;
use tracing::{debug, error};

use crate::host::VulkanInstance;

/// The device-level calls the buffer manager, pipeline cache and draw
/// dispatcher issue. Handles passed in must come from the same device.
pub trait DeviceApi: Send {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer>;
    fn destroy_buffer(&self, buffer: vk::Buffer);
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);
    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void>;
    fn unmap_memory(&self, memory: vk::DeviceMemory);
    fn flush_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()>;
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()>;

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);
    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    fn cmd_bind_vertex_buffers(
        &self,
        cmd: vk::CommandBuffer,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    );
    fn cmd_push_constants(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    );
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32);
}

/// Resolves a [`DeviceApi`] for the host's device.
pub trait DeviceLoader: Send {
    type Device: DeviceApi;

    fn load(&self, instance: &VulkanInstance) -> Option<Self::Device>;
}

/// Function tables loaded through ash.
pub struct AshDevice {
    instance: ash::Instance,
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    // Keeps the system loader library open while its tables are in use.
    entry: Option<ash::Entry>,
}

impl AshDevice {
    /// Whether the tables came from a loader this device keeps open, rather
    /// than from the host.
    pub fn owns_entry(&self) -> bool {
        self.entry.is_some()
    }
}

impl DeviceApi for AshDevice {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.instance
                .get_physical_device_memory_properties(self.physical_device)
        }
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        unsafe { self.device.create_buffer(info, None) }
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) }
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory> {
        unsafe { self.device.allocate_memory(info, None) }
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void> {
        unsafe {
            self.device
                .map_memory(memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
        }
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }

    fn flush_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()> {
        unsafe { self.device.flush_mapped_memory_ranges(ranges) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        unsafe { self.device.bind_buffer_memory(buffer, memory, 0) }
    }

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        unsafe { self.device.create_shader_module(&info, None) }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) }
    }

    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let created = unsafe {
            self.device
                .create_graphics_pipelines(cache, std::slice::from_ref(info), None)
        };
        match created {
            Ok(pipelines) => Ok(pipelines[0]),
            Err((pipelines, e)) => {
                for p in pipelines {
                    if p != vk::Pipeline::null() {
                        unsafe { self.device.destroy_pipeline(p, None) };
                    }
                }
                Err(e)
            }
        }
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) }
    }

    fn cmd_bind_vertex_buffers(
        &self,
        cmd: vk::CommandBuffer,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(cmd, 0, buffers, offsets)
        }
    }

    fn cmd_push_constants(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) {
        unsafe { self.device.cmd_push_constants(cmd, layout, stages, 0, data) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        unsafe {
            self.device
                .cmd_draw(cmd, vertex_count, instance_count, 0, 0)
        }
    }
}

/// Loads [`AshDevice`] through the host-provided `vkGetInstanceProcAddr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AshLoader;

impl AshLoader {
    /// Load the device tables, asking `fallback` for a loader entry when the
    /// host gives no `vkGetInstanceProcAddr`. A fallback entry lives as long
    /// as the returned device.
    pub fn load_with_fallback(
        &self,
        host: &VulkanInstance,
        fallback: impl FnOnce() -> Option<ash::Entry>,
    ) -> Option<AshDevice> {
        if host.device == vk::Device::null() || host.instance == vk::Instance::null() {
            error!("host reported a null Vulkan device");
            return None;
        }

        let (instance, entry) = match host.get_instance_proc_addr {
            Some(get_instance_proc_addr) => {
                let instance = unsafe {
                    ash::Instance::load_with(
                        |name| match get_instance_proc_addr(host.instance, name.as_ptr()) {
                            Some(f) => f as *const c_void,
                            None => std::ptr::null(),
                        },
                        host.instance,
                    )
                };
                (instance, None)
            }
            None => {
                debug!("host gave no vkGetInstanceProcAddr, using the system loader");
                let entry = fallback()?;
                let instance = unsafe { ash::Instance::load(entry.static_fn(), host.instance) };
                (instance, Some(entry))
            }
        };
        let device = unsafe { ash::Device::load(instance.fp_v1_0(), host.device) };
        debug!("loaded Vulkan device functions");

        Some(AshDevice {
            instance,
            device,
            physical_device: host.physical_device,
            entry,
        })
    }
}

impl DeviceLoader for AshLoader {
    type Device = AshDevice;

    fn load(&self, host: &VulkanInstance) -> Option<AshDevice> {
        self.load_with_fallback(host, system_entry)
    }
}

fn system_entry() -> Option<ash::Entry> {
    match unsafe { ash::Entry::load() } {
        Ok(entry) => Some(entry),
        Err(e) => {
            error!("failed to load Vulkan loader: {}", e);
            None
        }
    }
}
