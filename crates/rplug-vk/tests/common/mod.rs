//! Software stand-ins for the host renderer and the Vulkan device.
//!
//! `MockDevice` hands out increasing fake handles, backs mapped memory with
//! heap allocations, records every call in order, and fails on request.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::io;
use std::sync::Arc;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;

use rplug_vk::shaders;
use rplug_vk::{
    DeviceApi, DeviceLoader, EventConfig, QueueAccess, RecordingState, VulkanHost, VulkanInstance,
};

/// Requirement sizes are rounded up to this, so allocations exceed requests.
pub const MOCK_ALIGNMENT: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    CreateBuffer,
    AllocateMemory,
    MapMemory,
    BindMemory,
    Flush,
    Layout,
    VertexShader,
    FragmentShader,
    Pipeline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer {
        buffer: u64,
        size: u64,
        sharing: vk::SharingMode,
        usage: vk::BufferUsageFlags,
    },
    DestroyBuffer(u64),
    AllocateMemory {
        memory: u64,
        size: u64,
        type_index: u32,
    },
    FreeMemory(u64),
    MapMemory(u64),
    UnmapMemory(u64),
    Flush { memory: u64, offset: u64, size: u64 },
    BindMemory { buffer: u64, memory: u64 },
    CreateLayout {
        layout: u64,
        push_stages: vk::ShaderStageFlags,
        push_size: u32,
    },
    DestroyLayout(u64),
    CreateShader { module: u64, vertex: bool },
    DestroyShader(u64),
    CreatePipeline(PipelineSummary),
    DestroyPipeline(u64),
    BindVertexBuffers {
        cmd: u64,
        buffers: Vec<u64>,
        offsets: Vec<u64>,
    },
    PushConstants {
        cmd: u64,
        layout: u64,
        stages: vk::ShaderStageFlags,
        data: Vec<u8>,
    },
    BindPipeline { cmd: u64, pipeline: u64 },
    Draw {
        cmd: u64,
        vertices: u32,
        instances: u32,
    },
}

/// Fixed-function state read back out of a pipeline create call.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub pipeline: u64,
    pub render_pass: u64,
    pub layout: u64,
    pub cache: u64,
    pub subpass: u32,
    pub stages: Vec<(vk::ShaderStageFlags, String)>,
    pub vertex_stride: u32,
    pub attribute_formats: Vec<(u32, vk::Format, u32)>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub samples: vk::SampleCountFlags,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub blend_enabled: bool,
    pub write_mask: vk::ColorComponentFlags,
    pub dynamic_states: Vec<vk::DynamicState>,
}

pub struct DeviceState {
    next_handle: u64,
    pub calls: Vec<Call>,
    pub failures: Vec<Fail>,
    pub memory_types: Vec<vk::MemoryPropertyFlags>,
    /// Mask reported by buffer memory requirements.
    pub type_bits: u32,
    buffer_sizes: HashMap<u64, u64>,
    memory: HashMap<u64, Box<[u8]>>,
}

impl DeviceState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn fails(&self, fail: Fail) -> bool {
        self.failures.contains(&fail)
    }
}

#[derive(Clone)]
pub struct MockDevice {
    pub state: Arc<Mutex<DeviceState>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::with_memory_types(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ])
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_types(types: &[vk::MemoryPropertyFlags]) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                next_handle: 0x1000,
                calls: Vec::new(),
                failures: Vec::new(),
                memory_types: types.to_vec(),
                type_bits: u32::MAX,
                buffer_sizes: HashMap::new(),
                memory: HashMap::new(),
            })),
        }
    }

    pub fn fail(&self, fail: Fail) {
        self.state.lock().failures.push(fail);
    }

    pub fn heal(&self) {
        self.state.lock().failures.clear();
    }

    pub fn set_type_bits(&self, bits: u32) {
        self.state.lock().type_bits = bits;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn draws(&self) -> usize {
        self.count(|c| matches!(c, Call::Draw { .. }))
    }

    pub fn pipelines_created(&self) -> Vec<PipelineSummary> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CreatePipeline(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contents of a live allocation.
    pub fn memory_contents(&self, memory: vk::DeviceMemory) -> Option<Vec<u8>> {
        self.state
            .lock()
            .memory
            .get(&memory.as_raw())
            .map(|bytes| bytes.to_vec())
    }

    pub fn live_allocations(&self) -> usize {
        self.state.lock().memory.len()
    }

    /// Objects created and never destroyed, by kind: (buffers, layouts, shaders, pipelines).
    pub fn leaks(&self) -> (i64, i64, i64, i64) {
        let mut leaks = (0, 0, 0, 0);
        for call in self.state.lock().calls.iter() {
            match call {
                Call::CreateBuffer { .. } => leaks.0 += 1,
                Call::DestroyBuffer(_) => leaks.0 -= 1,
                Call::CreateLayout { .. } => leaks.1 += 1,
                Call::DestroyLayout(_) => leaks.1 -= 1,
                Call::CreateShader { .. } => leaks.2 += 1,
                Call::DestroyShader(_) => leaks.2 -= 1,
                Call::CreatePipeline(_) => leaks.3 += 1,
                Call::DestroyPipeline(_) => leaks.3 -= 1,
                _ => {}
            }
        }
        leaks
    }
}

fn summarize(
    pipeline: u64,
    cache: vk::PipelineCache,
    info: &vk::GraphicsPipelineCreateInfo<'_>,
) -> PipelineSummary {
    // SAFETY: every pointer in the create info is valid for the call's duration.
    unsafe {
        let stages = std::slice::from_raw_parts(info.p_stages, info.stage_count as usize)
            .iter()
            .map(|s| {
                (
                    s.stage,
                    CStr::from_ptr(s.p_name).to_string_lossy().into_owned(),
                )
            })
            .collect();

        let vi = &*info.p_vertex_input_state;
        let bindings = std::slice::from_raw_parts(
            vi.p_vertex_binding_descriptions,
            vi.vertex_binding_description_count as usize,
        );
        let attributes = std::slice::from_raw_parts(
            vi.p_vertex_attribute_descriptions,
            vi.vertex_attribute_description_count as usize,
        );

        let ia = &*info.p_input_assembly_state;
        let rs = &*info.p_rasterization_state;
        let ms = &*info.p_multisample_state;
        let ds = &*info.p_depth_stencil_state;
        let cb = &*info.p_color_blend_state;
        let blend = std::slice::from_raw_parts(cb.p_attachments, cb.attachment_count as usize);
        let dy = &*info.p_dynamic_state;

        PipelineSummary {
            pipeline,
            render_pass: info.render_pass.as_raw(),
            layout: info.layout.as_raw(),
            cache: cache.as_raw(),
            subpass: info.subpass,
            stages,
            vertex_stride: bindings.first().map(|b| b.stride).unwrap_or(0),
            attribute_formats: attributes
                .iter()
                .map(|a| (a.location, a.format, a.offset))
                .collect(),
            topology: ia.topology,
            polygon_mode: rs.polygon_mode,
            cull_mode: rs.cull_mode,
            front_face: rs.front_face,
            samples: ms.rasterization_samples,
            depth_test: ds.depth_test_enable == vk::TRUE,
            depth_write: ds.depth_write_enable == vk::TRUE,
            depth_compare: ds.depth_compare_op,
            blend_enabled: blend.first().is_some_and(|b| b.blend_enable == vk::TRUE),
            write_mask: blend
                .first()
                .map(|b| b.color_write_mask)
                .unwrap_or_default(),
            dynamic_states: std::slice::from_raw_parts(
                dy.p_dynamic_states,
                dy.dynamic_state_count as usize,
            )
            .to_vec(),
        }
    }
}

impl DeviceApi for MockDevice {
    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let state = self.state.lock();
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: state.memory_types.len() as u32,
            ..Default::default()
        };
        for (i, flags) in state.memory_types.iter().enumerate() {
            props.memory_types[i].property_flags = *flags;
        }
        props
    }

    fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        let mut state = self.state.lock();
        if state.fails(Fail::CreateBuffer) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let buffer = state.handle();
        state.buffer_sizes.insert(buffer, info.size);
        state.calls.push(Call::CreateBuffer {
            buffer,
            size: info.size,
            sharing: info.sharing_mode,
            usage: info.usage,
        });
        Ok(vk::Buffer::from_raw(buffer))
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state.lock();
        state.buffer_sizes.remove(&buffer.as_raw());
        state.calls.push(Call::DestroyBuffer(buffer.as_raw()));
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let state = self.state.lock();
        let size = state
            .buffer_sizes
            .get(&buffer.as_raw())
            .copied()
            .unwrap_or(0);
        vk::MemoryRequirements {
            size: size.div_ceil(MOCK_ALIGNMENT) * MOCK_ALIGNMENT,
            alignment: MOCK_ALIGNMENT,
            memory_type_bits: state.type_bits,
        }
    }

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory> {
        let mut state = self.state.lock();
        if state.fails(Fail::AllocateMemory) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let memory = state.handle();
        let bytes = vec![0u8; info.allocation_size as usize].into_boxed_slice();
        state.memory.insert(memory, bytes);
        state.calls.push(Call::AllocateMemory {
            memory,
            size: info.allocation_size,
            type_index: info.memory_type_index,
        });
        Ok(vk::DeviceMemory::from_raw(memory))
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state.lock();
        state.memory.remove(&memory.as_raw());
        state.calls.push(Call::FreeMemory(memory.as_raw()));
    }

    fn map_memory(&self, memory: vk::DeviceMemory) -> VkResult<*mut c_void> {
        let mut state = self.state.lock();
        if state.fails(Fail::MapMemory) {
            return Err(vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        state.calls.push(Call::MapMemory(memory.as_raw()));
        state
            .memory
            .get_mut(&memory.as_raw())
            .map(|bytes| bytes.as_mut_ptr() as *mut c_void)
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.state
            .lock()
            .calls
            .push(Call::UnmapMemory(memory.as_raw()));
    }

    fn flush_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()> {
        let mut state = self.state.lock();
        if state.fails(Fail::Flush) {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        for range in ranges {
            state.calls.push(Call::Flush {
                memory: range.memory.as_raw(),
                offset: range.offset,
                size: range.size,
            });
        }
        Ok(())
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> VkResult<()> {
        let mut state = self.state.lock();
        if state.fails(Fail::BindMemory) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        state.calls.push(Call::BindMemory {
            buffer: buffer.as_raw(),
            memory: memory.as_raw(),
        });
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        let mut state = self.state.lock();
        if state.fails(Fail::Layout) {
            return Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        }
        // SAFETY: valid for the call's duration.
        let ranges = unsafe {
            std::slice::from_raw_parts(
                info.p_push_constant_ranges,
                info.push_constant_range_count as usize,
            )
        };
        let layout = state.handle();
        state.calls.push(Call::CreateLayout {
            layout,
            push_stages: ranges.first().map(|r| r.stage_flags).unwrap_or_default(),
            push_size: ranges.first().map(|r| r.size).unwrap_or(0),
        });
        Ok(vk::PipelineLayout::from_raw(layout))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state
            .lock()
            .calls
            .push(Call::DestroyLayout(layout.as_raw()));
    }

    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule> {
        let mut state = self.state.lock();
        let vertex = code == shaders::VERTEX_SPIRV;
        let fail = if vertex {
            Fail::VertexShader
        } else {
            Fail::FragmentShader
        };
        if state.fails(fail) {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        let module = state.handle();
        state.calls.push(Call::CreateShader { module, vertex });
        Ok(vk::ShaderModule::from_raw(module))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.state
            .lock()
            .calls
            .push(Call::DestroyShader(module.as_raw()));
    }

    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let mut state = self.state.lock();
        if state.fails(Fail::Pipeline) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let pipeline = state.handle();
        state
            .calls
            .push(Call::CreatePipeline(summarize(pipeline, cache, info)));
        Ok(vk::Pipeline::from_raw(pipeline))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state
            .lock()
            .calls
            .push(Call::DestroyPipeline(pipeline.as_raw()));
    }

    fn cmd_bind_vertex_buffers(
        &self,
        cmd: vk::CommandBuffer,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        self.state.lock().calls.push(Call::BindVertexBuffers {
            cmd: cmd.as_raw(),
            buffers: buffers.iter().map(|b| b.as_raw()).collect(),
            offsets: offsets.to_vec(),
        });
    }

    fn cmd_push_constants(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        data: &[u8],
    ) {
        self.state.lock().calls.push(Call::PushConstants {
            cmd: cmd.as_raw(),
            layout: layout.as_raw(),
            stages,
            data: data.to_vec(),
        });
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.state.lock().calls.push(Call::BindPipeline {
            cmd: cmd.as_raw(),
            pipeline: pipeline.as_raw(),
        });
    }

    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        self.state.lock().calls.push(Call::Draw {
            cmd: cmd.as_raw(),
            vertices: vertex_count,
            instances: instance_count,
        });
    }
}

/// Loader that hands out clones of one shared mock device.
#[derive(Clone)]
pub struct MockLoader {
    pub device: MockDevice,
    pub refuse: Arc<Mutex<bool>>,
    pub loads: Arc<Mutex<usize>>,
}

impl MockLoader {
    pub fn new(device: MockDevice) -> Self {
        Self {
            device,
            refuse: Arc::new(Mutex::new(false)),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn loads(&self) -> usize {
        *self.loads.lock()
    }
}

impl DeviceLoader for MockLoader {
    type Device = MockDevice;

    fn load(&self, instance: &VulkanInstance) -> Option<MockDevice> {
        if *self.refuse.lock() || instance.device == vk::Device::null() {
            return None;
        }
        *self.loads.lock() += 1;
        Some(self.device.clone())
    }
}

pub struct HostState {
    pub instance: VulkanInstance,
    pub recording: Option<RecordingState>,
    pub configured: Vec<(i32, EventConfig)>,
}

#[derive(Clone)]
pub struct MockHost {
    pub state: Arc<Mutex<HostState>>,
}

pub const COMMAND_BUFFER: u64 = 0xC0;
pub const RENDER_PASS_A: u64 = 0xA1;
pub const RENDER_PASS_B: u64 = 0xB2;
pub const HOST_PIPELINE_CACHE: u64 = 0xCAC4E;
pub const QUEUE_FAMILY: u32 = 2;

pub fn test_instance() -> VulkanInstance {
    VulkanInstance {
        pipeline_cache: vk::PipelineCache::from_raw(HOST_PIPELINE_CACHE),
        instance: vk::Instance::from_raw(0x11),
        physical_device: vk::PhysicalDevice::from_raw(0x22),
        device: vk::Device::from_raw(0x33),
        graphics_queue: vk::Queue::from_raw(0x44),
        get_instance_proc_addr: None,
        queue_family_index: QUEUE_FAMILY,
    }
}

/// Recording inside `render_pass` during `frame`, with everything before it complete.
pub fn recording(render_pass: u64, frame: u64) -> RecordingState {
    RecordingState {
        command_buffer: vk::CommandBuffer::from_raw(COMMAND_BUFFER),
        command_buffer_level: vk::CommandBufferLevel::PRIMARY,
        render_pass: vk::RenderPass::from_raw(render_pass),
        framebuffer: vk::Framebuffer::from_raw(0xF0),
        subpass_index: 0,
        current_frame: frame,
        safe_frame: frame.saturating_sub(1),
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                instance: test_instance(),
                recording: Some(recording(RENDER_PASS_A, 1)),
                configured: Vec::new(),
            })),
        }
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_recording(&self, recording: Option<RecordingState>) {
        self.state.lock().recording = recording;
    }

    pub fn configured(&self) -> Vec<(i32, EventConfig)> {
        self.state.lock().configured.clone()
    }
}

impl VulkanHost for MockHost {
    fn instance(&self) -> VulkanInstance {
        self.state.lock().instance
    }

    fn configure_event(&self, event_id: i32, config: &EventConfig) {
        self.state.lock().configured.push((event_id, *config));
    }

    fn recording_state(&self, _queue_access: QueueAccess) -> Option<RecordingState> {
        self.state.lock().recording
    }
}

/// Formatted tracing output of code run under [`LogCapture::run`].
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
