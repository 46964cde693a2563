//! `repr(C)` mirrors of the Unity native plugin interfaces this plugin uses.
//!
//! Layouts follow `IUnityInterface.h`, `IUnityGraphics.h`, `IUnityLog.h`
//! and `IUnityGraphicsVulkan.h`. Function tables are declared in header order;
//! entries the plugin never calls are kept as opaque pointers.

use std::ffi::{c_char, c_int, c_uint, c_void};

use ash::vk;

use rplug_vk::host::{EventConfig, QueueAccess, RecordingState, RenderPassPrecondition};
use rplug_vk::VulkanInstance;

/// 128-bit interface identifier, split in two halves.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnityInterfaceGuid {
    pub high: u64,
    pub low: u64,
}

impl UnityInterfaceGuid {
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }
}

pub const UNITY_GRAPHICS_GUID: UnityInterfaceGuid =
    UnityInterfaceGuid::new(0x7CBA0A9CA4DDB544, 0x8C5AD4926EB17B11);

pub const UNITY_GRAPHICS_VULKAN_GUID: UnityInterfaceGuid =
    UnityInterfaceGuid::new(0x95355348d4ef4e11, 0x9789313dfcffcc87);

pub const UNITY_LOG_GUID: UnityInterfaceGuid =
    UnityInterfaceGuid::new(0x9E7507FA5B444D5D, 0x92FB979515EA83FC);

pub type DeviceEventCallback = unsafe extern "system" fn(event_type: c_int);
pub type RenderEventCallback = unsafe extern "system" fn(event_id: c_int);

/// Registry the host hands to `UnityPluginLoad`.
#[repr(C)]
pub struct IUnityInterfaces {
    pub get_interface: Option<unsafe extern "system" fn(guid: UnityInterfaceGuid) -> *mut c_void>,
    pub register_interface:
        Option<unsafe extern "system" fn(guid: UnityInterfaceGuid, ptr: *mut c_void)>,
    pub get_interface_split: Option<unsafe extern "system" fn(high: u64, low: u64) -> *mut c_void>,
    pub register_interface_split:
        Option<unsafe extern "system" fn(high: u64, low: u64, ptr: *mut c_void)>,
}

impl IUnityInterfaces {
    /// Look up an interface, preferring the split entry point.
    ///
    /// # Safety
    /// The table's function pointers must be callable.
    pub unsafe fn interface(&self, guid: UnityInterfaceGuid) -> *mut c_void {
        if let Some(get) = self.get_interface_split {
            return unsafe { get(guid.high, guid.low) };
        }
        match self.get_interface {
            Some(get) => unsafe { get(guid) },
            None => std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
pub struct IUnityGraphics {
    pub get_renderer: Option<unsafe extern "system" fn() -> c_int>,
    pub register_device_event_callback:
        Option<unsafe extern "system" fn(Option<DeviceEventCallback>)>,
    pub unregister_device_event_callback:
        Option<unsafe extern "system" fn(Option<DeviceEventCallback>)>,
    pub reserve_event_id_range: Option<unsafe extern "system" fn(count: c_int) -> c_int>,
}

/// `UnityLogType` values accepted by [`IUnityLog`].
pub const LOG_TYPE_ERROR: c_int = 0;
pub const LOG_TYPE_WARNING: c_int = 2;
pub const LOG_TYPE_LOG: c_int = 3;

pub type LogCallback = unsafe extern "system" fn(
    log_type: c_int,
    message: *const c_char,
    file_name: *const c_char,
    file_line: c_int,
);

/// The engine console.
#[repr(C)]
pub struct IUnityLog {
    pub log: Option<LogCallback>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UnityVulkanInstance {
    pub pipeline_cache: vk::PipelineCache,
    pub instance: vk::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: vk::Device,
    pub graphics_queue: vk::Queue,
    pub get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub queue_family_index: c_uint,
    pub reserved: [*mut c_void; 8],
}

impl Default for UnityVulkanInstance {
    fn default() -> Self {
        Self {
            pipeline_cache: vk::PipelineCache::null(),
            instance: vk::Instance::null(),
            physical_device: vk::PhysicalDevice::null(),
            device: vk::Device::null(),
            graphics_queue: vk::Queue::null(),
            get_instance_proc_addr: None,
            queue_family_index: 0,
            reserved: [std::ptr::null_mut(); 8],
        }
    }
}

impl From<UnityVulkanInstance> for VulkanInstance {
    fn from(raw: UnityVulkanInstance) -> Self {
        Self {
            pipeline_cache: raw.pipeline_cache,
            instance: raw.instance,
            physical_device: raw.physical_device,
            device: raw.device,
            graphics_queue: raw.graphics_queue,
            get_instance_proc_addr: raw.get_instance_proc_addr,
            queue_family_index: raw.queue_family_index,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UnityVulkanRecordingState {
    pub command_buffer: vk::CommandBuffer,
    pub command_buffer_level: vk::CommandBufferLevel,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub sub_pass_index: c_int,
    pub current_frame_number: u64,
    pub safe_frame_number: u64,
    pub reserved: [*mut c_void; 4],
}

impl Default for UnityVulkanRecordingState {
    fn default() -> Self {
        Self {
            command_buffer: vk::CommandBuffer::null(),
            command_buffer_level: vk::CommandBufferLevel::PRIMARY,
            render_pass: vk::RenderPass::null(),
            framebuffer: vk::Framebuffer::null(),
            sub_pass_index: 0,
            current_frame_number: 0,
            safe_frame_number: 0,
            reserved: [std::ptr::null_mut(); 4],
        }
    }
}

impl From<UnityVulkanRecordingState> for RecordingState {
    fn from(raw: UnityVulkanRecordingState) -> Self {
        Self {
            command_buffer: raw.command_buffer,
            command_buffer_level: raw.command_buffer_level,
            render_pass: raw.render_pass,
            framebuffer: raw.framebuffer,
            // Negative outside a render pass.
            subpass_index: raw.sub_pass_index.max(0) as u32,
            current_frame: raw.current_frame_number,
            safe_frame: raw.safe_frame_number,
        }
    }
}

pub const RENDER_PASS_DONT_CARE: c_int = 0;
pub const RENDER_PASS_ENSURE_INSIDE: c_int = 1;
pub const RENDER_PASS_ENSURE_OUTSIDE: c_int = 2;

pub const QUEUE_ACCESS_DONT_CARE: c_int = 0;
pub const QUEUE_ACCESS_ALLOW: c_int = 1;

pub fn render_pass_precondition_raw(precondition: RenderPassPrecondition) -> c_int {
    match precondition {
        RenderPassPrecondition::DontCare => RENDER_PASS_DONT_CARE,
        RenderPassPrecondition::EnsureInside => RENDER_PASS_ENSURE_INSIDE,
        RenderPassPrecondition::EnsureOutside => RENDER_PASS_ENSURE_OUTSIDE,
    }
}

pub fn queue_access_raw(access: QueueAccess) -> c_int {
    match access {
        QueueAccess::DontCare => QUEUE_ACCESS_DONT_CARE,
        QueueAccess::Allow => QUEUE_ACCESS_ALLOW,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnityVulkanPluginEventConfig {
    pub render_pass_precondition: c_int,
    pub graphics_queue_access: c_int,
    pub flags: u32,
}

impl From<&EventConfig> for UnityVulkanPluginEventConfig {
    fn from(config: &EventConfig) -> Self {
        Self {
            render_pass_precondition: render_pass_precondition_raw(config.render_pass),
            graphics_queue_access: queue_access_raw(config.queue_access),
            flags: config.flags.bits(),
        }
    }
}

type Opaque = *const c_void;

#[repr(C)]
pub struct IUnityGraphicsVulkan {
    pub intercept_initialization: Opaque,
    pub intercept_vulkan_api: Opaque,
    pub configure_event: Option<
        unsafe extern "system" fn(event_id: c_int, config: *const UnityVulkanPluginEventConfig),
    >,
    pub instance: Option<unsafe extern "system" fn() -> UnityVulkanInstance>,
    pub command_recording_state: Option<
        unsafe extern "system" fn(
            out_state: *mut UnityVulkanRecordingState,
            queue_access: c_int,
        ) -> bool,
    >,
    pub access_texture: Opaque,
    pub access_render_buffer_texture: Opaque,
    pub access_render_buffer_resolve_texture: Opaque,
    pub access_buffer: Opaque,
    pub ensure_outside_render_pass: Opaque,
    pub ensure_inside_render_pass: Opaque,
    pub access_queue: Opaque,
    pub configure_swapchain: Opaque,
    pub access_texture_by_id: Opaque,
}
