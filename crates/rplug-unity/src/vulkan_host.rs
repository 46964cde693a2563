//! The engine's Vulkan interface behind the backend's `VulkanHost` seam.

use std::ptr::NonNull;

use tracing::{debug, warn};

use rplug_vk::host::{EventConfig, QueueAccess, RecordingState, VulkanHost, VulkanInstance};

use crate::interfaces::{
    queue_access_raw, DeviceEventCallback, IUnityGraphics, IUnityGraphicsVulkan, IUnityInterfaces,
    IUnityLog, UnityVulkanPluginEventConfig, UnityVulkanRecordingState, UNITY_GRAPHICS_GUID,
    UNITY_GRAPHICS_VULKAN_GUID, UNITY_LOG_GUID,
};

/// The interface registry passed to `UnityPluginLoad`, valid until unload.
#[derive(Debug, Clone, Copy)]
pub struct UnityInterfacesRef {
    ptr: NonNull<IUnityInterfaces>,
}

// SAFETY: the host keeps the registry alive for the plugin's lifetime and its
// lookups may be called from any thread.
unsafe impl Send for UnityInterfacesRef {}

impl UnityInterfacesRef {
    /// # Safety
    /// `ptr` must be null or point to a registry that outlives every use.
    pub unsafe fn new(ptr: *mut IUnityInterfaces) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    pub fn graphics(self) -> Option<UnityGraphicsRef> {
        // SAFETY: upheld by the constructor's contract.
        let raw = unsafe { self.ptr.as_ref().interface(UNITY_GRAPHICS_GUID) };
        NonNull::new(raw.cast::<IUnityGraphics>()).map(|ptr| UnityGraphicsRef { ptr })
    }

    pub fn vulkan(self) -> Option<NonNull<IUnityGraphicsVulkan>> {
        // SAFETY: upheld by the constructor's contract.
        let raw = unsafe { self.ptr.as_ref().interface(UNITY_GRAPHICS_VULKAN_GUID) };
        NonNull::new(raw.cast::<IUnityGraphicsVulkan>())
    }

    pub fn log(self) -> Option<NonNull<IUnityLog>> {
        // SAFETY: upheld by the constructor's contract.
        let raw = unsafe { self.ptr.as_ref().interface(UNITY_LOG_GUID) };
        NonNull::new(raw.cast::<IUnityLog>())
    }
}

/// The engine's graphics-device interface.
#[derive(Debug, Clone, Copy)]
pub struct UnityGraphicsRef {
    ptr: NonNull<IUnityGraphics>,
}

// SAFETY: owned by the host registry, see `UnityInterfacesRef`.
unsafe impl Send for UnityGraphicsRef {}

impl UnityGraphicsRef {
    fn table(&self) -> &IUnityGraphics {
        // SAFETY: the host keeps the table alive while the plugin is loaded.
        unsafe { self.ptr.as_ref() }
    }

    /// Raw renderer value, or -1 when the host does not report one.
    pub fn renderer(&self) -> i32 {
        match self.table().get_renderer {
            Some(get_renderer) => unsafe { get_renderer() },
            None => -1,
        }
    }

    pub fn register_device_event_callback(&self, callback: DeviceEventCallback) {
        if let Some(register) = self.table().register_device_event_callback {
            unsafe { register(Some(callback)) };
        } else {
            warn!("host graphics interface cannot register device-event callbacks");
        }
    }

    pub fn unregister_device_event_callback(&self, callback: DeviceEventCallback) {
        if let Some(unregister) = self.table().unregister_device_event_callback {
            unsafe { unregister(Some(callback)) };
        }
    }
}

/// `VulkanHost` over the engine's `IUnityGraphicsVulkan` table.
pub struct UnityVulkanHost {
    vulkan: NonNull<IUnityGraphicsVulkan>,
}

// SAFETY: the table is owned by the host and only called on its render thread.
unsafe impl Send for UnityVulkanHost {}

impl UnityVulkanHost {
    /// Connect to the Vulkan interface, if the host exposes one.
    pub fn connect(interfaces: UnityInterfacesRef) -> Option<Self> {
        let vulkan = interfaces.vulkan()?;
        debug!("connected to host Vulkan interface");
        Some(Self { vulkan })
    }

    fn table(&self) -> &IUnityGraphicsVulkan {
        // SAFETY: see the `Send` impl.
        unsafe { self.vulkan.as_ref() }
    }
}

impl VulkanHost for UnityVulkanHost {
    fn instance(&self) -> VulkanInstance {
        match self.table().instance {
            Some(instance) => unsafe { instance() }.into(),
            None => VulkanInstance::default(),
        }
    }

    fn configure_event(&self, event_id: i32, config: &EventConfig) {
        let raw = UnityVulkanPluginEventConfig::from(config);
        match self.table().configure_event {
            Some(configure) => unsafe { configure(event_id, &raw) },
            None => warn!("host cannot configure render event {}", event_id),
        }
    }

    fn recording_state(&self, queue_access: QueueAccess) -> Option<RecordingState> {
        let query = self.table().command_recording_state?;
        let mut raw = UnityVulkanRecordingState::default();
        let recording = unsafe { query(&mut raw, queue_access_raw(queue_access)) };
        recording.then(|| raw.into())
    }
}
