//! Unity native rendering plugin.
//!
//! Built as a cdylib the engine loads at startup. The engine calls
//! `UnityPluginLoad` with its interface registry, delivers graphics-device
//! events through a registered callback, issues render events through the
//! function returned by `GetRenderEventFunc`, and feeds animation time from
//! scripts through `SetTimeFromUnity`.

use std::ffi::c_int;

use parking_lot::{const_mutex, Mutex};
use tracing::{debug, error, info, trace};

use rplug_common::logging::{attach_host_log, detach_host_log};
use rplug_core::config::default_config_path;
use rplug_core::{
    AnimationClock, BackendRegistry, DeviceEvent, GraphicsApi, PluginConfig, PluginContext,
};
use rplug_vk::{register_vulkan, AshLoader};

pub mod host_log;
pub mod interfaces;
pub mod vulkan_host;

use host_log::UnityLog;
use interfaces::{IUnityInterfaces, RenderEventCallback};
use vulkan_host::{UnityGraphicsRef, UnityInterfacesRef, UnityVulkanHost};

// ── Plugin state ───────────────────────────────────────────

struct LoadedPlugin {
    graphics: UnityGraphicsRef,
    context: PluginContext,
}

static PLUGIN: Mutex<Option<LoadedPlugin>> = const_mutex(None);

static CLOCK: AnimationClock = AnimationClock::new();

/// Graphics API of the live device, `Null` when none or not loaded.
pub fn current_api() -> GraphicsApi {
    PLUGIN
        .lock()
        .as_ref()
        .map_or(GraphicsApi::Null, |plugin| plugin.context.api())
}

/// Whether a backend is currently handling render events.
pub fn has_backend() -> bool {
    PLUGIN
        .lock()
        .as_ref()
        .is_some_and(|plugin| plugin.context.has_backend())
}

/// Animation time last set by the host.
pub fn animation_time() -> f32 {
    CLOCK.get()
}

fn load_config(unity: Option<UnityInterfacesRef>) -> PluginConfig {
    let path = default_config_path();
    let loaded = PluginConfig::load_if_present(&path);
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => PluginConfig::default(),
    };

    // Logging is configured by the file, so report on the file afterwards.
    rplug_common::logging::init_logging(&config.logging.filter);
    if let Some(console) = unity.and_then(UnityInterfacesRef::log) {
        // SAFETY: the engine keeps its log interface alive until unload,
        // which detaches the sink.
        attach_host_log(unsafe { UnityLog::new(console) });
    }
    match loaded {
        Some(Ok(_)) => info!("loaded config from {}", path),
        Some(Err(e)) => error!("ignoring config {}: {}", path, e),
        None => debug!("no config at {}, using defaults", path),
    }
    config
}

// ── Host callbacks ─────────────────────────────────────────

unsafe extern "system" fn on_graphics_device_event(event_type: c_int) {
    let event = DeviceEvent::from_raw(event_type);
    let mut guard = PLUGIN.lock();
    let Some(plugin) = guard.as_mut() else {
        trace!("device event {:?} while unloaded", event);
        return;
    };

    let graphics = plugin.graphics;
    plugin
        .context
        .on_device_event(event, || GraphicsApi::from_raw(graphics.renderer()));
}

unsafe extern "system" fn on_render_event(event_id: c_int) {
    let time = CLOCK.get();
    let mut guard = PLUGIN.lock();
    let Some(plugin) = guard.as_mut() else {
        return;
    };

    match plugin.context.on_render_event(event_id, time) {
        Ok(()) => {}
        Err(e) if e.is_skip() => trace!("render event {} skipped: {}", event_id, e),
        Err(e) => debug!("render event {} dropped: {}", event_id, e),
    }
}

// ── Exports ────────────────────────────────────────────────

/// Called by the engine once the plugin library is loaded.
///
/// # Safety
/// `interfaces` must be the engine's interface registry, or null.
#[no_mangle]
pub unsafe extern "system" fn UnityPluginLoad(interfaces: *mut IUnityInterfaces) {
    let unity = unsafe { UnityInterfacesRef::new(interfaces) };
    let config = load_config(unity);

    let Some(unity) = unity else {
        error!("UnityPluginLoad called without an interface registry");
        return;
    };
    let Some(graphics) = unity.graphics() else {
        error!("host exposes no graphics interface; plugin disabled");
        return;
    };

    let mut registry = BackendRegistry::new();
    register_vulkan(
        &mut registry,
        move || UnityVulkanHost::connect(unity),
        AshLoader,
        config.render.clone(),
    );
    let context = PluginContext::new(registry).with_draw_event_id(config.render.draw_event_id);

    let previous = PLUGIN.lock().replace(LoadedPlugin { graphics, context });
    if previous.is_some() {
        error!("plugin loaded twice; previous state discarded");
    }
    drop(previous);
    info!("plugin loaded (draw event {})", config.render.draw_event_id);

    graphics.register_device_event_callback(on_graphics_device_event);
    // The engine may already have a device; it will not replay Initialize.
    unsafe { on_graphics_device_event(DeviceEvent::Initialize.as_raw()) };
}

/// Called by the engine before the plugin library is unloaded.
#[no_mangle]
pub extern "system" fn UnityPluginUnload() {
    let plugin = PLUGIN.lock().take();
    if let Some(plugin) = plugin {
        plugin
            .graphics
            .unregister_device_event_callback(on_graphics_device_event);
        drop(plugin);
        info!("plugin unloaded");
    }
    detach_host_log();
}

/// The callback scripts pass to `CommandBuffer.IssuePluginEvent`.
#[no_mangle]
pub extern "system" fn GetRenderEventFunc() -> RenderEventCallback {
    on_render_event
}

/// Set the animation time used by subsequent draws.
#[no_mangle]
pub extern "system" fn SetTimeFromUnity(time: f32) {
    debug!("time set to {}", time);
    CLOCK.set(time);
}
