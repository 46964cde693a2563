//! Owner of the active backend across device lifecycle events.

use tracing::{error, info, trace, warn};

use crate::backend::RenderBackend;
use crate::error::{PluginError, SkipReason};
use crate::events::{DeviceEvent, GraphicsApi, DRAW_EVENT_ID};
use crate::registry::BackendRegistry;

/// Plugin state handed to every host callback.
///
/// A backend exists only between an Initialize and the following Shutdown;
/// outside that window every render event is a silent skip.
pub struct PluginContext {
    registry: BackendRegistry,
    backend: Option<Box<dyn RenderBackend>>,
    api: GraphicsApi,
    draw_event_id: i32,
}

impl PluginContext {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            backend: None,
            api: GraphicsApi::Null,
            draw_event_id: DRAW_EVENT_ID,
        }
    }

    pub fn with_draw_event_id(mut self, draw_event_id: i32) -> Self {
        self.draw_event_id = draw_event_id;
        self
    }

    /// Graphics API reported at the last Initialize, `Null` when shut down.
    pub fn api(&self) -> GraphicsApi {
        self.api
    }

    pub fn backend(&self) -> Option<&dyn RenderBackend> {
        self.backend.as_deref()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Handle a device event. `query_api` is consulted once per Initialize.
    pub fn on_device_event(&mut self, event: DeviceEvent, query_api: impl FnOnce() -> GraphicsApi) {
        if event == DeviceEvent::Initialize {
            if let Some(mut stale) = self.backend.take() {
                error!(
                    "device initialized twice without shutdown; dropping stale {} backend",
                    self.api
                );
                stale.process_device_event(DeviceEvent::Shutdown);
            }

            self.api = query_api();
            match self.registry.select(self.api) {
                Ok(backend) => {
                    info!("graphics device initialized on {}", self.api);
                    self.backend = Some(backend);
                }
                Err(e) => warn!("{}; plugin stays inert", e),
            }
        }

        if let Some(backend) = self.backend.as_mut() {
            backend.process_device_event(event);
        } else {
            trace!("device event {:?} with no backend", event);
        }

        if event == DeviceEvent::Shutdown {
            if self.backend.take().is_some() {
                info!("graphics device on {} shut down", self.api);
            }
            self.api = GraphicsApi::Null;
        }
    }

    /// Handle a per-frame render event issued from the host's command stream.
    pub fn on_render_event(&mut self, event_id: i32, time: f32) -> Result<(), PluginError> {
        let backend = self
            .backend
            .as_mut()
            .ok_or(PluginError::PreconditionSkip(SkipReason::NoBackend))?;

        if event_id != self.draw_event_id {
            return Err(PluginError::PreconditionSkip(
                SkipReason::UnhandledEvent(event_id),
            ));
        }

        backend.draw(time)
    }

    /// Shut down any live backend, as if the host had sent Shutdown.
    pub fn shutdown(&mut self) {
        if self.backend.is_some() {
            self.on_device_event(DeviceEvent::Shutdown, || GraphicsApi::Null);
        }
    }
}

impl Drop for PluginContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
