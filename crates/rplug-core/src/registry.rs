use tracing::debug;

use crate::backend::RenderBackend;
use crate::error::PluginError;
use crate::events::GraphicsApi;

/// Builds a fresh backend, or `None` when the host cannot provide what it needs.
pub type BackendFactory = Box<dyn Fn() -> Option<Box<dyn RenderBackend>> + Send>;

/// Backend selector: the graphics APIs this plugin implements and how to build each.
#[derive(Default)]
pub struct BackendRegistry {
    factories: Vec<(GraphicsApi, BackendFactory)>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `api`, replacing any earlier registration.
    pub fn register(&mut self, api: GraphicsApi, factory: BackendFactory) {
        self.factories.retain(|(known, _)| *known != api);
        self.factories.push((api, factory));
    }

    pub fn supports(&self, api: GraphicsApi) -> bool {
        self.factories.iter().any(|(known, _)| *known == api)
    }

    pub fn apis(&self) -> impl Iterator<Item = GraphicsApi> + '_ {
        self.factories.iter().map(|(api, _)| *api)
    }

    /// Build the backend for `api`.
    pub fn select(&self, api: GraphicsApi) -> Result<Box<dyn RenderBackend>, PluginError> {
        let factory = self
            .factories
            .iter()
            .find(|(known, _)| *known == api)
            .map(|(_, factory)| factory)
            .ok_or(PluginError::UnsupportedBackend(api))?;

        match factory() {
            Some(backend) => {
                debug!("selected {} backend", api);
                Ok(backend)
            }
            None => Err(PluginError::UnsupportedBackend(api)),
        }
    }
}
