use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::events::DRAW_EVENT_ID;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RPLUG_CONFIG";

/// Top-level plugin configuration, loaded from rplug.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Render-event id that triggers the draw
    #[serde(default = "default_draw_event_id")]
    pub draw_event_id: i32,
    /// Depth of the triangle before depth-convention adjustment, in [0, 1]
    #[serde(default = "default_triangle_depth")]
    pub triangle_depth: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RPLUG_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            draw_event_id: default_draw_event_id(),
            triangle_depth: default_triangle_depth(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl PluginConfig {
    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, PluginError> {
        let config: PluginConfig =
            toml::from_str(content).map_err(|e| PluginError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, PluginError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PluginError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Load configuration from a file that may not exist. `None` means
    /// there is no file and defaults apply.
    pub fn load_if_present(path: &str) -> Option<Result<Self, PluginError>> {
        Path::new(path).exists().then(|| Self::load(path))
    }

    pub fn validate(&self) -> Result<(), PluginError> {
        let depth = self.render.triangle_depth;
        if !(0.0..=1.0).contains(&depth) {
            return Err(PluginError::Config(format!(
                "render.triangle_depth must be within [0, 1], got {depth}"
            )));
        }
        Ok(())
    }
}

/// Returns the config file path: `$RPLUG_CONFIG` if set, else `./rplug.toml`.
pub fn default_config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| "rplug.toml".to_string())
}

fn default_draw_event_id() -> i32 {
    DRAW_EVENT_ID
}

fn default_triangle_depth() -> f32 {
    0.7
}

fn default_filter() -> String {
    "warn".to_string()
}
