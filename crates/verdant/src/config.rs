//! Headless run configuration.
//!
//! One TOML file carries both the renderer tables (`[lod]`, `[detail]`,
//! `[proxy]`, `[simulation]`) and the demo population (`[demo]`). Missing
//! tables fall back to defaults.

use std::path::Path;

use serde::Deserialize;
use verdant_rendering::RenderConfig;

use crate::demo::DemoConfig;
use crate::error::{VerdantError, VerdantResult};

/// Renderer and demo settings for one run.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Renderer settings.
    pub render: RenderConfig,
    /// Demo population.
    pub demo: DemoConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DemoTable {
    demo: DemoConfig,
}

impl AppConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// [`VerdantError::Render`] if the renderer tables are invalid,
    /// [`VerdantError::Config`] if the demo table cannot be parsed.
    pub fn from_toml_str(content: &str) -> VerdantResult<Self> {
        let render = RenderConfig::from_toml_str(content)?;
        let DemoTable { demo } =
            toml::from_str(content).map_err(|e| VerdantError::Config(e.to_string()))?;
        Ok(Self { render, demo })
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`VerdantError::Config`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> VerdantResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| VerdantError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
