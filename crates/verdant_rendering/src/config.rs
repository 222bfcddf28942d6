//! # Render Configuration
//!
//! All capacities and thresholds are fixed at startup. Loaded from TOML:
//!
//! ```toml
//! [lod]
//! detail_distance = 80.0
//! cull_distance = 500.0
//!
//! [detail]
//! max_detailed = 100
//!
//! [proxy]
//! plant_capacity = 8192
//! plant_shares = [0.8, 0.2]
//! ```
//!
//! Missing tables and keys fall back to [`RenderConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Tier thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Entities nearer than this may be Detailed.
    pub detail_distance: f32,
    /// Entities at or beyond this are Culled.
    pub cull_distance: f32,
    /// Entities nearer than this are visible regardless of the frustum.
    pub near_override: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            detail_distance: 80.0,
            cull_distance: 500.0,
            near_override: 12.0,
        }
    }
}

/// Detailed renderer pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailConfig {
    /// Hard cap on simultaneously active detailed renderers.
    pub max_detailed: usize,
    /// Bound on the recycle list. Released handles beyond it are destroyed.
    pub recycle_limit: usize,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            max_detailed: 100,
            recycle_limit: 32,
        }
    }
}

/// Proxy buffer capacities and partition shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Slots in the creature buffer.
    pub creature_capacity: u32,
    /// Slots in the plant buffer.
    pub plant_capacity: u32,
    /// Land / water split of the plant buffer.
    pub plant_shares: [f32; 2],
    /// Slots in the corpse buffer.
    pub corpse_capacity: u32,
    /// Fresh / toxic split of the corpse buffer.
    pub corpse_shares: [f32; 2],
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            creature_capacity: 4096,
            plant_capacity: 8192,
            plant_shares: [0.8, 0.2],
            corpse_capacity: 1024,
            corpse_shares: [0.7, 0.3],
        }
    }
}

/// Simulation link settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Largest elapsed time sent in one step request, in seconds.
    pub max_step: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { max_step: 0.25 }
    }
}

/// Complete renderer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tier thresholds.
    pub lod: LodConfig,
    /// Detail pool limits.
    pub detail: DetailConfig,
    /// Proxy buffers.
    pub proxy: ProxyConfig,
    /// Simulation link.
    pub simulation: SimulationConfig,
}

impl RenderConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConfigIo`] on a parse failure,
    /// [`RenderError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(content: &str) -> RenderResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RenderError::ConfigIo(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConfigIo`] if the file cannot be read or parsed,
    /// [`RenderError::InvalidConfig`] if validation fails.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RenderError::ConfigIo(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] naming the first violated constraint.
    pub fn validate(&self) -> RenderResult<()> {
        let lod = &self.lod;
        for (name, value) in [
            ("lod.detail_distance", lod.detail_distance),
            ("lod.cull_distance", lod.cull_distance),
            ("lod.near_override", lod.near_override),
            ("simulation.max_step", self.simulation.max_step),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be finite and non-negative, got {value}")));
            }
        }
        if lod.detail_distance >= lod.cull_distance {
            return Err(invalid(format!(
                "lod.detail_distance ({}) must be less than lod.cull_distance ({})",
                lod.detail_distance, lod.cull_distance
            )));
        }

        let proxy = &self.proxy;
        for (name, capacity) in [
            ("proxy.creature_capacity", proxy.creature_capacity),
            ("proxy.plant_capacity", proxy.plant_capacity),
            ("proxy.corpse_capacity", proxy.corpse_capacity),
        ] {
            if capacity == 0 {
                return Err(invalid(format!("{name} must be greater than zero")));
            }
        }
        validate_shares("proxy.plant_shares", &proxy.plant_shares)?;
        validate_shares("proxy.corpse_shares", &proxy.corpse_shares)?;

        Ok(())
    }
}

fn invalid(message: String) -> RenderError {
    RenderError::InvalidConfig(message)
}

/// Shares must be non-negative and sum to one.
fn validate_shares(name: &str, shares: &[f32]) -> RenderResult<()> {
    if shares.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(invalid(format!("{name} contains a negative or non-finite share")));
    }
    let sum: f32 = shares.iter().sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(invalid(format!("{name} must sum to 1.0, got {sum}")));
    }
    Ok(())
}
