//! Application configuration.
//!
//! The configuration is loaded from a JSON file (by default
//! `$XDG_CONFIG_HOME/dashgrid/config.json`).  Every section is optional and
//! falls back to compiled-in defaults, so `{}` is a valid file.
//!
//! # Example
//!
//! ```json
//! {
//!   "grid": { "columns": 24, "rows": 12 },
//!   "persistence": { "save_debounce_ms": 250 },
//!   "interaction": { "drag_threshold_px": 4.0 },
//!   "widgets": {
//!     "clock": { "min_width": 3, "min_height": 2, "max_width": 12, "max_height": 8 }
//!   }
//! }
//! ```

use crate::layout::{GridConfig, WidgetConstraints, WidgetRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Grid used when no dashboard has been saved yet.
    #[serde(default)]
    pub grid: GridConfig,

    /// Save debouncing.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Pointer interaction tuning.
    #[serde(default)]
    pub interaction: InteractionConfig,

    /// Per-type constraint overrides, merged over the built-in registry.
    #[serde(default)]
    pub widgets: HashMap<String, WidgetConstraints>,
}

/// How layout saves are batched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Delay between the last local mutation and the save (ms).  Mutations
    /// within the window replace the pending payload.
    pub save_debounce_ms: u64,
}

impl PersistenceConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 250,
        }
    }
}

/// Pointer interaction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Distance (px) the pointer must travel after pointer-down before a
    /// press becomes a drag.
    pub drag_threshold_px: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 4.0,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// The built-in registry with this configuration's overrides applied.
    pub fn registry(&self) -> WidgetRegistry {
        let mut registry = WidgetRegistry::builtin();
        for (widget_type, constraints) in &self.widgets {
            registry.set_constraints(widget_type, *constraints);
        }
        registry
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
