// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration, stored as RON.

use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default undo depth
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Marquee inclusion policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Select anything whose bounds touch the marquee
    #[default]
    Overlap,
    /// Select only what lies entirely inside the marquee
    Include,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON write error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of undoable transactions per graph
    pub history_capacity: usize,
    /// Marquee inclusion policy
    pub selection_mode: SelectionMode,
    /// Node size used for bounds until the presentation layer measures it
    pub default_node_size: Size,
    /// Router bounding box size
    pub router_size: Size,
    /// Trace every lifecycle notification
    pub trace_lifecycle: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            selection_mode: SelectionMode::Overlap,
            default_node_size: Size::new(180.0, 96.0),
            router_size: Size::new(12.0, 12.0),
            trace_lifecycle: false,
        }
    }
}

impl EngineConfig {
    /// Parse from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Render as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
