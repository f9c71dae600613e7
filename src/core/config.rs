//! Layout configuration with documented constants
//!
//! World dimensions and grid resolution live here, together with the
//! per-frame time budget used to clamp oversized deltas.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LayoutError, Result};

/// Configuration for a single layout (level, arena, menu screen)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    // === SPATIAL GRID ===
    /// Edge length of a square grid cell (world units)
    ///
    /// Should be at least as large as the typical entity so that most
    /// entities occupy one cell and none occupy more than four.
    /// Smaller = more cells, fewer candidates per query
    /// Larger = fewer cells, more exact-intersection checks per query
    pub cell_size: f32,

    /// Width of the world (world units)
    ///
    /// Grid width is `ceil(width / cell_size)`. Entities outside the world
    /// still simulate; they just stop being discoverable by queries.
    pub width: f32,

    /// Height of the world (world units)
    pub height: f32,

    // === FRAME BUDGET ===
    /// Largest delta time (seconds) a single frame is allowed to simulate
    ///
    /// A hitch longer than this is clamped so that movement never jumps
    /// further than one budgeted frame would allow. At the default (1/20 s)
    /// an entity falling at 250 units/s moves at most 12.5 units per frame.
    pub max_frame_delta: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            width: 1280.0,
            height: 720.0,
            max_frame_delta: 1.0 / 20.0,
        }
    }
}

impl LayoutConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a world of the given size, keeping the other defaults
    pub fn with_world(cell_size: f32, width: f32, height: f32) -> Self {
        Self {
            cell_size,
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: LayoutConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Number of grid columns
    pub fn grid_width(&self) -> usize {
        (self.width / self.cell_size).ceil() as usize
    }

    /// Number of grid rows
    pub fn grid_height(&self) -> usize {
        (self.height / self.cell_size).ceil() as usize
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;

        if !positive(self.cell_size) {
            return Err(LayoutError::InvalidConfig(format!(
                "cell_size ({}) must be a positive finite number",
                self.cell_size
            )));
        }

        if !positive(self.width) || !positive(self.height) {
            return Err(LayoutError::InvalidConfig(format!(
                "world size ({} x {}) must be positive and finite",
                self.width, self.height
            )));
        }

        // A cell larger than the world degenerates into a single bucket
        if self.cell_size > self.width.max(self.height) {
            return Err(LayoutError::InvalidConfig(format!(
                "cell_size ({}) exceeds the world size ({} x {})",
                self.cell_size, self.width, self.height
            )));
        }

        if !positive(self.max_frame_delta) {
            return Err(LayoutError::InvalidConfig(format!(
                "max_frame_delta ({}) must be positive",
                self.max_frame_delta
            )));
        }

        Ok(())
    }
}
