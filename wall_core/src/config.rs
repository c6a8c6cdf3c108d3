//! # Configuration
//!
//! Dimensions and prices consumed by the core. None of these are computed
//! here; they come from the caller (a settings form, a TOML file, or the
//! defaults below) and are passed explicitly into every operation that
//! needs them.
//!
//! ## TOML Example
//!
//! Every field is optional; missing fields fall back to the defaults.
//!
//! ```toml
//! [scene]
//! block_height = 0.41
//! column_height = 3.0
//! min_column_distance = 1.5
//!
//! [rates]
//! column_price = 10000.0
//! hourly_rate = 2000.0
//! ```
//!
//! ```rust
//! use wall_core::config::Settings;
//!
//! let settings = Settings::from_toml_str("[scene]\ncolumn_height = 2.4\n").unwrap();
//! assert_eq!(settings.scene.column_height, 2.4);
//! assert_eq!(settings.scene.block_height, 0.41);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{WallError, WallResult};
use crate::estimate::CostRates;

/// Geometry of the building elements.
///
/// All lengths share one (unspecified) world unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Block length along the wall
    pub block_width: f64,
    /// Vertical size of one block; also the stacking increment
    pub block_height: f64,
    /// Block thickness
    pub block_depth: f64,
    pub column_width: f64,
    /// Blocks may not be placed at or above this height
    pub column_height: f64,
    pub column_depth: f64,
    /// Grid step for horizontal growth
    pub min_column_distance: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            block_width: 1.41,
            block_height: 0.41,
            block_depth: 0.2,
            column_width: 0.3,
            column_height: 3.0,
            column_depth: 0.3,
            min_column_distance: 1.5,
        }
    }
}

impl SceneConfig {
    /// Height at which the first course of blocks sits (centered on half a block).
    pub fn base_block_y(&self) -> f64 {
        self.block_height / 2.0
    }

    /// Validate that every dimension is usable.
    pub fn validate(&self) -> WallResult<()> {
        let fields = [
            ("block_width", self.block_width),
            ("block_height", self.block_height),
            ("block_depth", self.block_depth),
            ("column_width", self.column_width),
            ("column_height", self.column_height),
            ("column_depth", self.column_depth),
            ("min_column_distance", self.min_column_distance),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(WallError::invalid_input(
                    field,
                    value.to_string(),
                    "Dimension must be a positive number",
                ));
            }
        }
        if self.block_height >= self.column_height {
            return Err(WallError::invalid_input(
                "block_height",
                self.block_height.to_string(),
                format!(
                    "Block height must be smaller than the column height ({})",
                    self.column_height
                ),
            ));
        }
        Ok(())
    }
}

/// All user-tunable settings, as stored in project files and TOML configs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scene: SceneConfig,
    pub rates: CostRates,
}

impl Settings {
    /// Validate both the scene geometry and the cost rates.
    pub fn validate(&self) -> WallResult<()> {
        self.scene.validate()?;
        self.rates.validate()
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> WallResult<Self> {
        let settings: Settings = toml::from_str(content).map_err(|e| WallError::ConfigError {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a TOML settings file.
    pub fn from_toml_file(path: &Path) -> WallResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WallError::file_error("read settings", path.display().to_string(), e.to_string())
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|e| WallError::ConfigError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}
