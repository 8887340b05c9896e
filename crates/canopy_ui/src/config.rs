//! Configuration for the element subsystem.
//!
//! Loaded from TOML at startup:
//!
//! ```toml
//! [world]
//! capacity = 8192
//!
//! [elements]
//! max_settle_passes = 32
//! scratch_capacity = 512
//! ```
//!
//! Every field has a default, so an empty file is valid.

use std::path::Path;

use canopy_core::WorldConfig;
use serde::Deserialize;

use crate::error::{UiError, UiResult};

/// Default bound on settle passes per tick.
pub const DEFAULT_MAX_SETTLE_PASSES: usize = 64;

/// Default pre-allocated size of the per-pass entity snapshot.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 256;

/// Element manager tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ElementManagerConfig {
    /// Passes one `update` may run before giving up with
    /// [`UiError::SettleLimitExceeded`]. Must be at least 1.
    pub max_settle_passes: usize,
    /// Initial capacity of the snapshot buffer.
    pub scratch_capacity: usize,
}

impl Default for ElementManagerConfig {
    fn default() -> Self {
        Self {
            max_settle_passes: DEFAULT_MAX_SETTLE_PASSES,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }
}

impl ElementManagerConfig {
    /// Parses a document holding these fields at top level.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] on malformed TOML or a zero pass
    /// limit.
    pub fn from_toml_str(source: &str) -> UiResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| UiError::InvalidConfig(e.to_string()))?;
        config.validate()
    }

    /// Checks the values, returning the config unchanged if they hold.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] on a zero pass limit.
    pub fn validate(self) -> UiResult<Self> {
        if self.max_settle_passes == 0 {
            return Err(UiError::InvalidConfig(
                "max_settle_passes must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Full configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanopyConfig {
    /// Entity storage.
    pub world: WorldConfig,
    /// Element manager.
    pub elements: ElementManagerConfig,
}

impl CanopyConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] on malformed TOML or invalid
    /// values.
    pub fn from_toml_str(source: &str) -> UiResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| UiError::InvalidConfig(e.to_string()))?;
        if config.world.capacity == 0 {
            return Err(UiError::InvalidConfig("world.capacity must be at least 1".to_string()));
        }
        let elements = config.elements.validate()?;
        Ok(Self { elements, ..config })
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> UiResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| UiError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}
