//! Engine settings shared by every patch.

use serde::{Deserialize, Serialize};
use sigflow_core::GraphConfig;
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::{ValidationError, ValidationResult};

/// Render and output settings.
///
/// Stored standalone as `engine.toml` in the user config directory, or
/// inline as the `[engine]` table of a patch.
///
/// ```toml
/// sample_rate = 48000
/// block_size = 256
/// output_channels = 2
/// output_device = "MacBook Pro Speakers"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames rendered per block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Channels mixed to the output.
    #[serde(default = "default_output_channels")]
    pub output_channels: usize,

    /// Output device name; the system default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_block_size() -> usize {
    256
}

fn default_output_channels() -> usize {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            output_channels: default_output_channels(),
            output_device: None,
        }
    }
}

impl EngineConfig {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidEngine`] for the first bad field.
    pub fn validate(&self) -> ValidationResult<()> {
        let invalid = |field: &str, reason: &str| {
            Err(ValidationError::InvalidEngine {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };
        if self.sample_rate == 0 {
            return invalid("sample_rate", "must be positive");
        }
        if self.block_size == 0 {
            return invalid("block_size", "must be positive");
        }
        if self.output_channels == 0 {
            return invalid("output_channels", "must be at least 1");
        }
        Ok(())
    }

    /// Graph settings for these engine settings.
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            sample_rate: self.sample_rate as f32,
            block_size: self.block_size,
            output_channels: self.output_channels,
        }
    }

    /// Load engine settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Save engine settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Load `engine.toml` from the user config directory, falling back to
    /// defaults when the file does not exist.
    #[cfg(feature = "std")]
    pub fn load_user() -> Result<Self, ConfigError> {
        let path = crate::paths::user_engine_config();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
