//! Patch file format and operations.

use serde::{Deserialize, Serialize};
use sigflow_core::NodeSpec;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::node_config::NodeConfig;

/// A complete graph description: the node trees mixed to the output, the
/// sample files they read, and optionally the engine settings to run at.
///
/// Patches are stored as TOML (or JSON, chosen by file extension).
///
/// # TOML Format
///
/// ```toml
/// name = "Cloud"
/// description = "Clocked grains over a voice sample"
///
/// [engine]
/// block_size = 128
///
/// [buffers]
/// voice = "samples/voice.wav"
///
/// [[outputs]]
/// node = "granulator"
/// buffers = { buffer = "voice" }
///
/// [outputs.inputs]
/// pos = 0.3
/// grain_length = 0.1
/// clock = { node = "impulse", inputs = { frequency = 12 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patch {
    /// Name of the patch.
    pub name: String,

    /// Optional description of the patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine settings; the user's `engine.toml` applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,

    /// Buffer asset name to sample file. Relative paths resolve against the
    /// patch file's directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buffers: BTreeMap<String, PathBuf>,

    /// Node trees summed into the output mix.
    #[serde(default)]
    pub outputs: Vec<NodeConfig>,
}

enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

impl Patch {
    /// Create a new empty patch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            engine: None,
            buffers: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Create a patch with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set engine settings.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Register a sample file under asset name `name`.
    pub fn with_buffer(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.buffers.insert(name.into(), path.into());
        self
    }

    /// Add an output node tree.
    pub fn with_output(mut self, output: NodeConfig) -> Self {
        self.outputs.push(output);
        self
    }

    /// Load a patch from a TOML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        match Format::of(path) {
            Format::Toml => Self::from_toml(&content),
            Format::Json => Self::from_json(&content),
        }
    }

    /// Load a patch from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load a patch from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the patch, as JSON for `.json` paths and TOML otherwise.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = match Format::of(path) {
            Format::Toml => self.to_toml()?,
            Format::Json => self.to_json()?,
        };
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the patch to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert the patch to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Output trees as [`NodeSpec`]s, in file order.
    pub fn output_specs(&self) -> Vec<NodeSpec> {
        self.outputs.iter().map(NodeConfig::to_spec).collect()
    }

    /// Path of buffer asset `name`, resolved against `base_dir` when relative.
    pub fn buffer_path(&self, name: &str, base_dir: &Path) -> Option<PathBuf> {
        let path = self.buffers.get(name)?;
        Some(if path.is_absolute() {
            path.clone()
        } else {
            base_dir.join(path)
        })
    }

    /// Engine settings of this patch, or `fallback` when it has none.
    pub fn engine_or(&self, fallback: EngineConfig) -> EngineConfig {
        self.engine.clone().unwrap_or(fallback)
    }

    /// Number of output trees.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Check if the patch has no outputs.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
