//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::Args;
use sigflow_config::{EngineConfig, Patch, find_patch, get_factory_patch, validate_patch};
use sigflow_core::BufferBank;
use sigflow_io::load_bank;
use std::path::{Path, PathBuf};

/// Engine settings that override the patch and the user's `engine.toml`.
#[derive(Args, Debug, Default)]
pub struct EngineOverrides {
    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames rendered per block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Output channel count
    #[arg(long)]
    pub channels: Option<usize>,
}

/// A patch plus the directory its sample paths resolve against.
#[derive(Debug)]
pub struct LoadedPatch {
    /// The parsed patch.
    pub patch: Patch,
    /// Directory relative buffer paths are resolved against.
    pub base_dir: PathBuf,
    /// File the patch came from; `None` for factory patches.
    pub path: Option<PathBuf>,
}

impl LoadedPatch {
    /// Where the patch came from, for display.
    pub fn origin(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "factory".to_string(),
        }
    }
}

/// Load a patch by name or path.
///
/// Searches in this order:
/// 1. Factory patches (by name)
/// 2. A file at `name`, with or without a `.toml`/`.json` extension
/// 3. The user patches directory
pub fn load_patch(name: &str) -> anyhow::Result<LoadedPatch> {
    if let Some(patch) = get_factory_patch(name) {
        return Ok(LoadedPatch {
            patch,
            base_dir: PathBuf::from("."),
            path: None,
        });
    }

    let Some(path) = find_patch(name) else {
        anyhow::bail!(
            "Patch '{}' not found. Use 'sigflow patches' to see available patches.",
            name
        );
    };

    let patch =
        Patch::load(&path).with_context(|| format!("failed to load patch {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    Ok(LoadedPatch {
        patch,
        base_dir,
        path: Some(path),
    })
}

/// Validate a loaded patch against the node registry.
pub fn validate(loaded: &LoadedPatch) -> anyhow::Result<()> {
    validate_patch(&loaded.patch)
        .with_context(|| format!("patch '{}' is invalid", loaded.patch.name))
}

/// Resolve engine settings: command-line overrides, then the patch's
/// `[engine]` table, then the user's `engine.toml`.
pub fn engine_settings(
    loaded: &LoadedPatch,
    overrides: &EngineOverrides,
) -> anyhow::Result<EngineConfig> {
    let fallback = EngineConfig::load_user().context("failed to load engine settings")?;
    let mut config = loaded.patch.engine_or(fallback);
    if let Some(sample_rate) = overrides.sample_rate {
        config.sample_rate = sample_rate;
    }
    if let Some(block_size) = overrides.block_size {
        config.block_size = block_size;
    }
    if let Some(channels) = overrides.channels {
        config.output_channels = channels;
    }
    config.validate()?;
    Ok(config)
}

/// Read every sample file the patch declares.
pub fn load_assets(loaded: &LoadedPatch) -> anyhow::Result<BufferBank> {
    let patch = &loaded.patch;
    let assets = patch
        .buffers
        .keys()
        .filter_map(|name| Some((name.as_str(), patch.buffer_path(name, &loaded.base_dir)?)));
    Ok(load_bank(assets)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_config::NodeConfig;
    use tempfile::TempDir;

    #[test]
    fn test_load_factory_patch() {
        let loaded = load_patch("tone").unwrap();
        assert!(loaded.path.is_none());
        assert_eq!(loaded.origin(), "factory");
        validate(&loaded).unwrap();
    }

    #[test]
    fn test_load_patch_file_sets_base_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saw.toml");
        Patch::new("Saw")
            .with_output(NodeConfig::new("saw").with_input("frequency", 110.0))
            .save(&path)
            .unwrap();

        let loaded = load_patch(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.patch.name, "Saw");
        assert_eq!(loaded.base_dir, dir.path());
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_patch() {
        let err = load_patch("/definitely/not/a/patch").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_overrides_win() {
        let loaded = LoadedPatch {
            patch: Patch::new("x").with_engine(EngineConfig {
                block_size: 64,
                ..EngineConfig::default()
            }),
            base_dir: PathBuf::from("."),
            path: None,
        };
        let overrides = EngineOverrides {
            sample_rate: Some(44100),
            block_size: None,
            channels: Some(1),
        };
        let config = engine_settings(&loaded, &overrides).unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.output_channels, 1);

        let bad = EngineOverrides {
            block_size: Some(0),
            ..EngineOverrides::default()
        };
        assert!(engine_settings(&loaded, &bad).is_err());
    }
}
