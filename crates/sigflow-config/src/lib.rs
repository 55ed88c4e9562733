//! Patch files and engine settings for sigflow graphs.
//!
//! # Features
//!
//! - **Patches**: Load and save node trees from TOML or JSON files
//! - **Engine settings**: Sample rate, block size, and output device
//! - **Validation**: Check patches against the node registry before building
//! - **Paths**: Platform-specific patch and config directories
//! - **Factory Patches**: Built-in patches that need no sample files
//!
//! # Example
//!
//! ```rust,no_run
//! use sigflow_config::{NodeConfig, Patch, validate_patch};
//!
//! let patch = Patch::new("Cloud")
//!     .with_buffer("voice", "samples/voice.wav")
//!     .with_output(
//!         NodeConfig::new("granulator")
//!             .with_input("clock", NodeConfig::new("impulse").with_input("frequency", 12.0))
//!             .with_input("pos", 0.3)
//!             .with_buffer("buffer", "voice"),
//!     );
//!
//! validate_patch(&patch).unwrap();
//! patch.save("cloud.toml").unwrap();
//! ```

mod engine;
mod error;
mod node_config;
mod patch;

/// Platform-specific paths for patches and configuration.
#[cfg(feature = "std")]
pub mod paths;

/// Patch validation.
pub mod validation;

/// Factory patches bundled with the library.
pub mod factory_patches;

pub use engine::EngineConfig;
pub use error::{ConfigError, FileOp};
pub use factory_patches::{
    FACTORY_PATCH_NAMES, factory_patch_names, factory_patches, get_factory_patch,
    is_factory_patch,
};
pub use node_config::{NodeConfig, OptionValue, ParamValue};
pub use patch::Patch;
#[cfg(feature = "std")]
pub use paths::{
    ensure_user_patches_dir, find_patch, list_user_patches, patch_name_from_path,
    user_config_dir, user_engine_config, user_patches_dir,
};
pub use validation::{
    PatchValidator, ValidationError, ValidationResult, validate_node_kind, validate_patch,
};

/// Re-export commonly used types from sigflow-registry
pub use sigflow_registry::{NodeCategory, NodeDescriptor, NodeRegistry};
