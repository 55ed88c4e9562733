//! Audio I/O and live mutation for sigflow graphs.
//!
//! This crate provides:
//!
//! - **Output sinks**: the [`OutputSink`] lifecycle, with a headless
//!   [`DummySink`] and a hardware [`CpalSink`]
//! - **Staged mutation**: [`engine`] splits a graph into an [`EngineHandle`]
//!   for the control thread and a [`Renderer`] for the audio thread
//! - **Sample assets**: [`read_wav`] and [`load_bank`] fill a
//!   [`BufferBank`](sigflow_core::BufferBank) from WAV files
//! - **Devices**: [`list_devices`] and [`default_device`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sigflow_core::{GraphConfig, NodeSpec};
//! use sigflow_io::{CpalSink, OutputSink, SinkConfig, engine, load_bank};
//! use sigflow_registry::NodeRegistry;
//!
//! let config = GraphConfig::default();
//! let bank = load_bank([("voice", "voice.wav")])?;
//! let spec = NodeSpec::new("sampler").with_buffer("buffer", "voice");
//!
//! let (mut handle, renderer) = engine(config)?;
//! let mut tx = handle.transaction();
//! let root = tx.add_spec(&spec, &NodeRegistry::new(), &bank)?;
//! tx.add_output(root);
//! tx.commit()?;
//!
//! let mut sink = CpalSink::new();
//! sink.init(
//!     &SinkConfig::from_graph(&config, None),
//!     renderer.into_callback(config.output_channels),
//! )?;
//! sink.start()?;
//! # Ok::<(), sigflow_io::Error>(())
//! ```

mod cpal_sink;
mod devices;
pub mod engine;
mod sink;
mod wav;

use std::path::PathBuf;

pub use cpal_sink::CpalSink;
pub use devices::{AudioDevice, default_device, list_devices};
pub use engine::{
    DEFAULT_NODE_CAPACITY, EngineHandle, GraphCommand, Renderer, Transaction, engine,
    engine_with_capacity,
};
pub use sink::{DummyClock, DummySink, OutputSink, RenderCallback, SinkConfig, SinkState};
pub use wav::{WavInfo, load_bank, read_wav, read_wav_info, write_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Graph construction or mutation error.
    #[error("graph error: {0}")]
    Graph(#[from] sigflow_core::GraphError),

    /// A sample asset could not be loaded.
    #[error("failed to load buffer '{name}' from '{path}': {reason}")]
    Asset {
        /// Asset name.
        name: String,
        /// File the asset was read from.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A sink operation was called in the wrong lifecycle state.
    #[error("cannot {op} a sink that is {state}")]
    InvalidSinkState {
        /// Operation attempted.
        op: &'static str,
        /// State the sink was in.
        state: SinkState,
    },

    /// The renderer half of the engine was dropped.
    #[error("engine renderer is gone")]
    EngineClosed,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
