//! sigflow Nodes - concrete node kinds for the sigflow graph
//!
//! Every type here implements [`sigflow_core::Node`] and can be added to a
//! [`sigflow_core::Graph`] directly or built by name through a registry.
//!
//! # Generators
//!
//! - [`Oscillator`] - sine, square, saw and triangle ([`Waveform`])
//! - [`Impulse`] - periodic single-frame clock
//! - [`Noise`] / [`Dust`] - uniform noise and random impulses
//! - [`Constant`] - a fixed value
//!
//! # Shaping and routing
//!
//! - [`Envelope`] - clock-triggered attack/sustain/release
//! - [`Operator`] - multiply or add two signals ([`BinaryOp`])
//! - [`Delay`] - feedback echo
//! - [`Feedback`] - one-block delay that may close a loop
//! - [`Resample`] - sample-and-hold rate reduction
//!
//! # Buffer players
//!
//! - [`Sampler`] - variable-rate playback of a source buffer
//! - [`Granulator`] - clock-driven grains over a source buffer
//!
//! ```rust
//! use std::sync::Arc;
//! use sigflow_core::{Buffer, Graph, GraphConfig, GrainWindow, InputSource};
//! use sigflow_nodes::{Granulator, Impulse};
//!
//! let mut graph = Graph::new(GraphConfig::default()).unwrap();
//! let ctx = graph.context();
//! let clock = graph.add_node(Box::new(Impulse::new(ctx.sample_rate)));
//! graph.set_input(clock, "frequency", InputSource::Constant(20.0)).unwrap();
//!
//! let grains = graph.add_node(Box::new(Granulator::new(64, 2, GrainWindow::Triangle)));
//! graph.set_input(grains, "clock", InputSource::Node(clock)).unwrap();
//! graph.set_buffer(grains, "buffer", Arc::new(Buffer::new(1, 48000, 48000.0))).unwrap();
//! graph.add_output(grains).unwrap();
//! graph.compile().unwrap();
//! graph.render(256);
//! ```
//!
//! # Model inference
//!
//! With the `std` feature, [`ModelNode`] runs any [`InferenceBackend`]
//! inline or on a worker thread.
//!
//! # no_std Support
//!
//! Everything except the model node builds without `std`:
//!
//! ```toml
//! [dependencies]
//! sigflow-nodes = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod constant;
pub mod delay;
pub mod envelope;
pub mod granulator;
#[cfg(feature = "std")]
pub mod model;
pub mod noise;
pub mod operators;
pub mod oscillator;
pub mod resample;
pub mod sampler;
pub mod trigger;

pub use constant::Constant;
pub use delay::{Delay, Feedback};
pub use envelope::{Envelope, EnvelopeStage};
pub use granulator::{DEFAULT_MAX_GRAINS, Grain, GrainPool, Granulator};
#[cfg(feature = "std")]
pub use model::{
    AttributeError, InferenceBackend, LoadStatus, ModelConfig, ModelInfo, ModelMode, ModelNode,
    ModelState, NullBackend, Warmup,
};
pub use noise::{Dust, Noise, Xorshift};
pub use operators::{BinaryOp, Operator};
pub use oscillator::{Impulse, Oscillator, Waveform};
pub use resample::Resample;
pub use sampler::Sampler;
pub use trigger::RisingEdge;
