//! Sigflow Core - signal graph primitives
//!
//! This crate provides the foundation of the sigflow engine: sample buffers,
//! a rate-adapting ring, the [`Node`] contract, and the [`Graph`] that renders
//! nodes in dependency order one block at a time.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`Buffer`] - Multi-channel sample storage with wrapping fractional reads
//! - [`CircularBuffer`] - Fixed-capacity ring that bridges mismatched block sizes
//!
//! ## Graph
//!
//! - [`Node`] - Object-safe trait implemented by every processing unit
//! - [`Graph`] - Owns nodes, compiles a render order, renders blocks
//! - [`NodeSpec`] - Declarative node tree, built into a graph via a [`NodeFactory`]
//! - [`BufferBank`] - Named sample assets shared with nodes
//!
//! ## Utilities
//!
//! - [`GrainWindow`] - Grain envelope shapes
//! - [`power_ceil`], [`pan_gains`], [`seconds_to_frames`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sigflow-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: rendering never allocates, locks, or fails
//! - **Construction errors are loud**: bad wiring is rejected before the first render
//! - **Degraded states are quiet**: missing material renders silence and logs once

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod circular;
pub mod error;
pub mod graph;
pub mod math;
pub mod node_spec;
pub mod window;

pub use buffer::{Buffer, Interpolation};
pub use circular::CircularBuffer;
pub use error::{GraphError, RingError};
pub use graph::{
    BoxedNode, BufferBank, BuildContext, Graph, GraphConfig, InputSource, InputSpec, Inputs, Node,
    NodeEntry, NodeFactory, NodeId, RenderContext, Signal, WarnOnce,
};
pub use math::{lerp, pan_gains, power_ceil, seconds_to_frames};
pub use node_spec::{CONSTANT_KIND, NodeSpec};
pub use window::GrainWindow;
