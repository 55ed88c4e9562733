//! Node graph execution for sigflow.
//!
//! A [`Graph`] owns a set of [`Node`]s, each with named inputs that read either
//! a constant or another node's output. Editing the graph (add, wire, remove)
//! invalidates its schedule; [`Graph::compile`] validates the topology and
//! fixes a render order; [`Graph::render`] executes that order once per block.
//!
//! # Render Order
//!
//! The order is topological over "reads from", so every node renders after
//! the nodes it reads. Nodes that become ready together render in insertion
//! order, which makes the order deterministic for a given build sequence.
//! Only nodes reachable from a graph output are rendered.
//!
//! # Feedback
//!
//! Cycles are rejected at [`Graph::set_input`] time unless they pass through a
//! node that [delays its inputs](Node::delays_inputs). Such a node renders
//! what it captured during the previous block, so the loop has one block of
//! latency.
//!
//! # Off-Thread Construction
//!
//! [`build_spec`] turns a [`NodeSpec`](crate::NodeSpec) tree into prepared
//! [`NodeEntry`]s without touching the graph. A control thread can build
//! there, then ship the entries to the audio thread for
//! [`Graph::insert_node`], which does not allocate for the node itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use sigflow_core::graph::{Graph, GraphConfig, InputSource};
//!
//! let mut graph = Graph::new(GraphConfig::default())?;
//! let osc = graph.add_node(Box::new(Oscillator::sine()));
//! let amp = graph.add_node(Box::new(Multiply::new()));
//! graph.set_input(amp, "a", InputSource::Node(osc))?;
//! graph.set_input(amp, "b", InputSource::Constant(0.25))?;
//! graph.add_output(amp)?;
//! graph.compile()?;
//!
//! let block = graph.render(256);
//! ```

mod build;
pub mod node;
mod processing;
pub mod schedule;

pub use build::{BufferBank, BuildContext, BuiltSpec, NodeFactory, build_spec};
pub use node::{
    BoxedNode, IdAllocator, InputSource, InputSpec, Inputs, Node, NodeId, RenderContext, Signal,
    WarnOnce,
};
pub use processing::{Graph, GraphConfig, NodeEntry};
pub use schedule::CompiledSchedule;
