//! Staged graph mutation.
//!
//! The graph is split in two halves that never share a lock:
//!
//! - [`EngineHandle`] stays on the control thread. It allocates node IDs,
//!   builds and allocates nodes, validates changes against its own copy of
//!   the wiring, and sends whole [`Transaction`]s.
//! - [`Renderer`] moves to the audio thread. Before each block it applies
//!   every pending transaction, recompiles if the wiring changed, renders,
//!   and ships removed nodes and replaced buffers back to the handle.
//!
//! A transaction is all-or-nothing: it is validated as a whole on commit and
//! applied as a whole between two blocks.
//!
//! ```rust
//! use sigflow_core::{GraphConfig, InputSource};
//! use sigflow_io::engine;
//! use sigflow_nodes::{Oscillator, Waveform};
//!
//! let config = GraphConfig::default();
//! let (mut handle, mut renderer) = engine(config).unwrap();
//!
//! let mut tx = handle.transaction();
//! let osc = tx.add_node(Box::new(Oscillator::new(Waveform::Sine, config.sample_rate)));
//! tx.connect(osc, "frequency", InputSource::Constant(220.0));
//! tx.add_output(osc);
//! tx.commit().unwrap();
//!
//! // On the audio thread:
//! let block = renderer.render(256);
//! assert!(block.channel(0).iter().any(|&s| s != 0.0));
//! ```

mod command;
mod topology;

pub use command::GraphCommand;

use crate::sink::RenderCallback;
use crate::{Error, Result};
use command::Garbage;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use sigflow_core::graph::{IdAllocator, build_spec};
use sigflow_core::{
    BoxedNode, Buffer, BufferBank, Graph, GraphConfig, GraphError, InputSource, NodeEntry,
    NodeFactory, NodeId, NodeSpec,
};
use std::sync::Arc;
use topology::Topology;

/// Node slots reserved up front by [`engine`].
pub const DEFAULT_NODE_CAPACITY: usize = 256;

/// Garbage items that can be in flight before the renderer drops in place.
const GARBAGE_CAPACITY: usize = 1024;

/// Creates a connected handle/renderer pair for an empty graph.
pub fn engine(config: GraphConfig) -> Result<(EngineHandle, Renderer)> {
    engine_with_capacity(config, DEFAULT_NODE_CAPACITY)
}

/// Like [`engine`], reserving room for `node_capacity` nodes so inserts on
/// the audio thread do not reallocate.
pub fn engine_with_capacity(
    config: GraphConfig,
    node_capacity: usize,
) -> Result<(EngineHandle, Renderer)> {
    let mut graph = Graph::new(config)?;
    graph.reserve(node_capacity);

    let (command_tx, command_rx) = unbounded();
    let (garbage_tx, garbage_rx) = bounded(GARBAGE_CAPACITY);

    let handle = EngineHandle {
        config,
        ids: graph.id_allocator(),
        topology: Topology::default(),
        commands: command_tx,
        garbage: garbage_rx,
    };
    let renderer = Renderer {
        graph,
        commands: command_rx,
        garbage: garbage_tx,
        applied: 0,
    };
    Ok((handle, renderer))
}

/// Control-thread half of the engine.
pub struct EngineHandle {
    config: GraphConfig,
    ids: IdAllocator,
    topology: Topology,
    commands: Sender<Vec<GraphCommand>>,
    garbage: Receiver<Garbage>,
}

impl EngineHandle {
    /// Render settings of the graph.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Starts staging a set of changes.
    pub fn transaction(&mut self) -> Transaction<'_> {
        Transaction {
            handle: self,
            ops: Vec::new(),
        }
    }

    /// Nodes in the graph once every committed transaction is applied.
    pub fn node_count(&self) -> usize {
        self.topology.len()
    }

    /// Returns true if a committed transaction added `id` and none removed it.
    pub fn contains(&self, id: NodeId) -> bool {
        self.topology.contains(id)
    }

    /// Output nodes once every committed transaction is applied.
    pub fn outputs(&self) -> &[NodeId] {
        self.topology.outputs()
    }

    /// Drops everything the renderer has handed back. Returns the number of
    /// items released.
    pub fn collect_garbage(&self) -> usize {
        let mut count = 0;
        while let Ok(item) = self.garbage.try_recv() {
            if let Garbage::Node(entry) = &item {
                tracing::debug!(kind = entry.node().kind(), "dropping removed node");
            }
            drop(item);
            count += 1;
        }
        count
    }
}

enum Op {
    Insert(NodeId, NodeEntry),
    Remove(NodeId),
    Connect(NodeId, String, InputSource),
    SetBuffer(NodeId, String, Arc<Buffer>),
    AddOutput(NodeId),
    RemoveOutput(NodeId),
    Reset,
}

/// A set of changes applied together between two renders.
///
/// Dropping a transaction without [`commit`](Self::commit) discards it. IDs
/// it allocated are not reused.
#[must_use = "a transaction does nothing until committed"]
pub struct Transaction<'a> {
    handle: &'a mut EngineHandle,
    ops: Vec<Op>,
}

impl Transaction<'_> {
    /// Allocates `node` and stages its insertion. Inputs start at their
    /// declared defaults.
    pub fn add_node(&mut self, node: BoxedNode) -> NodeId {
        let entry = NodeEntry::new(node, &self.handle.config.context());
        let id = self.handle.ids.allocate();
        self.ops.push(Op::Insert(id, entry));
        id
    }

    /// Builds a whole [`NodeSpec`] tree and stages its insertion. Returns the
    /// root's ID.
    pub fn add_spec(
        &mut self,
        spec: &NodeSpec,
        factory: &dyn NodeFactory,
        bank: &BufferBank,
    ) -> Result<NodeId> {
        let built = build_spec(
            spec,
            &self.handle.config.context(),
            factory,
            bank,
            &mut self.handle.ids,
        )?;
        self.ops.extend(
            built
                .entries
                .into_iter()
                .map(|(id, entry)| Op::Insert(id, entry)),
        );
        Ok(built.root)
    }

    /// Stages connecting input `input` of `node` to `source`.
    pub fn connect(&mut self, node: NodeId, input: &str, source: InputSource) -> &mut Self {
        self.ops.push(Op::Connect(node, input.to_string(), source));
        self
    }

    /// Stages attaching `buffer` to buffer slot `slot` of `node`.
    pub fn set_buffer(&mut self, node: NodeId, slot: &str, buffer: Arc<Buffer>) -> &mut Self {
        self.ops.push(Op::SetBuffer(node, slot.to_string(), buffer));
        self
    }

    /// Stages mixing `node` into the output.
    pub fn add_output(&mut self, node: NodeId) -> &mut Self {
        self.ops.push(Op::AddOutput(node));
        self
    }

    /// Stages removing `node` from the output mix.
    pub fn remove_output(&mut self, node: NodeId) -> &mut Self {
        self.ops.push(Op::RemoveOutput(node));
        self
    }

    /// Stages removing `node`. Nothing may read from it by then.
    pub fn remove_node(&mut self, node: NodeId) -> &mut Self {
        self.ops.push(Op::Remove(node));
        self
    }

    /// Stages resetting every node.
    pub fn reset(&mut self) -> &mut Self {
        self.ops.push(Op::Reset);
        self
    }

    /// Number of staged changes.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Validates every staged change and sends them to the renderer.
    ///
    /// # Errors
    ///
    /// The first change the graph would reject, or unresolved inputs on a
    /// node reachable from an output. Nothing is sent in either case.
    /// [`Error::EngineClosed`] if the renderer was dropped.
    pub fn commit(self) -> Result<()> {
        let mut topology = self.handle.topology.clone();
        let mut commands = Vec::with_capacity(self.ops.len());

        for op in self.ops {
            let command = match op {
                Op::Insert(id, entry) => {
                    topology.insert(id, &entry)?;
                    GraphCommand::Insert { id, entry }
                }
                Op::Remove(id) => {
                    topology.remove(id)?;
                    GraphCommand::Remove(id)
                }
                Op::Connect(node, input, source) => GraphCommand::Connect {
                    node,
                    input: topology.connect(node, &input, source)?,
                    source,
                },
                Op::SetBuffer(node, slot, buffer) => GraphCommand::SetBuffer {
                    node,
                    slot: topology.buffer_slot(node, &slot)?,
                    buffer,
                },
                Op::AddOutput(id) => {
                    topology.add_output(id)?;
                    GraphCommand::AddOutput(id)
                }
                Op::RemoveOutput(id) => {
                    topology.remove_output(id)?;
                    GraphCommand::RemoveOutput(id)
                }
                Op::Reset => GraphCommand::Reset,
            };
            commands.push(command);
        }
        topology.check_resolved()?;

        if commands.is_empty() {
            return Ok(());
        }
        let count = commands.len();
        self.handle
            .commands
            .send(commands)
            .map_err(|_| Error::EngineClosed)?;
        self.handle.topology = topology;
        tracing::debug!(commands = count, "transaction committed");
        Ok(())
    }
}

/// Audio-thread half of the engine.
pub struct Renderer {
    graph: Graph,
    commands: Receiver<Vec<GraphCommand>>,
    garbage: Sender<Garbage>,
    applied: u64,
}

impl Renderer {
    /// Applies pending transactions, then renders `num_frames` frames
    /// (clamped to the block size).
    pub fn render(&mut self, num_frames: usize) -> &Buffer {
        self.apply_pending();
        self.graph.render(num_frames)
    }

    /// Applies pending transactions once, then fills an interleaved slice.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.apply_pending();
        self.graph.render_interleaved(out, channels);
    }

    /// Wraps the renderer as a sink callback writing `channels` interleaved
    /// channels.
    pub fn into_callback(mut self, channels: usize) -> RenderCallback {
        Box::new(move |out: &mut [f32]| self.render_interleaved(out, channels))
    }

    /// The graph as of the last applied transaction.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Transactions applied so far.
    pub fn transactions_applied(&self) -> u64 {
        self.applied
    }

    /// Applies every transaction waiting in the queue. Returns how many were
    /// applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(commands) = self.commands.try_recv() {
            self.apply(commands);
            count += 1;
        }
        if count > 0
            && !self.graph.is_compiled()
            && let Err(e) = self.graph.compile()
        {
            tracing::warn!(error = %e, "graph failed to compile after mutation; output is silent");
        }
        count
    }

    fn apply(&mut self, mut commands: Vec<GraphCommand>) {
        for command in commands.drain(..) {
            if let Err(e) = self.apply_one(command) {
                tracing::warn!(error = %e, "staged graph change rejected");
            }
        }
        self.applied += 1;
        self.discard(Garbage::Transaction(commands));
    }

    fn apply_one(&mut self, command: GraphCommand) -> std::result::Result<(), GraphError> {
        match command {
            GraphCommand::Insert { id, entry } => self.graph.insert_node(id, entry)?,
            GraphCommand::Remove(id) => {
                let entry = self.graph.remove_node(id)?;
                self.discard(Garbage::Node(entry));
            }
            GraphCommand::Connect {
                node,
                input,
                source,
            } => self.graph.set_input(node, input, source)?,
            GraphCommand::SetBuffer { node, slot, buffer } => {
                if let Some(previous) = self.graph.set_buffer(node, slot, buffer)? {
                    self.discard(Garbage::Buffer(previous));
                }
            }
            GraphCommand::AddOutput(id) => self.graph.add_output(id)?,
            GraphCommand::RemoveOutput(id) => self.graph.remove_output(id)?,
            GraphCommand::Reset => self.graph.reset(),
        }
        Ok(())
    }

    fn discard(&self, item: Garbage) {
        if let Err(TrySendError::Full(item)) = self.garbage.try_send(item) {
            tracing::warn!("garbage queue full; releasing on the audio thread");
            drop(item);
        }
    }
}
