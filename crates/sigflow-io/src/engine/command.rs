//! Changes staged on the control thread and applied by the renderer.

use sigflow_core::{Buffer, InputSource, NodeEntry, NodeId};
use std::fmt;
use std::sync::Arc;

/// One graph mutation, already checked against the control-side topology.
///
/// Names are `'static` (taken from the node's own declarations) so applying
/// a command on the audio thread never frees a string.
pub enum GraphCommand {
    /// Insert a prepared node under a pre-allocated ID.
    Insert {
        /// ID allocated by the control thread.
        id: NodeId,
        /// Allocated node with its inputs seeded.
        entry: NodeEntry,
    },
    /// Remove a node that nothing reads from.
    Remove(NodeId),
    /// Connect an input.
    Connect {
        /// Node whose input changes.
        node: NodeId,
        /// Input name.
        input: &'static str,
        /// New source.
        source: InputSource,
    },
    /// Attach source material to a buffer slot.
    SetBuffer {
        /// Node whose slot changes.
        node: NodeId,
        /// Slot name.
        slot: &'static str,
        /// Shared buffer.
        buffer: Arc<Buffer>,
    },
    /// Mix a node into the output.
    AddOutput(NodeId),
    /// Stop mixing a node into the output.
    RemoveOutput(NodeId),
    /// Reset every node's state.
    Reset,
}

impl fmt::Debug for GraphCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { id, entry } => f
                .debug_struct("Insert")
                .field("id", id)
                .field("kind", &entry.node().kind())
                .finish(),
            Self::Remove(id) => f.debug_tuple("Remove").field(id).finish(),
            Self::Connect {
                node,
                input,
                source,
            } => f
                .debug_struct("Connect")
                .field("node", node)
                .field("input", input)
                .field("source", source)
                .finish(),
            Self::SetBuffer { node, slot, buffer } => f
                .debug_struct("SetBuffer")
                .field("node", node)
                .field("slot", slot)
                .field("frames", &buffer.num_frames())
                .finish(),
            Self::AddOutput(id) => f.debug_tuple("AddOutput").field(id).finish(),
            Self::RemoveOutput(id) => f.debug_tuple("RemoveOutput").field(id).finish(),
            Self::Reset => f.write_str("Reset"),
        }
    }
}

/// Things the renderer is done with, shipped back so they are dropped off
/// the audio thread.
pub(crate) enum Garbage {
    /// An applied transaction's (now empty) command vector.
    Transaction(Vec<GraphCommand>),
    /// A removed node.
    Node(NodeEntry),
    /// A buffer replaced in a slot.
    Buffer(Arc<Buffer>),
}
