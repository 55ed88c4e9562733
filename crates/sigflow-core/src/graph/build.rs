//! Building graph nodes from [`NodeSpec`] trees.
//!
//! Construction is split in two so it can run off the audio thread:
//! [`build_spec`] walks a tree, creates and wires [`NodeEntry`]s through a
//! [`NodeFactory`], and reports every construction error; inserting the
//! result into a [`Graph`] is then infallible bookkeeping.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::{collections::BTreeMap, sync::Arc};

use crate::buffer::Buffer;
use crate::error::GraphError;
use crate::node_spec::{CONSTANT_KIND, NodeSpec};

use super::node::{BoxedNode, IdAllocator, InputSource, NodeId, RenderContext};
use super::processing::{Graph, NodeEntry};

/// What a factory sees when asked to build a node.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Render settings of the target graph.
    pub render: RenderContext,
    /// The node spec being built.
    pub spec: &'a NodeSpec,
}

impl BuildContext<'_> {
    /// Sample rate of the target graph.
    pub fn sample_rate(&self) -> f32 {
        self.render.sample_rate
    }

    /// Block size of the target graph.
    pub fn block_size(&self) -> usize {
        self.render.block_size
    }

    /// The node spec's constant value, if any.
    pub fn value(&self) -> Option<f32> {
        self.spec.value()
    }

    /// A string option from the node spec.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.spec.option(key)
    }

    /// A numeric option from the node spec, or `default` if missing or malformed.
    pub fn option_f32(&self, key: &str, default: f32) -> f32 {
        self.option(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Creates nodes by kind name.
pub trait NodeFactory {
    /// Builds a node of kind `kind`, or `None` if the kind is unknown.
    fn create(&self, kind: &str, ctx: &BuildContext<'_>) -> Option<BoxedNode>;
}

/// Named, shared sample assets.
#[derive(Debug, Clone, Default)]
pub struct BufferBank {
    buffers: BTreeMap<String, Arc<Buffer>>,
}

impl BufferBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `buffer` under `name`, returning any buffer it replaced.
    pub fn insert(&mut self, name: impl Into<String>, buffer: Buffer) -> Option<Arc<Buffer>> {
        self.buffers.insert(name.into(), Arc::new(buffer))
    }

    /// Registers an already shared buffer.
    pub fn insert_shared(
        &mut self,
        name: impl Into<String>,
        buffer: Arc<Buffer>,
    ) -> Option<Arc<Buffer>> {
        self.buffers.insert(name.into(), buffer)
    }

    /// Looks up a buffer by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Buffer>> {
        self.buffers.get(name)
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }

    /// Number of registered buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no buffers are registered.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Nodes built from one spec tree, children before parents.
pub struct BuiltSpec {
    /// ID of the tree's root node.
    pub root: NodeId,
    /// Entries to insert, in an order where every input already exists.
    pub entries: Vec<(NodeId, NodeEntry)>,
}

/// Builds every node in `spec`, allocating IDs from `ids`.
///
/// A constant root becomes a node of kind [`CONSTANT_KIND`]; constant
/// children become constant inputs.
///
/// # Errors
///
/// Unknown node kinds, input names, buffer slots, or buffer assets.
pub fn build_spec(
    spec: &NodeSpec,
    ctx: &RenderContext,
    factory: &dyn NodeFactory,
    bank: &BufferBank,
    ids: &mut IdAllocator,
) -> Result<BuiltSpec, GraphError> {
    let mut entries = Vec::with_capacity(spec.node_count().max(1));
    let root = build_node(spec, ctx, factory, bank, ids, &mut entries)?;
    Ok(BuiltSpec { root, entries })
}

fn build_node(
    spec: &NodeSpec,
    ctx: &RenderContext,
    factory: &dyn NodeFactory,
    bank: &BufferBank,
    ids: &mut IdAllocator,
    entries: &mut Vec<(NodeId, NodeEntry)>,
) -> Result<NodeId, GraphError> {
    let kind = if spec.is_constant() {
        CONSTANT_KIND
    } else {
        spec.name()
    };
    let build_ctx = BuildContext { render: *ctx, spec };
    let node = factory
        .create(kind, &build_ctx)
        .ok_or_else(|| GraphError::UnknownNodeKind(kind.into()))?;
    let id = ids.allocate();
    let mut entry = NodeEntry::new(node, ctx);

    for (name, child) in spec.inputs() {
        let index = entry
            .input_index(name)
            .ok_or_else(|| GraphError::UnknownInput {
                node: id,
                input: name.into(),
            })?;
        let source = match child.value() {
            Some(v) => InputSource::Constant(v),
            None => InputSource::Node(build_node(child, ctx, factory, bank, ids, entries)?),
        };
        entry.set_input_at(index, source);
    }

    for (slot, asset) in spec.buffers() {
        let buffer = bank
            .get(asset)
            .ok_or_else(|| GraphError::UnknownBuffer(asset.into()))?;
        if !entry.attach_buffer(slot, Arc::clone(buffer)) {
            return Err(GraphError::UnknownBufferSlot {
                node: id,
                slot: slot.into(),
            });
        }
    }

    entries.push((id, entry));
    Ok(id)
}

impl Graph {
    /// Builds a [`NodeSpec`] tree into this graph and returns the root's ID.
    ///
    /// On error nothing is added.
    pub fn instantiate(
        &mut self,
        spec: &NodeSpec,
        factory: &dyn NodeFactory,
        bank: &BufferBank,
    ) -> Result<NodeId, GraphError> {
        let mut ids = self.id_allocator();
        let first = ids.peek();
        let built = build_spec(spec, &self.context(), factory, bank, &mut ids)?;
        for (id, entry) in built.entries {
            if let Err(e) = self.insert_node(id, entry) {
                self.discard_from(first);
                return Err(e);
            }
        }
        Ok(built.root)
    }

    /// [`instantiate`](Self::instantiate)s a tree and marks its root as an output.
    pub fn add_output_spec(
        &mut self,
        spec: &NodeSpec,
        factory: &dyn NodeFactory,
        bank: &BufferBank,
    ) -> Result<NodeId, GraphError> {
        let id = self.instantiate(spec, factory, bank)?;
        self.add_output(id)?;
        Ok(id)
    }
}
