//! Signal graph: mutation API, compilation, and block rendering.
//!
//! [`Graph`] owns its nodes and their output buffers. Mutations (add, wire,
//! remove) invalidate the compiled schedule; [`Graph::compile`] validates the
//! topology and fixes the render order; [`Graph::render`] runs that order once
//! per block and mixes the designated output nodes into one buffer.
//!
//! Rendering never fails. An uncompiled graph renders silence and logs once.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use crate::buffer::Buffer;
use crate::error::GraphError;

use super::node::{
    BoxedNode, IdAllocator, InputSource, Inputs, Node, NodeId, RenderContext, WarnOnce,
};
use super::schedule::{CompileScratch, CompiledSchedule};

/// Render settings fixed at graph construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum frames per [`Graph::render`] call.
    pub block_size: usize,
    /// Channel count of the mixed output.
    pub output_channels: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 256,
            output_channels: 2,
        }
    }
}

impl GraphConfig {
    /// Checks block size, sample rate, and channel count.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.block_size == 0 {
            return Err(GraphError::InvalidBlockSize(self.block_size));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(GraphError::InvalidSampleRate(self.sample_rate));
        }
        if self.output_channels == 0 {
            return Err(GraphError::InvalidChannelCount(self.output_channels));
        }
        Ok(())
    }

    /// The [`RenderContext`] nodes are allocated for.
    pub fn context(&self) -> RenderContext {
        RenderContext {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
        }
    }
}

/// A node prepared for insertion: allocated, with its input table and output
/// buffer sized.
///
/// Building an entry allocates, so a control thread can prepare entries and
/// hand them to the audio thread for [`Graph::insert_node`].
pub struct NodeEntry {
    node: BoxedNode,
    inputs: Vec<Option<InputSource>>,
    output: Buffer,
}

impl NodeEntry {
    /// Allocates `node` for `ctx` and seeds unconnected inputs with their
    /// declared defaults.
    pub fn new(mut node: BoxedNode, ctx: &RenderContext) -> Self {
        node.alloc(ctx);
        let inputs = node
            .input_specs()
            .iter()
            .map(|spec| spec.default.map(InputSource::Constant))
            .collect();
        let output = Buffer::new(
            node.num_output_channels(),
            ctx.block_size,
            ctx.sample_rate,
        );
        Self {
            node,
            inputs,
            output,
        }
    }

    /// The wrapped node.
    pub fn node(&self) -> &(dyn Node + Send) {
        self.node.as_ref()
    }

    /// Current input table, indexed like [`Node::input_specs`].
    pub fn inputs(&self) -> &[Option<InputSource>] {
        &self.inputs
    }

    /// Position of input `name`, if declared.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.node.input_specs().iter().position(|s| s.name == name)
    }

    /// Sets input `index`. Out-of-range indices are ignored.
    pub fn set_input_at(&mut self, index: usize, source: InputSource) {
        if let Some(slot) = self.inputs.get_mut(index) {
            *slot = Some(source);
        }
    }

    /// Attaches a buffer to slot `name`. Returns false if the slot is unknown.
    pub fn attach_buffer(&mut self, name: &str, buffer: Arc<Buffer>) -> bool {
        match self.node.buffer_slots().iter().position(|s| *s == name) {
            Some(index) => {
                self.node.set_buffer(index, buffer);
                true
            }
            None => false,
        }
    }

    /// Unwraps the node, dropping the output buffer.
    pub fn into_node(self) -> BoxedNode {
        self.node
    }
}

struct Slot {
    node: BoxedNode,
    inputs: Vec<Option<InputSource>>,
}

/// Directed acyclic graph of nodes, rendered block by block.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add nodes: [`add_node()`](Self::add_node) or build a whole
///    [`NodeSpec`](crate::NodeSpec) tree with [`instantiate()`](Self::instantiate)
/// 3. Wire inputs: [`set_input()`](Self::set_input)
/// 4. Mark outputs: [`add_output()`](Self::add_output)
/// 5. Compile: [`compile()`](Self::compile)
/// 6. Render: [`render()`](Self::render)
pub struct Graph {
    config: GraphConfig,
    nodes: Vec<Option<Slot>>,
    buffers: Vec<Buffer>,
    channels: Vec<usize>,
    outputs: Vec<NodeId>,
    ids: IdAllocator,
    schedule: CompiledSchedule,
    compiled: bool,
    scratch: CompileScratch,
    mix: Buffer,
    uncompiled_warning: WarnOnce,
}

impl Graph {
    /// Creates an empty graph.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero block size, a non-positive sample rate, or
    /// zero output channels.
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        config.validate()?;
        Ok(Self {
            config,
            nodes: Vec::new(),
            buffers: Vec::new(),
            channels: Vec::new(),
            outputs: Vec::new(),
            ids: IdAllocator::default(),
            schedule: CompiledSchedule::default(),
            compiled: false,
            scratch: CompileScratch::default(),
            mix: Buffer::new(
                config.output_channels,
                config.block_size,
                config.sample_rate,
            ),
            uncompiled_warning: WarnOnce::new(),
        })
    }

    // --- Accessors ---

    /// Render settings.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Maximum frames per render.
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Render context handed to nodes on insertion.
    pub fn context(&self) -> RenderContext {
        self.config.context()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.slot()), Some(Some(_)))
    }

    /// Returns a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&(dyn Node + Send)> {
        let slot = self.nodes.get(id.slot())?.as_ref()?;
        Some(slot.node.as_ref())
    }

    /// Returns a mutable reference to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn Node + Send)> {
        let slot = self.nodes.get_mut(id.slot())?.as_mut()?;
        Some(slot.node.as_mut())
    }

    /// Where input `name` of node `id` currently reads from.
    pub fn input_source(&self, id: NodeId, name: &str) -> Option<InputSource> {
        let slot = self.nodes.get(id.slot())?.as_ref()?;
        let index = slot.node.input_specs().iter().position(|s| s.name == name)?;
        slot.inputs[index]
    }

    /// The most recent output of node `id`.
    pub fn node_output(&self, id: NodeId) -> Option<&Buffer> {
        if self.contains(id) {
            self.buffers.get(id.slot())
        } else {
            None
        }
    }

    /// Nodes mixed into the graph output, in the order they were added.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Returns true if the schedule is current.
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// The compiled schedule, if current.
    pub fn schedule(&self) -> Option<&CompiledSchedule> {
        self.compiled.then_some(&self.schedule)
    }

    /// Node IDs in render order. Empty when not compiled.
    pub fn render_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        let order: &[usize] = if self.compiled {
            &self.schedule.order
        } else {
            &[]
        };
        order.iter().map(|&slot| NodeId(slot as u32))
    }

    /// Copy of the ID allocator, for a control thread that will stage
    /// insertions for this graph.
    pub fn id_allocator(&self) -> IdAllocator {
        self.ids
    }

    /// Reserves room for `additional` more node slots, so inserting that
    /// many nodes and recompiling does not reallocate.
    pub fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional);
        self.buffers.reserve(additional);
        self.channels.reserve(additional);
        let total = self.nodes.len() + additional;
        self.schedule.order.reserve(total);
        self.schedule.delayed.reserve(total);
        self.scratch.reserve(total);
    }

    // --- Node mutations ---

    /// Adds a node and returns its ID.
    pub fn add_node(&mut self, node: BoxedNode) -> NodeId {
        let entry = NodeEntry::new(node, &self.config.context());
        let id = self.ids.allocate();
        self.place(id, entry);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: node {id}");
        id
    }

    /// Inserts a prepared entry under an ID chosen by the caller.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] if the ID is taken, or
    /// [`GraphError::NodeNotFound`] if the entry reads from a missing node.
    pub fn insert_node(&mut self, id: NodeId, entry: NodeEntry) -> Result<(), GraphError> {
        if self.contains(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        for source in entry.inputs.iter().flatten() {
            if let InputSource::Node(src) = *source
                && src != id
                && !self.contains(src)
            {
                return Err(GraphError::NodeNotFound(src));
            }
        }
        self.ids.observe(id);
        self.place(id, entry);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_insert: node {id}");
        Ok(())
    }

    /// Removes a node and returns it so the caller decides where it is dropped.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeInUse`] if another node reads from it or it is a
    /// graph output.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeEntry, GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        if self.outputs.contains(&id) || self.is_read_by_other(id) {
            return Err(GraphError::NodeInUse(id));
        }
        let slot = self.nodes[id.slot()]
            .take()
            .ok_or(GraphError::NodeNotFound(id))?;
        let output = core::mem::take(&mut self.buffers[id.slot()]);
        self.compiled = false;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");
        Ok(NodeEntry {
            node: slot.node,
            inputs: slot.inputs,
            output,
        })
    }

    /// Connects input `name` of node `id` to `source`.
    ///
    /// # Errors
    ///
    /// Fails if either node is missing, the input name is unknown, or the
    /// connection would close a cycle that does not pass through a node that
    /// [delays its inputs](Node::delays_inputs).
    pub fn set_input(
        &mut self,
        id: NodeId,
        name: &str,
        source: InputSource,
    ) -> Result<(), GraphError> {
        let slot = self
            .nodes
            .get(id.slot())
            .and_then(|n| n.as_ref())
            .ok_or(GraphError::NodeNotFound(id))?;
        let index = slot
            .node
            .input_specs()
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| GraphError::UnknownInput {
                node: id,
                input: name.into(),
            })?;
        let delays = slot.node.delays_inputs();

        if let InputSource::Node(src) = source {
            if !self.contains(src) {
                return Err(GraphError::NodeNotFound(src));
            }
            if !delays && self.reads_from(src, id) {
                return Err(GraphError::CycleDetected);
            }
        }

        if let Some(Some(slot)) = self.nodes.get_mut(id.slot()) {
            slot.inputs[index] = Some(source);
        }
        self.compiled = false;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {id}.{name} <- {source:?}");
        Ok(())
    }

    /// Attaches a shared buffer to buffer slot `slot` of node `id`.
    ///
    /// Returns the buffer previously attached, if any. The schedule stays
    /// valid unless the new buffer changes the node's output channel count.
    pub fn set_buffer(
        &mut self,
        id: NodeId,
        slot: &str,
        buffer: Arc<Buffer>,
    ) -> Result<Option<Arc<Buffer>>, GraphError> {
        let entry = self
            .nodes
            .get_mut(id.slot())
            .and_then(|n| n.as_mut())
            .ok_or(GraphError::NodeNotFound(id))?;
        let index = entry
            .node
            .buffer_slots()
            .iter()
            .position(|s| *s == slot)
            .ok_or_else(|| GraphError::UnknownBufferSlot {
                node: id,
                slot: slot.into(),
            })?;
        let channels = entry.node.num_output_channels();
        let previous = entry.node.set_buffer(index, buffer);
        if entry.node.num_output_channels() != channels {
            self.compiled = false;
        }
        Ok(previous)
    }

    /// Marks a node as a graph output. Adding the same node twice is a no-op.
    pub fn add_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
            self.compiled = false;
        }
        Ok(())
    }

    /// Stops mixing a node into the graph output.
    pub fn remove_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        let pos = self
            .outputs
            .iter()
            .position(|&o| o == id)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.outputs.remove(pos);
        self.compiled = false;
        Ok(())
    }

    // --- Compilation ---

    /// Computes the render order for every node reachable from an output.
    ///
    /// Order is topological over "reads from"; among nodes that are ready at
    /// the same time the one inserted first renders first. Inputs of nodes
    /// that [delay their inputs](Node::delays_inputs) do not constrain the
    /// order. Output buffers are sized for the derived channel counts here so
    /// rendering does not allocate.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnresolvedInput`] if a reachable node has a required
    /// input that was never connected.
    pub fn compile(&mut self) -> Result<(), GraphError> {
        self.compiled = false;
        self.schedule.clear();
        let n = self.nodes.len();
        self.scratch.reset(n);

        // Reachability from the outputs, following every input.
        for &out in &self.outputs {
            self.scratch.stack.push(out.slot());
        }
        let mut reachable_count = 0;
        while let Some(idx) = self.scratch.stack.pop() {
            if idx >= n || self.scratch.reachable[idx] {
                continue;
            }
            let Some(slot) = self.nodes[idx].as_ref() else {
                continue;
            };
            self.scratch.reachable[idx] = true;
            reachable_count += 1;
            for (k, source) in slot.inputs.iter().enumerate() {
                match source {
                    None => {
                        return Err(GraphError::UnresolvedInput {
                            node: NodeId(idx as u32),
                            input: slot.node.input_specs()[k].name,
                        });
                    }
                    Some(InputSource::Node(src)) => self.scratch.stack.push(src.slot()),
                    Some(InputSource::Constant(_)) => {}
                }
            }
        }

        // In-degrees over ordering edges.
        for idx in 0..n {
            if !self.scratch.reachable[idx] {
                continue;
            }
            let Some(slot) = self.nodes[idx].as_ref() else {
                continue;
            };
            if slot.node.delays_inputs() {
                self.schedule.delayed.push(idx);
                continue;
            }
            let degree = slot
                .inputs
                .iter()
                .filter(|s| matches!(s, Some(InputSource::Node(_))))
                .count();
            self.scratch.in_degree[idx] = degree as u32;
        }

        // Kahn's algorithm, always taking the earliest-inserted ready node.
        for idx in 0..n {
            if self.scratch.reachable[idx] && self.scratch.in_degree[idx] == 0 {
                self.scratch.ready.push(idx);
            }
        }
        while let Some(pos) = min_position(&self.scratch.ready) {
            let idx = self.scratch.ready.swap_remove(pos);
            self.schedule.order.push(idx);
            for j in 0..n {
                if !self.scratch.reachable[j] {
                    continue;
                }
                let Some(dependent) = self.nodes[j].as_ref() else {
                    continue;
                };
                if dependent.node.delays_inputs() {
                    continue;
                }
                for source in &dependent.inputs {
                    if *source == Some(InputSource::Node(NodeId(idx as u32))) {
                        self.scratch.in_degree[j] -= 1;
                        if self.scratch.in_degree[j] == 0 {
                            self.scratch.ready.push(j);
                        }
                    }
                }
            }
        }

        if self.schedule.order.len() != reachable_count {
            self.schedule.clear();
            return Err(GraphError::CycleDetected);
        }

        // Channel counts, derived in render order.
        for &idx in &self.schedule.order {
            if let Some(slot) = self.nodes[idx].as_ref() {
                self.channels[idx] = slot.node.num_output_channels();
            }
        }
        for k in 0..self.schedule.order.len() {
            let idx = self.schedule.order[k];
            let Some(slot) = self.nodes[idx].as_ref() else {
                continue;
            };
            if slot.node.matches_input_channels() {
                self.channels[idx] = match slot.inputs.first().copied().flatten() {
                    Some(InputSource::Node(src)) => self.channels[src.slot()],
                    _ => 1,
                };
            }
            let ch = self.channels[idx];
            self.buffers[idx].resize(ch, self.config.block_size);
        }

        self.compiled = true;
        self.uncompiled_warning.rearm();
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_compile: {} nodes in order {:?}, {} feedback",
            self.schedule.order.len(),
            self.schedule.order,
            self.schedule.delayed.len()
        );
        Ok(())
    }

    // --- Rendering ---

    /// Renders `num_frames` frames (clamped to the block size) and returns the
    /// mixed output.
    ///
    /// Each output node is added into the mix: a mono node feeds every output
    /// channel, otherwise channel `c` feeds channel `c`.
    pub fn render(&mut self, num_frames: usize) -> &Buffer {
        let frames = num_frames.min(self.config.block_size);
        self.mix.resize(self.config.output_channels, frames);
        self.mix.clear();

        if !self.compiled {
            self.uncompiled_warning
                .warn("graph", "render called on an uncompiled graph; output is silent");
            return &self.mix;
        }

        for k in 0..self.schedule.order.len() {
            let idx = self.schedule.order[k];
            let mut out = core::mem::take(&mut self.buffers[idx]);
            out.resize(self.channels[idx], frames);
            out.clear();
            if let Some(slot) = self.nodes[idx].as_mut() {
                let inputs = Inputs::new(&slot.inputs, &self.buffers);
                slot.node.process(&inputs, &mut out, frames);
            }
            self.buffers[idx] = out;
        }

        for k in 0..self.schedule.delayed.len() {
            let idx = self.schedule.delayed[k];
            if let Some(slot) = self.nodes[idx].as_mut() {
                let inputs = Inputs::new(&slot.inputs, &self.buffers);
                slot.node.capture(&inputs, frames);
            }
        }

        for &id in &self.outputs {
            if let Some(buf) = self.buffers.get(id.slot()) {
                self.mix.accumulate_from(buf);
            }
        }
        &self.mix
    }

    /// Renders enough blocks to fill an interleaved slice of `channels`
    /// channels.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let total = out.len() / channels;
        let mut done = 0;
        while done < total {
            let frames = (total - done).min(self.config.block_size);
            let start = done * channels;
            let block = self.render(frames);
            block.write_interleaved(&mut out[start..start + frames * channels], channels);
            done += frames;
        }
    }

    /// Resets every node and clears all output buffers.
    pub fn reset(&mut self) {
        for slot in self.nodes.iter_mut().flatten() {
            slot.node.reset();
        }
        for buf in &mut self.buffers {
            buf.clear();
        }
        self.mix.clear();
    }

    // --- Internal helpers ---

    fn place(&mut self, id: NodeId, entry: NodeEntry) {
        let idx = id.slot();
        if idx >= self.nodes.len() {
            self.nodes.resize_with(idx + 1, || None);
            self.buffers.resize_with(idx + 1, Buffer::default);
            self.channels.resize(idx + 1, 0);
        }
        self.channels[idx] = entry.node.num_output_channels();
        self.buffers[idx] = entry.output;
        self.nodes[idx] = Some(Slot {
            node: entry.node,
            inputs: entry.inputs,
        });
        self.compiled = false;
    }

    /// Drops every node with an ID at or above `first`.
    pub(crate) fn discard_from(&mut self, first: NodeId) {
        for idx in first.slot()..self.nodes.len() {
            self.nodes[idx] = None;
            self.buffers[idx] = Buffer::default();
        }
        self.outputs.retain(|o| o.slot() < first.slot());
        self.compiled = false;
    }

    /// DFS over "reads from": does `start` (transitively) read from `target`?
    ///
    /// Nodes that delay their inputs end a path. Runs in the compile scratch,
    /// and each slot is pushed at most once, so a graph sized with
    /// [`reserve`](Self::reserve) does not allocate here.
    fn reads_from(&mut self, start: NodeId, target: NodeId) -> bool {
        if start == target {
            return true;
        }
        let n = self.nodes.len();
        let visited = &mut self.scratch.reachable;
        let stack = &mut self.scratch.stack;
        visited.clear();
        visited.resize(n, false);
        stack.clear();
        if start.slot() < n {
            visited[start.slot()] = true;
            stack.push(start.slot());
        }

        while let Some(idx) = stack.pop() {
            let Some(Some(slot)) = self.nodes.get(idx) else {
                continue;
            };
            if slot.node.delays_inputs() {
                continue;
            }
            for source in slot.inputs.iter().flatten() {
                if let InputSource::Node(src) = *source {
                    if src == target {
                        return true;
                    }
                    let s = src.slot();
                    if s < n && !visited[s] {
                        visited[s] = true;
                        stack.push(s);
                    }
                }
            }
        }
        false
    }

    fn is_read_by_other(&self, id: NodeId) -> bool {
        self.nodes.iter().enumerate().any(|(idx, slot)| {
            idx != id.slot()
                && slot.as_ref().is_some_and(|s| {
                    s.inputs
                        .iter()
                        .any(|src| *src == Some(InputSource::Node(id)))
                })
        })
    }
}

fn min_position(ready: &[usize]) -> Option<usize> {
    ready
        .iter()
        .enumerate()
        .min_by_key(|&(_, &idx)| idx)
        .map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::InputSpec;
    use std::sync::Mutex;

    static ORDER_LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    /// Emits a constant value on every channel.
    struct Value(f32);

    impl Node for Value {
        fn kind(&self) -> &'static str {
            "value"
        }
        fn input_specs(&self) -> &'static [InputSpec] {
            &[]
        }
        fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
            for ch in 0..output.num_channels() {
                output.channel_mut(ch)[..num_frames].fill(self.0);
            }
        }
    }

    /// Adds `offset` to its required input, logging its name when it runs.
    struct AddOffset {
        name: &'static str,
        offset: f32,
    }

    const ADD_INPUTS: &[InputSpec] = &[InputSpec::required("in")];

    impl Node for AddOffset {
        fn kind(&self) -> &'static str {
            "add"
        }
        fn input_specs(&self) -> &'static [InputSpec] {
            ADD_INPUTS
        }
        fn matches_input_channels(&self) -> bool {
            true
        }
        fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
            ORDER_LOG.lock().unwrap().push(self.name);
            let input = inputs.get(0);
            for ch in 0..output.num_channels() {
                for f in 0..num_frames {
                    output.channel_mut(ch)[f] = input.sample(ch, f) + self.offset;
                }
            }
        }
    }

    /// Emits its input from the previous block.
    struct OneBlockDelay {
        held: Vec<f32>,
    }

    const DELAY_INPUTS: &[InputSpec] = &[InputSpec::with_default("in", 0.0)];

    impl Node for OneBlockDelay {
        fn kind(&self) -> &'static str {
            "feedback"
        }
        fn input_specs(&self) -> &'static [InputSpec] {
            DELAY_INPUTS
        }
        fn alloc(&mut self, ctx: &RenderContext) {
            self.held = vec![0.0; ctx.block_size];
        }
        fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
            output.channel_mut(0)[..num_frames].copy_from_slice(&self.held[..num_frames]);
        }
        fn delays_inputs(&self) -> bool {
            true
        }
        fn capture(&mut self, inputs: &Inputs<'_>, num_frames: usize) {
            let input = inputs.get(0);
            for f in 0..num_frames {
                self.held[f] = input.value(f);
            }
        }
    }

    fn graph(block_size: usize) -> Graph {
        Graph::new(GraphConfig {
            sample_rate: 48000.0,
            block_size,
            output_channels: 2,
        })
        .unwrap()
    }

    fn add(name: &'static str, offset: f32) -> BoxedNode {
        Box::new(AddOffset { name, offset })
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_block = GraphConfig {
            block_size: 0,
            ..GraphConfig::default()
        };
        assert_eq!(
            Graph::new(zero_block).err(),
            Some(GraphError::InvalidBlockSize(0))
        );
        let bad_rate = GraphConfig {
            sample_rate: 0.0,
            ..GraphConfig::default()
        };
        assert!(matches!(
            Graph::new(bad_rate),
            Err(GraphError::InvalidSampleRate(_))
        ));
        let no_channels = GraphConfig {
            output_channels: 0,
            ..GraphConfig::default()
        };
        assert!(matches!(
            Graph::new(no_channels),
            Err(GraphError::InvalidChannelCount(0))
        ));
    }

    #[test]
    fn test_chain_renders_in_dependency_order() {
        let mut g = graph(16);
        // Insert out of order: C first, then B, then A.
        let c = g.add_node(add("chain-C", 100.0));
        let b = g.add_node(add("chain-B", 10.0));
        let a = g.add_node(Box::new(Value(1.0)));
        g.set_input(b, "in", InputSource::Node(a)).unwrap();
        g.set_input(c, "in", InputSource::Node(b)).unwrap();
        g.add_output(c).unwrap();
        g.compile().unwrap();

        let order: Vec<NodeId> = g.render_order().collect();
        assert_eq!(order, vec![a, b, c]);

        let out = g.render(16);
        assert_eq!(out.channel(0)[0], 111.0);
        assert_eq!(out.channel(1)[15], 111.0);
        let log: Vec<&str> = ORDER_LOG
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|name| name.starts_with("chain-"))
            .collect();
        assert_eq!(log, vec!["chain-B", "chain-C"]);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let mut g = graph(8);
        let x = g.add_node(Box::new(Value(1.0)));
        let y = g.add_node(Box::new(Value(2.0)));
        let sum_x = g.add_node(add("sx", 0.0));
        let sum_y = g.add_node(add("sy", 0.0));
        g.set_input(sum_y, "in", InputSource::Node(y)).unwrap();
        g.set_input(sum_x, "in", InputSource::Node(x)).unwrap();
        g.add_output(sum_y).unwrap();
        g.add_output(sum_x).unwrap();
        g.compile().unwrap();
        let order: Vec<NodeId> = g.render_order().collect();
        assert_eq!(order, vec![x, y, sum_x, sum_y]);
        assert_eq!(g.render(8).channel(0)[3], 3.0);
    }

    #[test]
    fn test_unresolved_input_is_construction_error() {
        let mut g = graph(8);
        let b = g.add_node(add("B", 0.0));
        g.add_output(b).unwrap();
        assert_eq!(
            g.compile(),
            Err(GraphError::UnresolvedInput {
                node: b,
                input: "in"
            })
        );
        assert!(!g.is_compiled());
    }

    #[test]
    fn test_unknown_input_rejected() {
        let mut g = graph(8);
        let b = g.add_node(add("B", 0.0));
        let err = g
            .set_input(b, "nope", InputSource::Constant(1.0))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownInput { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut g = graph(8);
        let a = g.add_node(add("A", 0.0));
        let b = g.add_node(add("B", 0.0));
        g.set_input(b, "in", InputSource::Node(a)).unwrap();
        assert_eq!(
            g.set_input(a, "in", InputSource::Node(b)),
            Err(GraphError::CycleDetected)
        );
        assert_eq!(
            g.set_input(a, "in", InputSource::Node(a)),
            Err(GraphError::CycleDetected)
        );
    }

    #[test]
    fn test_feedback_through_delay_node() {
        let mut g = graph(4);
        let fb = g.add_node(Box::new(OneBlockDelay { held: Vec::new() }));
        let acc = g.add_node(add("acc", 1.0));
        g.set_input(acc, "in", InputSource::Node(fb)).unwrap();
        g.set_input(fb, "in", InputSource::Node(acc)).unwrap();
        g.add_output(acc).unwrap();
        g.compile().unwrap();
        assert_eq!(g.schedule().unwrap().feedback_count(), 1);

        // Each block adds one to what the previous block produced.
        for expected in 1..=4 {
            let out = g.render(4);
            assert_eq!(out.channel(0)[0], expected as f32);
        }
    }

    #[test]
    fn test_render_uncompiled_is_silent() {
        let mut g = graph(8);
        let a = g.add_node(Box::new(Value(1.0)));
        g.add_output(a).unwrap();
        let out = g.render(8);
        assert_eq!(out.num_frames(), 8);
        assert!(out.channels().all(|c| c.iter().all(|&s| s == 0.0)));

        g.compile().unwrap();
        assert_eq!(g.render(8).channel(1)[7], 1.0);

        // Any mutation invalidates the schedule.
        let b = g.add_node(Box::new(Value(2.0)));
        assert!(!g.is_compiled());
        assert_eq!(g.render(8).channel(0)[0], 0.0);
        g.add_output(b).unwrap();
        g.compile().unwrap();
        assert_eq!(g.render(8).channel(0)[0], 3.0);
    }

    #[test]
    fn test_unreachable_nodes_not_rendered() {
        let mut g = graph(8);
        let a = g.add_node(Box::new(Value(1.0)));
        let _orphan = g.add_node(add("orphan", 0.0));
        g.add_output(a).unwrap();
        // The orphan's unresolved input does not matter: it is never rendered.
        g.compile().unwrap();
        assert_eq!(g.render_order().count(), 1);
    }

    #[test]
    fn test_remove_node_in_use() {
        let mut g = graph(8);
        let a = g.add_node(Box::new(Value(1.0)));
        let b = g.add_node(add("B", 0.0));
        g.set_input(b, "in", InputSource::Node(a)).unwrap();
        g.add_output(b).unwrap();

        assert_eq!(g.remove_node(a).err(), Some(GraphError::NodeInUse(a)));
        assert_eq!(g.remove_node(b).err(), Some(GraphError::NodeInUse(b)));

        g.remove_output(b).unwrap();
        let entry = g.remove_node(b).unwrap();
        assert_eq!(entry.node().kind(), "add");
        g.remove_node(a).unwrap();
        assert_eq!(g.node_count(), 0);
        assert_eq!(
            g.remove_node(a).err(),
            Some(GraphError::NodeNotFound(a))
        );
    }

    #[test]
    fn test_ids_never_reused() {
        let mut g = graph(8);
        let a = g.add_node(Box::new(Value(1.0)));
        g.remove_node(a).unwrap();
        let b = g.add_node(Box::new(Value(1.0)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_insert_node_with_chosen_id() {
        let mut g = graph(8);
        let ctx = g.context();
        let id = NodeId::from_raw(5);
        g.insert_node(id, NodeEntry::new(Box::new(Value(0.5)), &ctx))
            .unwrap();
        assert_eq!(
            g.insert_node(id, NodeEntry::new(Box::new(Value(0.5)), &ctx)),
            Err(GraphError::DuplicateNode(id))
        );
        assert_eq!(g.id_allocator().peek(), NodeId::from_raw(6));

        let mut dangling = NodeEntry::new(add("x", 0.0), &ctx);
        dangling.set_input_at(0, InputSource::Node(NodeId::from_raw(42)));
        assert_eq!(
            g.insert_node(NodeId::from_raw(6), dangling),
            Err(GraphError::NodeNotFound(NodeId::from_raw(42)))
        );
    }

    #[test]
    fn test_matches_input_channels_follows_source() {
        struct Stereo;
        impl Node for Stereo {
            fn kind(&self) -> &'static str {
                "stereo"
            }
            fn input_specs(&self) -> &'static [InputSpec] {
                &[]
            }
            fn num_output_channels(&self) -> usize {
                2
            }
            fn process(&mut self, _: &Inputs<'_>, output: &mut Buffer, n: usize) {
                output.channel_mut(0)[..n].fill(1.0);
                output.channel_mut(1)[..n].fill(-1.0);
            }
        }

        let mut g = graph(4);
        let s = g.add_node(Box::new(Stereo));
        let follow = g.add_node(add("f", 0.5));
        g.set_input(follow, "in", InputSource::Node(s)).unwrap();
        g.add_output(follow).unwrap();
        g.compile().unwrap();
        let out = g.render(4);
        assert_eq!(out.channel(0)[0], 1.5);
        assert_eq!(out.channel(1)[0], -0.5);
        assert_eq!(g.node_output(follow).unwrap().num_channels(), 2);
    }

    #[test]
    fn test_render_clamps_and_interleaves() {
        let mut g = graph(4);
        let a = g.add_node(Box::new(Value(0.25)));
        g.add_output(a).unwrap();
        g.compile().unwrap();
        assert_eq!(g.render(100).num_frames(), 4);

        let mut out = vec![0.0; 2 * 10];
        g.render_interleaved(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.25));
    }
}
