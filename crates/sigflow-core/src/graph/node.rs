//! The node contract and the per-render input view.
//!
//! Every processing unit implements [`Node`]. A node declares its named inputs
//! ([`InputSpec`]), its output channel count, and renders one block at a time
//! into a [`Buffer`] it does not own. The graph hands it an [`Inputs`] view
//! that resolves each input to a constant or to another node's last-rendered
//! output.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, sync::Arc};
#[cfg(feature = "std")]
use std::sync::Arc;

use crate::buffer::Buffer;

/// Unique identifier for a node in a graph.
///
/// Node IDs are assigned sequentially and never reused within a graph
/// instance. Insertion order is ID order, which the scheduler uses to break
/// ties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Wraps a raw identifier, e.g. one read back from a patch file.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Hands out sequential [`NodeId`]s.
///
/// The graph owns one; a control thread that stages mutations for a graph it
/// cannot touch takes over allocation with
/// [`Graph::id_allocator`](super::Graph::id_allocator).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Returns the next ID and advances.
    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The ID the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }

    pub(crate) fn observe(&mut self, id: NodeId) {
        self.next = self.next.max(id.0 + 1);
    }
}

/// Declaration of one named input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    /// Input name, unique within the node.
    pub name: &'static str,
    /// Constant used when the input is never connected. `None` makes the
    /// input required.
    pub default: Option<f32>,
}

impl InputSpec {
    /// An input that must be connected before the graph compiles.
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    /// An input that falls back to `value` when unconnected.
    pub const fn with_default(name: &'static str, value: f32) -> Self {
        Self {
            name,
            default: Some(value),
        }
    }
}

/// Where a node input reads from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSource {
    /// The same value on every frame and channel.
    Constant(f32),
    /// Another node's most recent output.
    Node(NodeId),
}

/// Sample rate and block size a node renders at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum frames per render call.
    pub block_size: usize,
}

/// A resolved input for the current block.
#[derive(Debug, Clone, Copy)]
pub enum Signal<'a> {
    /// Unconnected input with no default.
    Silent,
    /// Constant value.
    Constant(f32),
    /// Rendered output of an upstream node.
    Buffer(&'a Buffer),
}

impl Signal<'_> {
    /// Value of channel 0 at `frame`.
    #[inline]
    pub fn value(&self, frame: usize) -> f32 {
        match self {
            Self::Silent => 0.0,
            Self::Constant(v) => *v,
            Self::Buffer(b) => b.sample(0, frame),
        }
    }

    /// Value of channel `ch` at `frame`.
    ///
    /// Channels wrap modulo the source's channel count, so a mono source
    /// feeds every channel.
    #[inline]
    pub fn sample(&self, ch: usize, frame: usize) -> f32 {
        match self {
            Self::Silent => 0.0,
            Self::Constant(v) => *v,
            Self::Buffer(b) => {
                let n = b.num_channels();
                if n == 0 { 0.0 } else { b.sample(ch % n, frame) }
            }
        }
    }

    /// Channel count of the source. Constants count as mono.
    pub fn num_channels(&self) -> usize {
        match self {
            Self::Silent | Self::Constant(_) => 1,
            Self::Buffer(b) => b.num_channels(),
        }
    }

    /// Returns the constant value, if this input is constant.
    pub fn as_constant(&self) -> Option<f32> {
        match self {
            Self::Constant(v) => Some(*v),
            _ => None,
        }
    }
}

/// Read-only view of a node's inputs for one render call.
///
/// Inputs are addressed by their position in [`Node::input_specs`].
pub struct Inputs<'a> {
    sources: &'a [Option<InputSource>],
    outputs: &'a [Buffer],
}

impl<'a> Inputs<'a> {
    /// Creates a view over `sources`, resolving node references into
    /// `outputs` (indexed by [`NodeId::index`]).
    pub fn new(sources: &'a [Option<InputSource>], outputs: &'a [Buffer]) -> Self {
        Self { sources, outputs }
    }

    /// Number of declared inputs.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if the node declares no inputs.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolves input `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Signal<'a> {
        match self.sources.get(index).copied().flatten() {
            Some(InputSource::Constant(v)) => Signal::Constant(v),
            Some(InputSource::Node(id)) => self
                .outputs
                .get(id.slot())
                .map_or(Signal::Silent, Signal::Buffer),
            None => Signal::Silent,
        }
    }
}

/// A processing unit in a signal graph.
///
/// Implementations render `num_frames` samples per output channel on each
/// call to [`process`](Self::process). The output buffer arrives zeroed and
/// already sized to the channel count the graph derived for this node.
///
/// `process` runs on the audio thread: no allocation, no locks, no I/O.
/// Allocation belongs in [`alloc`](Self::alloc), which runs before the node
/// is inserted into a graph.
pub trait Node {
    /// Kind name, as registered with the factory (e.g. `"granulator"`).
    fn kind(&self) -> &'static str;

    /// Named inputs, in the order [`Inputs::get`] indexes them.
    fn input_specs(&self) -> &'static [InputSpec];

    /// Named buffer slots this node can read source material from.
    fn buffer_slots(&self) -> &'static [&'static str] {
        &[]
    }

    /// Channel count this node expects on its primary input.
    fn num_input_channels(&self) -> usize {
        1
    }

    /// Output channel count when [`matches_input_channels`](Self::matches_input_channels)
    /// is false.
    fn num_output_channels(&self) -> usize {
        1
    }

    /// If true, the output takes the channel count of the first input.
    fn matches_input_channels(&self) -> bool {
        false
    }

    /// Pre-allocates internal state for the given render settings.
    fn alloc(&mut self, _ctx: &RenderContext) {}

    /// Renders one block.
    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize);

    /// Returns internal state to its initial condition.
    fn reset(&mut self) {}

    /// Attaches source material to buffer slot `slot` (an index into
    /// [`buffer_slots`](Self::buffer_slots)). Returns the buffer it replaced.
    fn set_buffer(&mut self, _slot: usize, _buffer: Arc<Buffer>) -> Option<Arc<Buffer>> {
        None
    }

    /// If true, this node's inputs are read one block late via
    /// [`capture`](Self::capture). Such nodes may close feedback loops.
    fn delays_inputs(&self) -> bool {
        false
    }

    /// Called after every node has rendered, for nodes that
    /// [`delays_inputs`](Self::delays_inputs).
    fn capture(&mut self, _inputs: &Inputs<'_>, _num_frames: usize) {}
}

/// Owned, sendable node trait object.
pub type BoxedNode = Box<dyn Node + Send>;

/// Latch that lets a degraded condition be reported once instead of on
/// every block.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarnOnce {
    fired: bool,
}

impl WarnOnce {
    /// Creates an armed latch.
    pub const fn new() -> Self {
        Self { fired: false }
    }

    /// Logs `message` for node kind `kind` the first time it is called.
    pub fn warn(&mut self, kind: &'static str, message: &str) {
        if self.fired {
            return;
        }
        self.fired = true;
        #[cfg(feature = "tracing")]
        tracing::warn!(node = kind, "{message}");
        #[cfg(not(feature = "tracing"))]
        let _ = (kind, message);
    }

    /// Returns true once [`warn`](Self::warn) has fired.
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Re-arms the latch after the condition clears.
    pub fn rearm(&mut self) {
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_allocator_sequential() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate(), NodeId(0));
        assert_eq!(ids.allocate(), NodeId(1));
        ids.observe(NodeId(7));
        assert_eq!(ids.peek(), NodeId(8));
        ids.observe(NodeId(2));
        assert_eq!(ids.allocate(), NodeId(8));
    }

    #[test]
    fn test_inputs_resolve() {
        let mut buf = Buffer::new(2, 4, 48000.0);
        buf.channel_mut(0)[1] = 0.25;
        buf.channel_mut(1)[1] = -0.25;
        let outputs = [buf];
        let sources = [
            Some(InputSource::Constant(3.0)),
            Some(InputSource::Node(NodeId(0))),
            None,
            Some(InputSource::Node(NodeId(9))),
        ];
        let inputs = Inputs::new(&sources, &outputs);

        assert_eq!(inputs.len(), 4);
        assert_eq!(inputs.get(0).value(2), 3.0);
        assert_eq!(inputs.get(0).sample(5, 0), 3.0);
        assert_eq!(inputs.get(1).value(1), 0.25);
        assert_eq!(inputs.get(1).sample(1, 1), -0.25);
        // Channel index wraps.
        assert_eq!(inputs.get(1).sample(3, 1), -0.25);
        assert_eq!(inputs.get(1).num_channels(), 2);
        assert!(matches!(inputs.get(2), Signal::Silent));
        assert!(matches!(inputs.get(3), Signal::Silent));
        assert!(matches!(inputs.get(10), Signal::Silent));
    }

    #[test]
    fn test_warn_once() {
        let mut latch = WarnOnce::new();
        assert!(!latch.has_fired());
        latch.warn("test", "first");
        latch.warn("test", "second");
        assert!(latch.has_fired());
        latch.rearm();
        assert!(!latch.has_fired());
    }
}
