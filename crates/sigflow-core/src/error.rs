//! Error types for graph construction and ring buffer access.
//!
//! Both types are plain enums so the crate stays `no_std`; `Display` and
//! `std::error::Error` are provided when the `std` feature is enabled.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use crate::graph::NodeId;

/// Errors that can occur while building or mutating a graph.
///
/// These are construction-time errors. Rendering never fails; a graph that
/// cannot render produces silence instead.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The specified node was not found in the graph.
    NodeNotFound(NodeId),
    /// A node with this ID already exists.
    DuplicateNode(NodeId),
    /// The node has no input with this name.
    UnknownInput {
        /// Node that was addressed.
        node: NodeId,
        /// Input name that did not match.
        input: String,
    },
    /// The node has no buffer slot with this name.
    UnknownBufferSlot {
        /// Node that was addressed.
        node: NodeId,
        /// Slot name that did not match.
        slot: String,
    },
    /// No buffer with this name was registered.
    UnknownBuffer(String),
    /// A required input was never connected.
    UnresolvedInput {
        /// Node with the missing input.
        node: NodeId,
        /// Name of the missing input.
        input: &'static str,
    },
    /// Connecting this input would create a cycle.
    CycleDetected,
    /// The node is still read by another node or is a graph output.
    NodeInUse(NodeId),
    /// Block size must be non-zero.
    InvalidBlockSize(usize),
    /// Sample rate must be positive and finite.
    InvalidSampleRate(f32),
    /// Output channel count must be non-zero.
    InvalidChannelCount(usize),
    /// No factory is registered under this node kind.
    UnknownNodeKind(String),
    /// Channels passed to a buffer have different lengths.
    ChannelLengthMismatch {
        /// Frame count of the first channel.
        expected: usize,
        /// Frame count of the offending channel.
        found: usize,
    },
}

#[cfg(feature = "std")]
impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {id} not found"),
            Self::DuplicateNode(id) => write!(f, "node {id} already exists"),
            Self::UnknownInput { node, input } => {
                write!(f, "node {node} has no input named '{input}'")
            }
            Self::UnknownBufferSlot { node, slot } => {
                write!(f, "node {node} has no buffer slot named '{slot}'")
            }
            Self::UnknownBuffer(name) => write!(f, "no buffer named '{name}'"),
            Self::UnresolvedInput { node, input } => {
                write!(f, "input '{input}' of node {node} is not connected")
            }
            Self::CycleDetected => write!(f, "connecting this input would create a cycle"),
            Self::NodeInUse(id) => write!(f, "node {id} is still in use"),
            Self::InvalidBlockSize(n) => write!(f, "invalid block size {n}"),
            Self::InvalidSampleRate(sr) => write!(f, "invalid sample rate {sr}"),
            Self::InvalidChannelCount(n) => write!(f, "invalid output channel count {n}"),
            Self::UnknownNodeKind(kind) => write!(f, "unknown node kind '{kind}'"),
            Self::ChannelLengthMismatch { expected, found } => write!(
                f,
                "channel length mismatch: expected {expected} frames, found {found}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GraphError {}

/// Errors returned by [`CircularBuffer`](crate::CircularBuffer) transfers.
///
/// A rejected transfer leaves the ring untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// More samples were offered than there is free space.
    Overflow {
        /// Samples offered.
        requested: usize,
        /// Free space at the time of the call.
        available: usize,
    },
    /// More samples were requested than are buffered.
    Underflow {
        /// Samples requested.
        requested: usize,
        /// Fill level at the time of the call.
        available: usize,
    },
}

#[cfg(feature = "std")]
impl std::fmt::Display for RingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Overflow {
                requested,
                available,
            } => write!(
                f,
                "ring overflow: {requested} samples offered, {available} free"
            ),
            Self::Underflow {
                requested,
                available,
            } => write!(
                f,
                "ring underflow: {requested} samples requested, {available} buffered"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RingError {}
