//! Compiled render order.
//!
//! A [`CompiledSchedule`] is produced by
//! [`Graph::compile()`](super::Graph::compile) and consumed by
//! [`Graph::render()`](super::Graph::render). Its vectors are cleared and
//! refilled on every compile, so recompiling a graph of the same size does
//! not allocate.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use super::node::NodeId;

/// Flat render order plus the feedback nodes that capture after each block.
#[derive(Debug, Default)]
pub struct CompiledSchedule {
    /// Node slots in render order.
    pub(crate) order: Vec<usize>,
    /// Slots of reachable nodes that read their inputs one block late.
    pub(crate) delayed: Vec<usize>,
}

impl CompiledSchedule {
    /// Number of nodes rendered per block.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no node is reachable from an output.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node IDs in render order.
    pub fn order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().map(|&slot| NodeId(slot as u32))
    }

    /// Number of one-block feedback nodes in the schedule.
    pub fn feedback_count(&self) -> usize {
        self.delayed.len()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.delayed.clear();
    }
}

/// Scratch space reused across compiles.
#[derive(Debug, Default)]
pub(crate) struct CompileScratch {
    pub reachable: Vec<bool>,
    pub in_degree: Vec<u32>,
    pub ready: Vec<usize>,
    pub stack: Vec<usize>,
}

impl CompileScratch {
    pub fn reset(&mut self, n: usize) {
        self.reachable.clear();
        self.reachable.resize(n, false);
        self.in_degree.clear();
        self.in_degree.resize(n, 0);
        self.ready.clear();
        self.stack.clear();
    }

    pub fn reserve(&mut self, total: usize) {
        self.reachable.reserve(total);
        self.in_degree.reserve(total);
        self.ready.reserve(total);
        self.stack.reserve(total);
    }
}
