//! Control-side copy of the graph's wiring.
//!
//! The renderer's graph lives on the audio thread, so the control thread
//! checks every staged change against this mirror instead. A transaction
//! is replayed on a clone and only committed if every step succeeds, which
//! keeps the renderer from ever seeing a change the graph would reject.

use sigflow_core::{GraphError, InputSource, InputSpec, NodeEntry, NodeId};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Shape {
    specs: &'static [InputSpec],
    slots: &'static [&'static str],
    delays: bool,
    sources: Vec<Option<InputSource>>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Topology {
    nodes: BTreeMap<NodeId, Shape>,
    outputs: Vec<NodeId>,
}

impl Topology {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn insert(&mut self, id: NodeId, entry: &NodeEntry) -> Result<(), GraphError> {
        if self.contains(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        let node = entry.node();
        let delays = node.delays_inputs();
        for source in entry.inputs().iter().flatten() {
            if let InputSource::Node(src) = *source {
                if src == id && !delays {
                    return Err(GraphError::CycleDetected);
                }
                if src != id && !self.contains(src) {
                    return Err(GraphError::NodeNotFound(src));
                }
            }
        }
        self.nodes.insert(
            id,
            Shape {
                specs: node.input_specs(),
                slots: node.buffer_slots(),
                delays,
                sources: entry.inputs().to_vec(),
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        let read_by_other = self.nodes.iter().any(|(&other, shape)| {
            other != id && shape.sources.contains(&Some(InputSource::Node(id)))
        });
        if self.outputs.contains(&id) || read_by_other {
            return Err(GraphError::NodeInUse(id));
        }
        self.nodes.remove(&id);
        Ok(())
    }

    /// Records a connection and returns the input's static name.
    pub fn connect(
        &mut self,
        id: NodeId,
        input: &str,
        source: InputSource,
    ) -> Result<&'static str, GraphError> {
        let shape = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        let index = shape
            .specs
            .iter()
            .position(|s| s.name == input)
            .ok_or_else(|| GraphError::UnknownInput {
                node: id,
                input: input.into(),
            })?;
        let name = shape.specs[index].name;

        if let InputSource::Node(src) = source {
            if !self.contains(src) {
                return Err(GraphError::NodeNotFound(src));
            }
            if !shape.delays && self.reads_from(src, id) {
                return Err(GraphError::CycleDetected);
            }
        }

        if let Some(shape) = self.nodes.get_mut(&id) {
            shape.sources[index] = Some(source);
        }
        Ok(name)
    }

    /// Returns the slot's static name.
    pub fn buffer_slot(&self, id: NodeId, slot: &str) -> Result<&'static str, GraphError> {
        let shape = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
        shape
            .slots
            .iter()
            .copied()
            .find(|s| *s == slot)
            .ok_or_else(|| GraphError::UnknownBufferSlot {
                node: id,
                slot: slot.into(),
            })
    }

    pub fn add_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        Ok(())
    }

    pub fn remove_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        let pos = self
            .outputs
            .iter()
            .position(|&o| o == id)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.outputs.remove(pos);
        Ok(())
    }

    /// Every node reachable from an output has all of its inputs resolved.
    pub fn check_resolved(&self) -> Result<(), GraphError> {
        let mut visited = Vec::new();
        let mut stack: Vec<NodeId> = self.outputs.clone();
        while let Some(id) = stack.pop() {
            if visited.contains(&id) {
                continue;
            }
            visited.push(id);
            let Some(shape) = self.nodes.get(&id) else {
                continue;
            };
            for (k, source) in shape.sources.iter().enumerate() {
                match source {
                    None => {
                        return Err(GraphError::UnresolvedInput {
                            node: id,
                            input: shape.specs[k].name,
                        });
                    }
                    Some(InputSource::Node(src)) => stack.push(*src),
                    Some(InputSource::Constant(_)) => {}
                }
            }
        }
        Ok(())
    }

    /// Does `start` (transitively) read from `target`? Delaying nodes end a path.
    fn reads_from(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            if let Some(shape) = self.nodes.get(&current) {
                if shape.delays {
                    continue;
                }
                for source in shape.sources.iter().flatten() {
                    if let InputSource::Node(src) = *source {
                        stack.push(src);
                    }
                }
            }
        }
        false
    }
}
