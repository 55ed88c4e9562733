//! Declarative node descriptions.
//!
//! A [`NodeSpec`] says how to build a node: its kind name, and for each named
//! input either a constant or another `NodeSpec`. It is a plain value; adding
//! a child stores an owned deep copy, so later edits to the original never
//! reach the stored tree.
//!
//! Constant leaves use the reserved name [`CONSTANT_KIND`] and carry a value.
//! Graph construction wires such leaves as constant inputs instead of
//! instantiating a node for them.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

/// Kind name reserved for constant leaves.
pub const CONSTANT_KIND: &str = "constant";

/// Owned, acyclic description of a node and its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    name: String,
    value: Option<f32>,
    id: Option<u32>,
    inputs: BTreeMap<String, NodeSpec>,
    buffers: BTreeMap<String, String>,
    options: BTreeMap<String, String>,
}

impl NodeSpec {
    /// Creates a spec for node kind `name` with no inputs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            id: None,
            inputs: BTreeMap::new(),
            buffers: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    /// Creates a constant leaf.
    pub fn constant(value: f32) -> Self {
        let mut spec = Self::new(CONSTANT_KIND);
        spec.value = Some(value);
        spec
    }

    /// Stores a deep copy of `spec` as input `name`, replacing any previous one.
    pub fn add_input(&mut self, name: impl Into<String>, spec: &NodeSpec) -> &mut Self {
        self.inputs.insert(name.into(), spec.clone());
        self
    }

    /// Stores a constant leaf as input `name`.
    pub fn add_constant(&mut self, name: impl Into<String>, value: f32) -> &mut Self {
        self.inputs.insert(name.into(), Self::constant(value));
        self
    }

    /// Builder form of [`add_input`](Self::add_input) that takes ownership.
    pub fn with_input(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    /// Builder form of [`add_constant`](Self::add_constant).
    pub fn with_constant(mut self, name: impl Into<String>, value: f32) -> Self {
        self.add_constant(name, value);
        self
    }

    /// Names the buffer asset to attach to buffer slot `slot`.
    pub fn add_buffer(&mut self, slot: impl Into<String>, asset: impl Into<String>) -> &mut Self {
        self.buffers.insert(slot.into(), asset.into());
        self
    }

    /// Builder form of [`add_buffer`](Self::add_buffer).
    pub fn with_buffer(mut self, slot: impl Into<String>, asset: impl Into<String>) -> Self {
        self.add_buffer(slot, asset);
        self
    }

    /// Sets a free-form string option read by the node's factory.
    pub fn add_option(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`add_option`](Self::add_option).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_option(key, value);
        self
    }

    /// Renames the node kind.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Sets the value, making this spec a constant leaf.
    pub fn set_value(&mut self, value: f32) {
        self.value = Some(value);
    }

    /// Sets an explicit node ID hint.
    pub fn set_id(&mut self, id: u32) {
        self.id = Some(id);
    }

    /// Node kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constant value, if set.
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// ID hint, if set.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Returns true for constant leaves.
    pub fn is_constant(&self) -> bool {
        self.value.is_some()
    }

    /// Input `name`, if present.
    pub fn input(&self, name: &str) -> Option<&NodeSpec> {
        self.inputs.get(name)
    }

    /// Inputs in name order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &NodeSpec)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Buffer slot to asset name pairs.
    pub fn buffers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buffers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Option `key`, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// All options in key order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of non-constant nodes in the tree, including this one.
    pub fn node_count(&self) -> usize {
        if self.is_constant() {
            return 0;
        }
        1 + self.inputs.values().map(NodeSpec::node_count).sum::<usize>()
    }

    /// Every buffer asset name referenced anywhere in the tree.
    pub fn buffer_assets(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_assets(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_assets<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.buffers.values().map(String::as_str));
        for child in self.inputs.values() {
            child.collect_assets(out);
        }
    }
}

impl core::fmt::Display for NodeSpec {
    /// Compact one-line form, e.g. `granulator(clock: impulse(frequency: 20), pos: 0.5)`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(v) = self.value {
            return write!(f, "{v}");
        }
        write!(f, "{}", self.name)?;
        if self.inputs.is_empty() && self.buffers.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        let mut first = true;
        for (name, child) in &self.inputs {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}: {child}")?;
        }
        for (slot, asset) in &self.buffers {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{slot}: @{asset}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_leaf() {
        let c = NodeSpec::constant(0.5);
        assert_eq!(c.name(), CONSTANT_KIND);
        assert!(c.is_constant());
        assert_eq!(c.value(), Some(0.5));
        assert_eq!(c.node_count(), 0);
    }

    #[test]
    fn test_add_input_is_deep_copy() {
        let mut clock = NodeSpec::new("impulse");
        clock.add_constant("frequency", 10.0);

        let mut grains = NodeSpec::new("granulator");
        grains.add_input("clock", &clock);

        // Mutating the original after insertion leaves the stored copy alone.
        clock.add_constant("frequency", 99.0);
        clock.set_name("noise");

        let stored = grains.input("clock").unwrap();
        assert_eq!(stored.name(), "impulse");
        assert_eq!(stored.input("frequency").unwrap().value(), Some(10.0));
    }

    #[test]
    fn test_set_value_makes_constant() {
        let mut spec = NodeSpec::new("sine");
        assert!(!spec.is_constant());
        spec.set_value(3.0);
        assert!(spec.is_constant());
        spec.set_id(7);
        assert_eq!(spec.id(), Some(7));
    }

    #[test]
    fn test_node_count_and_assets() {
        let spec = NodeSpec::new("granulator")
            .with_input(
                "clock",
                NodeSpec::new("impulse").with_constant("frequency", 20.0),
            )
            .with_input(
                "pos",
                NodeSpec::new("sampler").with_buffer("buffer", "voice"),
            )
            .with_constant("rate", 1.0)
            .with_buffer("buffer", "voice");
        assert_eq!(spec.node_count(), 3);
        assert_eq!(spec.buffer_assets(), vec!["voice"]);
    }

    #[test]
    fn test_display() {
        let spec = NodeSpec::new("granulator")
            .with_input(
                "clock",
                NodeSpec::new("impulse").with_constant("frequency", 20.0),
            )
            .with_constant("pos", 0.5)
            .with_buffer("buffer", "voice");
        assert_eq!(
            spec.to_string(),
            "granulator(clock: impulse(frequency: 20), pos: 0.5, buffer: @voice)"
        );
    }

    #[test]
    fn test_options() {
        let spec = NodeSpec::new("model")
            .with_option("path", "decoder.ts")
            .with_option("method", "decode");
        assert_eq!(spec.option("method"), Some("decode"));
        assert_eq!(spec.option("missing"), None);
        assert_eq!(spec.options().count(), 2);
    }
}
