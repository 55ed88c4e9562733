//! Serializable node trees.

use serde::{Deserialize, Serialize};
use sigflow_core::{CONSTANT_KIND, NodeSpec};
use std::collections::BTreeMap;
use std::fmt;

/// A node input in a patch: a number or a nested node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    /// Constant value.
    Constant(f32),
    /// Another node whose output drives the input.
    Node(Box<NodeConfig>),
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Constant(value)
    }
}

impl From<NodeConfig> for ParamValue {
    fn from(node: NodeConfig) -> Self {
        ParamValue::Node(Box::new(node))
    }
}

/// A node option: free text, a number, or a flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Flag(bool),
    /// Numeric option.
    Number(f64),
    /// Text option.
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(b) => write!(f, "{b}"),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

/// One node of a patch.
///
/// ```toml
/// node = "granulator"
/// buffers = { buffer = "voice" }
/// options = { window = "hann", channels = 2 }
///
/// [inputs]
/// pos = 0.25
/// grain_length = 0.08
/// clock = { node = "impulse", inputs = { frequency = 16 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    /// Node kind, as registered (e.g. `"granulator"`).
    pub node: String,

    /// Constant value for `constant` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,

    /// Optional ID hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,

    /// Buffer slot to asset name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buffers: BTreeMap<String, String>,

    /// Kind-specific construction options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,

    /// Input name to constant or nested node.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, ParamValue>,
}

impl NodeConfig {
    /// Create a node of kind `node` with no inputs.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            value: None,
            id: None,
            buffers: BTreeMap::new(),
            options: BTreeMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Set an input to a constant or a nested node.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Attach buffer asset `asset` to slot `slot`.
    pub fn with_buffer(mut self, slot: impl Into<String>, asset: impl Into<String>) -> Self {
        self.buffers.insert(slot.into(), asset.into());
        self
    }

    /// Set a construction option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Convert to the in-memory spec tree.
    pub fn to_spec(&self) -> NodeSpec {
        if self.node == CONSTANT_KIND
            && let Some(v) = self.value
        {
            return NodeSpec::constant(v);
        }
        let mut spec = NodeSpec::new(&self.node);
        if let Some(v) = self.value {
            spec.set_value(v);
        }
        if let Some(id) = self.id {
            spec.set_id(id);
        }
        for (slot, asset) in &self.buffers {
            spec.add_buffer(slot, asset);
        }
        for (key, value) in &self.options {
            spec.add_option(key, value.to_string());
        }
        for (name, param) in &self.inputs {
            match param {
                ParamValue::Constant(v) => spec.add_constant(name, *v),
                ParamValue::Node(child) => spec.add_input(name, &child.to_spec()),
            };
        }
        spec
    }

    /// Convert a spec tree back into its serializable form.
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let mut config = NodeConfig::new(spec.name());
        config.value = spec.value();
        config.id = spec.id();
        for (slot, asset) in spec.buffers() {
            config.buffers.insert(slot.to_string(), asset.to_string());
        }
        for (key, value) in spec.options() {
            config.options.insert(key.to_string(), OptionValue::Text(value.to_string()));
        }
        for (name, child) in spec.inputs() {
            let param = match child.value() {
                Some(v) if child.name() == CONSTANT_KIND => ParamValue::Constant(v),
                _ => ParamValue::Node(Box::new(NodeConfig::from_spec(child))),
            };
            config.inputs.insert(name.to_string(), param);
        }
        config
    }

    /// Every node kind used in this tree, depth first.
    pub fn kinds(&self) -> Vec<&str> {
        let mut out = vec![self.node.as_str()];
        for param in self.inputs.values() {
            if let ParamValue::Node(child) = param {
                out.extend(child.kinds());
            }
        }
        out
    }
}
