//! Patch validation against the node registry.
//!
//! Catches what graph construction would reject (unknown kinds, inputs,
//! buffer slots, buffer assets) before any node is built, and reports every
//! problem instead of the first.
//!
//! # Example
//!
//! ```rust
//! use sigflow_config::{NodeConfig, PatchValidator};
//!
//! let validator = PatchValidator::new();
//! let node = NodeConfig::new("sine").with_input("frequency", 220.0);
//! validator.validate_node(&node).expect("sine takes a frequency");
//! ```

use sigflow_registry::{NodeDescriptor, NodeRegistry};
use thiserror::Error;

use crate::node_config::{NodeConfig, ParamValue};
use crate::patch::Patch;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Unknown node kind.
    #[error("unknown node kind: {0}")]
    UnknownNode(String),

    /// The node kind has no input with this name.
    #[error("unknown input '{input}' for node '{node}'")]
    UnknownInput {
        /// Node kind.
        node: String,
        /// Unrecognized input name.
        input: String,
    },

    /// The node kind has no buffer slot with this name.
    #[error("unknown buffer slot '{slot}' for node '{node}'")]
    UnknownBufferSlot {
        /// Node kind.
        node: String,
        /// Unrecognized slot name.
        slot: String,
    },

    /// The node kind does not read this option.
    #[error("unknown option '{option}' for node '{node}'")]
    UnknownOption {
        /// Node kind.
        node: String,
        /// Unrecognized option key.
        option: String,
    },

    /// A node names a buffer asset the patch does not declare.
    #[error("buffer '{0}' is not declared in the patch")]
    UnknownBuffer(String),

    /// An engine setting is out of range.
    #[error("invalid engine setting '{field}': {reason}")]
    InvalidEngine {
        /// Field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The patch has nothing to render.
    #[error("patch has no outputs")]
    NoOutputs,

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn from_list(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validator for node trees and patches.
pub struct PatchValidator {
    registry: NodeRegistry,
}

impl Default for PatchValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchValidator {
    /// Create a validator over the built-in node kinds.
    pub fn new() -> Self {
        Self::with_registry(NodeRegistry::new())
    }

    /// Create a validator over a specific registry.
    pub fn with_registry(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    /// Validate that a node kind exists.
    pub fn validate_kind(&self, kind: &str) -> ValidationResult<&NodeDescriptor> {
        self.registry
            .get(kind)
            .ok_or_else(|| ValidationError::UnknownNode(kind.to_string()))
    }

    /// Validate one node tree in isolation (buffer assets are not checked).
    pub fn validate_node(&self, node: &NodeConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();
        self.collect_node(node, None, &mut errors);
        ValidationError::from_list(errors)
    }

    /// Validate a whole patch: engine settings, every output tree, and that
    /// each referenced buffer asset is declared.
    pub fn validate_patch(&self, patch: &Patch) -> ValidationResult<()> {
        let mut errors = Vec::new();
        if let Some(engine) = &patch.engine
            && let Err(e) = engine.validate()
        {
            errors.push(e);
        }
        if patch.outputs.is_empty() {
            errors.push(ValidationError::NoOutputs);
        }
        for output in &patch.outputs {
            self.collect_node(output, Some(patch), &mut errors);
        }
        ValidationError::from_list(errors)
    }

    fn collect_node(
        &self,
        node: &NodeConfig,
        patch: Option<&Patch>,
        errors: &mut Vec<ValidationError>,
    ) {
        let descriptor = match self.validate_kind(&node.node) {
            Ok(d) => Some(d),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        if let Some(d) = descriptor {
            for input in node.inputs.keys() {
                if !d.inputs.contains(&input.as_str()) {
                    errors.push(ValidationError::UnknownInput {
                        node: d.id.to_string(),
                        input: input.clone(),
                    });
                }
            }
            for slot in node.buffers.keys() {
                if !d.buffer_slots.contains(&slot.as_str()) {
                    errors.push(ValidationError::UnknownBufferSlot {
                        node: d.id.to_string(),
                        slot: slot.clone(),
                    });
                }
            }
            for option in node.options.keys() {
                if !accepts_option(d, option) {
                    errors.push(ValidationError::UnknownOption {
                        node: d.id.to_string(),
                        option: option.clone(),
                    });
                }
            }
        }

        if let Some(patch) = patch {
            for asset in node.buffers.values() {
                if !patch.buffers.contains_key(asset) {
                    errors.push(ValidationError::UnknownBuffer(asset.clone()));
                }
            }
        }

        for param in node.inputs.values() {
            if let ParamValue::Node(child) = param {
                self.collect_node(child, patch, errors);
            }
        }
    }
}

/// Options ending in `<name>` in the descriptor accept any suffix.
fn accepts_option(descriptor: &NodeDescriptor, option: &str) -> bool {
    descriptor.options.iter().any(|known| match known.strip_suffix("<name>") {
        Some(prefix) => option.len() > prefix.len() && option.starts_with(prefix),
        None => *known == option,
    })
}

/// Validate that a node kind exists in the built-in registry.
pub fn validate_node_kind(kind: &str) -> ValidationResult<()> {
    PatchValidator::new().validate_kind(kind).map(|_| ())
}

/// Validate a patch against the built-in registry.
pub fn validate_patch(patch: &Patch) -> ValidationResult<()> {
    PatchValidator::new().validate_patch(patch)
}
