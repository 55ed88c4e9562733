//! Node registry and factory for sigflow graphs.
//!
//! The registry maps node kind names to constructors and metadata. It
//! implements [`NodeFactory`], so a [`NodeSpec`](sigflow_core::NodeSpec) tree
//! can be instantiated straight into a graph.
//!
//! # Example
//!
//! ```rust
//! use sigflow_core::{BufferBank, Graph, GraphConfig, NodeSpec};
//! use sigflow_registry::{NodeCategory, NodeRegistry};
//!
//! let registry = NodeRegistry::new();
//!
//! for node in registry.nodes_in_category(NodeCategory::Generator) {
//!     println!("{}: {}", node.id, node.description);
//! }
//!
//! let spec = NodeSpec::new("sine").with_constant("frequency", 220.0);
//! let mut graph = Graph::new(GraphConfig::default()).unwrap();
//! let id = graph.instantiate(&spec, &registry, &BufferBank::new()).unwrap();
//! graph.add_output(id).unwrap();
//! graph.compile().unwrap();
//! ```
//!
//! # no_std Support
//!
//! Without `std` every kind except `model` is available.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

use sigflow_core::{BoxedNode, BuildContext, GrainWindow, NodeFactory};
use sigflow_nodes::{
    BinaryOp, Constant, DEFAULT_MAX_GRAINS, Delay, Dust, Envelope, Feedback, Granulator, Impulse,
    Noise, Operator, Oscillator, Resample, Sampler, Waveform,
};
#[cfg(feature = "std")]
use sigflow_nodes::{InferenceBackend, ModelConfig, ModelMode, ModelNode, NullBackend};

/// Category of node for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Periodic and constant sources.
    Generator,
    /// Noise and random impulses.
    Random,
    /// Envelopes.
    Envelope,
    /// Arithmetic on signals.
    Operator,
    /// Delays and rate changes.
    TimeBased,
    /// Nodes that play back source buffers.
    Sampling,
    /// Model inference.
    Inference,
}

impl NodeCategory {
    /// Every category, in display order.
    pub const ALL: [NodeCategory; 7] = [
        NodeCategory::Generator,
        NodeCategory::Random,
        NodeCategory::Envelope,
        NodeCategory::Operator,
        NodeCategory::TimeBased,
        NodeCategory::Sampling,
        NodeCategory::Inference,
    ];

    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Generator => "Generator",
            NodeCategory::Random => "Random",
            NodeCategory::Envelope => "Envelope",
            NodeCategory::Operator => "Operator",
            NodeCategory::TimeBased => "Time-Based",
            NodeCategory::Sampling => "Sampling",
            NodeCategory::Inference => "Inference",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            NodeCategory::Generator => "Oscillators, clocks, and constant values",
            NodeCategory::Random => "Noise sources and random impulse generators",
            NodeCategory::Envelope => "Triggered amplitude envelopes",
            NodeCategory::Operator => "Signal arithmetic",
            NodeCategory::TimeBased => "Delays, feedback taps, and rate reduction",
            NodeCategory::Sampling => "Buffer playback and granular synthesis",
            NodeCategory::Inference => "Neural audio models run through an inference backend",
        }
    }
}

/// Describes a node kind in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Kind name used in specs (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the node.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
    /// Input names, in declaration order.
    pub inputs: &'static [&'static str],
    /// Buffer slot names.
    pub buffer_slots: &'static [&'static str],
    /// Recognised spec options.
    pub options: &'static [&'static str],
}

/// Constructor for an inference backend.
#[cfg(feature = "std")]
pub type BackendFactory = fn() -> Box<dyn InferenceBackend>;

/// Services a node constructor may need beyond its spec.
#[derive(Clone, Copy)]
struct Services {
    #[cfg(feature = "std")]
    backend: BackendFactory,
}

/// Factory function type for creating nodes.
type NodeConstructor = fn(&BuildContext<'_>, &Services) -> BoxedNode;

struct RegistryEntry {
    descriptor: NodeDescriptor,
    constructor: NodeConstructor,
}

/// Registry of all available node kinds.
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
    services: Services,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn seed(ctx: &BuildContext<'_>) -> u32 {
    ctx.option("seed")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0x1234_5678)
}

fn count(ctx: &BuildContext<'_>, key: &str, default: usize) -> usize {
    ctx.option(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn oscillator(waveform: Waveform, ctx: &BuildContext<'_>) -> BoxedNode {
    Box::new(Oscillator::new(waveform, ctx.sample_rate()))
}

impl NodeRegistry {
    /// Create a new registry with all built-in nodes registered.
    ///
    /// The `model` kind loads through a backend that always fails; use
    /// [`with_backend`](Self::with_backend) to plug a real one in.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(16),
            services: Services {
                #[cfg(feature = "std")]
                backend: || Box::new(NullBackend),
            },
        };
        registry.register_builtin_nodes();
        registry
    }

    /// Create a registry whose `model` nodes load through `backend`.
    #[cfg(feature = "std")]
    pub fn with_backend(backend: BackendFactory) -> Self {
        let mut registry = Self::new();
        registry.services.backend = backend;
        registry
    }

    fn register_builtin_nodes(&mut self) {
        // Generators
        self.register(
            NodeDescriptor {
                id: "constant",
                name: "Constant",
                description: "A fixed value on every frame",
                category: NodeCategory::Generator,
                inputs: &[],
                buffer_slots: &[],
                options: &["value"],
            },
            |ctx, _| {
                let value = ctx.value().unwrap_or_else(|| ctx.option_f32("value", 0.0));
                Box::new(Constant::new(value))
            },
        );
        self.register(
            NodeDescriptor {
                id: "sine",
                name: "Sine",
                description: "Sine oscillator",
                category: NodeCategory::Generator,
                inputs: &["frequency", "amplitude"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| oscillator(Waveform::Sine, ctx),
        );
        self.register(
            NodeDescriptor {
                id: "square",
                name: "Square",
                description: "Band-limited square oscillator",
                category: NodeCategory::Generator,
                inputs: &["frequency", "amplitude"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| oscillator(Waveform::Square, ctx),
        );
        self.register(
            NodeDescriptor {
                id: "saw",
                name: "Saw",
                description: "Band-limited sawtooth oscillator",
                category: NodeCategory::Generator,
                inputs: &["frequency", "amplitude"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| oscillator(Waveform::Saw, ctx),
        );
        self.register(
            NodeDescriptor {
                id: "triangle",
                name: "Triangle",
                description: "Triangle oscillator",
                category: NodeCategory::Generator,
                inputs: &["frequency", "amplitude"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| oscillator(Waveform::Triangle, ctx),
        );
        self.register(
            NodeDescriptor {
                id: "impulse",
                name: "Impulse",
                description: "Clock emitting a single-frame pulse per period",
                category: NodeCategory::Generator,
                inputs: &["frequency"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| Box::new(Impulse::new(ctx.sample_rate())),
        );

        // Random
        self.register(
            NodeDescriptor {
                id: "noise",
                name: "Noise",
                description: "Uniform noise with optional sample-and-hold",
                category: NodeCategory::Random,
                inputs: &["frequency", "min", "max"],
                buffer_slots: &[],
                options: &["seed"],
            },
            |ctx, _| Box::new(Noise::new(seed(ctx), ctx.sample_rate())),
        );
        self.register(
            NodeDescriptor {
                id: "dust",
                name: "Dust",
                description: "Random impulses at an average density per second",
                category: NodeCategory::Random,
                inputs: &["density"],
                buffer_slots: &[],
                options: &["seed"],
            },
            |ctx, _| Box::new(Dust::new(seed(ctx), ctx.sample_rate())),
        );

        // Envelopes
        self.register(
            NodeDescriptor {
                id: "env",
                name: "Envelope",
                description: "Linear attack/sustain/release envelope triggered by a clock",
                category: NodeCategory::Envelope,
                inputs: &["clock", "attack", "sustain", "release"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| Box::new(Envelope::new(ctx.sample_rate())),
        );

        // Operators
        self.register(
            NodeDescriptor {
                id: "multiply",
                name: "Multiply",
                description: "Product of two signals",
                category: NodeCategory::Operator,
                inputs: &["a", "b"],
                buffer_slots: &[],
                options: &[],
            },
            |_, _| Box::new(Operator::new(BinaryOp::Multiply)),
        );
        self.register(
            NodeDescriptor {
                id: "add",
                name: "Add",
                description: "Sum of two signals",
                category: NodeCategory::Operator,
                inputs: &["a", "b"],
                buffer_slots: &[],
                options: &[],
            },
            |_, _| Box::new(Operator::new(BinaryOp::Add)),
        );

        // Time-based
        self.register(
            NodeDescriptor {
                id: "delay",
                name: "Delay",
                description: "Feedback echo with modulatable time",
                category: NodeCategory::TimeBased,
                inputs: &["input", "time", "feedback"],
                buffer_slots: &[],
                options: &["max_time", "channels"],
            },
            |ctx, _| {
                Box::new(Delay::new(
                    ctx.option_f32("max_time", 1.0),
                    count(ctx, "channels", 2),
                    ctx.sample_rate(),
                ))
            },
        );
        self.register(
            NodeDescriptor {
                id: "feedback",
                name: "Feedback",
                description: "One-block delay that may close a loop",
                category: NodeCategory::TimeBased,
                inputs: &["input"],
                buffer_slots: &[],
                options: &["channels"],
            },
            |ctx, _| Box::new(Feedback::new(count(ctx, "channels", 1))),
        );
        self.register(
            NodeDescriptor {
                id: "resample",
                name: "Resample",
                description: "Sample-and-hold rate reduction",
                category: NodeCategory::TimeBased,
                inputs: &["input", "rate"],
                buffer_slots: &[],
                options: &[],
            },
            |ctx, _| Box::new(Resample::new(ctx.sample_rate())),
        );

        // Sampling
        self.register(
            NodeDescriptor {
                id: "sampler",
                name: "Sampler",
                description: "Variable-rate buffer playback with clock restart",
                category: NodeCategory::Sampling,
                inputs: &["rate", "clock", "start", "loop"],
                buffer_slots: &["buffer"],
                options: &[],
            },
            |_, _| Box::new(Sampler::new()),
        );
        self.register(
            NodeDescriptor {
                id: "granulator",
                name: "Granulator",
                description: "Clock-driven windowed grains over a source buffer",
                category: NodeCategory::Sampling,
                inputs: &["clock", "pos", "grain_length", "rate", "pan", "max_grains"],
                buffer_slots: &["buffer"],
                options: &["capacity", "channels", "window"],
            },
            |ctx, _| {
                let window = ctx
                    .option("window")
                    .and_then(GrainWindow::from_name)
                    .unwrap_or_default();
                Box::new(Granulator::new(
                    count(ctx, "capacity", DEFAULT_MAX_GRAINS),
                    count(ctx, "channels", 2),
                    window,
                ))
            },
        );

        // Inference
        #[cfg(feature = "std")]
        self.register(
            NodeDescriptor {
                id: "model",
                name: "Model",
                description: "Streams audio through a block-based inference model",
                category: NodeCategory::Inference,
                inputs: &["input"],
                buffer_slots: &[],
                options: &["path", "method", "buffer_size", "mode", "attr.<name>"],
            },
            model_node,
        );
    }

    /// Register a node kind with the registry.
    fn register(&mut self, descriptor: NodeDescriptor, constructor: NodeConstructor) {
        self.entries.push(RegistryEntry {
            descriptor,
            constructor,
        });
    }

    /// Returns descriptors for all registered nodes.
    pub fn all_nodes(&self) -> Vec<&NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for nodes in a specific category.
    pub fn nodes_in_category(&self, category: NodeCategory) -> Vec<&NodeDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by kind name.
    pub fn get(&self, id: &str) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Returns the number of registered node kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NodeFactory for NodeRegistry {
    fn create(&self, kind: &str, ctx: &BuildContext<'_>) -> Option<BoxedNode> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == kind)
            .map(|e| (e.constructor)(ctx, &self.services))
    }
}

/// Builds a model node from `path`, `method`, `buffer_size` and `mode`
/// options. Options named `attr.<name>` are forwarded as attributes, with
/// comma-separated values.
#[cfg(feature = "std")]
fn model_node(ctx: &BuildContext<'_>, services: &Services) -> BoxedNode {
    let mut config = ModelConfig::new(
        ctx.option("path").unwrap_or_default(),
        ctx.option("method").unwrap_or("forward"),
    );
    config.buffer_size = count(ctx, "buffer_size", 0);
    config.mode = ctx
        .option("mode")
        .and_then(ModelMode::from_name)
        .unwrap_or_default();

    let mut node = ModelNode::load((services.backend)(), config);
    if node.state().is_ready() {
        for (key, value) in ctx.spec.options() {
            let Some(name) = key.strip_prefix("attr.") else {
                continue;
            };
            let values: Vec<String> = value.split(',').map(|v| v.trim().to_string()).collect();
            // A rejected attribute keeps the model default; the node still renders.
            match node.set_attribute(name, &values) {
                Ok(()) => {}
                #[cfg(feature = "tracing")]
                Err(e) => {
                    tracing::debug!(attribute = name, error = %e, "model attribute not applied");
                }
                #[cfg(not(feature = "tracing"))]
                Err(_) => {}
            }
        }
    }
    Box::new(node)
}
