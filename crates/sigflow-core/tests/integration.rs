//! Integration tests for sigflow-core.
//!
//! Exercises the graph end to end with small test nodes: render order over a
//! chain, NodeSpec construction through a factory, feedback through a
//! one-block delay, and block-size bridging with the circular buffer.

use std::sync::{Arc, Mutex};

use sigflow_core::{
    BoxedNode, Buffer, BufferBank, BuildContext, CONSTANT_KIND, CircularBuffer, Graph,
    GraphConfig, GraphError, InputSource, InputSpec, Inputs, Node, NodeFactory, NodeId, NodeSpec,
};

const SAMPLE_RATE: f32 = 48000.0;

// ============================================================================
// Test nodes
// ============================================================================

type Log = Arc<Mutex<Vec<&'static str>>>;

/// Passes its input through, recording that it ran.
struct Recorder {
    label: &'static str,
    log: Log,
}

const RECORDER_INPUTS: &[InputSpec] = &[InputSpec::with_default("in", 0.0)];

impl Node for Recorder {
    fn kind(&self) -> &'static str {
        "recorder"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        RECORDER_INPUTS
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        self.log.lock().unwrap().push(self.label);
        let input = inputs.get(0);
        for f in 0..num_frames {
            output.channel_mut(0)[f] = input.value(f) + 1.0;
        }
    }
}

/// Counts frames since creation.
struct Counter(u32);

impl Node for Counter {
    fn kind(&self) -> &'static str {
        "counter"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        &[]
    }

    fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        for f in 0..num_frames {
            output.channel_mut(0)[f] = self.0 as f32;
            self.0 += 1;
        }
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

struct Constant(f32);

impl Node for Constant {
    fn kind(&self) -> &'static str {
        CONSTANT_KIND
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        &[]
    }

    fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        output.channel_mut(0)[..num_frames].fill(self.0);
    }
}

struct Factory {
    log: Log,
}

impl NodeFactory for Factory {
    fn create(&self, kind: &str, ctx: &BuildContext<'_>) -> Option<BoxedNode> {
        match kind {
            CONSTANT_KIND => Some(Box::new(Constant(ctx.value().unwrap_or(0.0)))),
            "counter" => Some(Box::new(Counter(0))),
            "recorder" => Some(Box::new(Recorder {
                label: "recorder",
                log: Arc::clone(&self.log),
            })),
            _ => None,
        }
    }
}

fn graph(block_size: usize, output_channels: usize) -> Graph {
    Graph::new(GraphConfig {
        sample_rate: SAMPLE_RATE,
        block_size,
        output_channels,
    })
    .unwrap()
}

// ============================================================================
// Render order
// ============================================================================

#[test]
fn test_chain_a_b_c_renders_in_order() {
    let log: Log = Arc::default();
    let mut g = graph(32, 1);
    let c = g.add_node(Box::new(Recorder {
        label: "C",
        log: Arc::clone(&log),
    }));
    let a = g.add_node(Box::new(Recorder {
        label: "A",
        log: Arc::clone(&log),
    }));
    let b = g.add_node(Box::new(Recorder {
        label: "B",
        log: Arc::clone(&log),
    }));
    g.set_input(c, "in", InputSource::Node(b)).unwrap();
    g.set_input(b, "in", InputSource::Node(a)).unwrap();
    g.add_output(c).unwrap();
    g.compile().unwrap();

    for _ in 0..3 {
        let out = g.render(32);
        assert_eq!(out.channel(0)[31], 3.0);
    }
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A", "B", "C", "A", "B", "C", "A", "B", "C"]
    );
}

#[test]
fn test_diamond_renders_shared_source_once() {
    let log: Log = Arc::default();
    let mut g = graph(16, 1);
    let recorder = |label| -> BoxedNode {
        Box::new(Recorder {
            label,
            log: Arc::clone(&log),
        })
    };
    let src = g.add_node(recorder("src"));
    let left = g.add_node(recorder("left"));
    let right = g.add_node(recorder("right"));
    g.set_input(left, "in", InputSource::Node(src)).unwrap();
    g.set_input(right, "in", InputSource::Node(src)).unwrap();
    g.add_output(left).unwrap();
    g.add_output(right).unwrap();
    g.compile().unwrap();

    let out = g.render(16);
    // Two outputs of 2.0 each are summed.
    assert_eq!(out.channel(0)[0], 4.0);
    assert_eq!(*log.lock().unwrap(), vec!["src", "left", "right"]);
}

#[test]
fn test_stateful_node_advances_across_blocks_and_resets() {
    let mut g = graph(4, 1);
    let counter = g.add_node(Box::new(Counter(0)));
    g.add_output(counter).unwrap();
    g.compile().unwrap();

    assert_eq!(g.render(4).channel(0), &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(g.render(2).channel(0), &[4.0, 5.0]);
    g.reset();
    assert_eq!(g.render(1).channel(0), &[0.0]);
}

// ============================================================================
// NodeSpec construction
// ============================================================================

#[test]
fn test_spec_tree_builds_and_renders() {
    let factory = Factory {
        log: Arc::default(),
    };
    let spec = NodeSpec::new("recorder").with_input(
        "in",
        NodeSpec::new("recorder").with_input("in", NodeSpec::new("counter")),
    );
    let mut g = graph(4, 2);
    let root = g
        .add_output_spec(&spec, &factory, &BufferBank::new())
        .unwrap();
    g.compile().unwrap();

    let order: Vec<NodeId> = g.render_order().collect();
    assert_eq!(order.len(), 3);
    assert_eq!(*order.last().unwrap(), root);

    let out = g.render(4);
    assert_eq!(out.channel(0), &[2.0, 3.0, 4.0, 5.0]);
    assert_eq!(out.channel(1), &[2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn test_spec_mutation_after_insert_does_not_leak() {
    let mut inner = NodeSpec::new("counter");
    let mut outer = NodeSpec::new("recorder");
    outer.add_input("in", &inner);
    inner.set_name("does-not-exist");

    let factory = Factory {
        log: Arc::default(),
    };
    let mut g = graph(4, 1);
    assert!(g.add_output_spec(&outer, &factory, &BufferBank::new()).is_ok());
}

#[test]
fn test_unknown_kind_reported() {
    let factory = Factory {
        log: Arc::default(),
    };
    let mut g = graph(4, 1);
    let err = g
        .instantiate(&NodeSpec::new("theremin"), &factory, &BufferBank::new())
        .unwrap_err();
    assert_eq!(err, GraphError::UnknownNodeKind("theremin".to_string()));
    assert_eq!(err.to_string(), "unknown node kind 'theremin'");
}

// ============================================================================
// Block-size bridging
// ============================================================================

#[test]
fn test_circular_buffer_bridges_graph_blocks() {
    let mut g = graph(64, 1);
    let counter = g.add_node(Box::new(Counter(0)));
    g.add_output(counter).unwrap();
    g.compile().unwrap();

    let mut ring = CircularBuffer::new(2048);
    for call in 1..=32 {
        let block = g.render(64);
        ring.put(block.channel(0)).unwrap();
        assert_eq!(ring.is_full(), call == 32);
    }
    // The next block does not fit until the consumer drains.
    assert!(ring.put(g.render(64).channel(0)).is_err());

    let mut big = vec![0.0; 2048];
    ring.get(&mut big).unwrap();
    for (i, &s) in big.iter().enumerate() {
        assert_eq!(s, i as f32);
    }
}
