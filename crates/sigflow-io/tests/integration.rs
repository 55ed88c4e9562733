//! Engine, sinks, and assets working together.

use sigflow_core::{Buffer, BufferBank, GraphConfig, InputSource, NodeSpec};
use sigflow_io::{
    DummyClock, DummySink, OutputSink, SinkConfig, SinkState, engine, load_bank, write_wav,
};
use sigflow_registry::NodeRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn config() -> GraphConfig {
    GraphConfig {
        sample_rate: 48000.0,
        block_size: 480,
        output_channels: 2,
    }
}

#[test]
fn granulator_through_dummy_sink() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ramp.wav");
    let ramp: Vec<f32> = (0..48000).map(|i| i as f32 / 48000.0).collect();
    write_wav(&path, &Buffer::from_channels(vec![ramp], 48000.0).unwrap()).unwrap();
    let bank = load_bank([("ramp", &path)]).unwrap();

    let spec = NodeSpec::new("granulator")
        .with_input(
            "clock",
            NodeSpec::new("impulse").with_constant("frequency", 0.001),
        )
        .with_constant("pos", 0.0)
        .with_constant("grain_length", 0.1)
        .with_constant("max_grains", 1.0)
        .with_buffer("buffer", "ramp");

    let (mut handle, renderer) = engine(config()).unwrap();
    let mut tx = handle.transaction();
    let root = tx.add_spec(&spec, &NodeRegistry::new(), &bank).unwrap();
    tx.add_output(root);
    tx.commit().unwrap();

    let mut sink = DummySink::new(DummyClock::Manual);
    sink.init(
        &SinkConfig::from_graph(&config(), None),
        renderer.into_callback(2),
    )
    .unwrap();
    sink.start().unwrap();
    let out = sink.pump(12).unwrap();
    sink.destroy().unwrap();

    let left: Vec<f32> = out.iter().step_by(2).copied().collect();
    assert_eq!(left.len(), 5760);
    assert_eq!(left[0], 0.0);
    assert!(left[1..4800].iter().all(|&s| s > 0.0));
    assert!(left[4800..].iter().all(|&s| s == 0.0));
}

#[test]
fn mutation_while_running() {
    let (mut handle, renderer) = engine(config()).unwrap();
    let registry = NodeRegistry::new();
    let bank = BufferBank::new();

    let mut sink = DummySink::new(DummyClock::Realtime);
    sink.init(
        &SinkConfig {
            block_size: 48,
            ..SinkConfig::from_graph(&config(), None)
        },
        renderer.into_callback(2),
    )
    .unwrap();
    sink.start().unwrap();
    assert_eq!(sink.state(), SinkState::Running);

    let mut ids = Vec::new();
    for freq in [110.0, 220.0, 330.0] {
        let mut tx = handle.transaction();
        let id = tx
            .add_spec(
                &NodeSpec::new("sine").with_constant("frequency", freq),
                &registry,
                &bank,
            )
            .unwrap();
        tx.add_output(id);
        tx.commit().unwrap();
        ids.push(id);
    }

    let mut tx = handle.transaction();
    tx.connect(ids[0], "amplitude", InputSource::Constant(0.1));
    tx.remove_output(ids[2]).remove_node(ids[2]);
    tx.commit().unwrap();
    assert_eq!(handle.node_count(), 2);

    // Four transactions plus one removed node come back once applied.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut collected = 0;
    while collected < 5 && Instant::now() < deadline {
        collected += handle.collect_garbage();
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(collected, 5);
    assert!(sink.frames_rendered() > 0);

    sink.stop().unwrap();
    sink.destroy().unwrap();
}

#[test]
fn swap_buffer_on_live_sampler() {
    let (mut handle, mut renderer) = engine(GraphConfig {
        block_size: 4,
        output_channels: 1,
        ..config()
    })
    .unwrap();

    let mut bank = BufferBank::new();
    bank.insert("a", Buffer::from_channels(vec![vec![0.25; 64]], 48000.0).unwrap());
    let spec = NodeSpec::new("sampler").with_buffer("buffer", "a");

    let mut tx = handle.transaction();
    let sampler = tx.add_spec(&spec, &NodeRegistry::new(), &bank).unwrap();
    tx.add_output(sampler);
    tx.commit().unwrap();
    assert_eq!(renderer.render(4).channel(0), &[0.25; 4]);
    handle.collect_garbage();

    let replacement = Arc::new(Buffer::from_channels(vec![vec![-0.5; 64]], 48000.0).unwrap());
    let mut tx = handle.transaction();
    tx.set_buffer(sampler, "buffer", replacement);
    tx.commit().unwrap();
    assert_eq!(renderer.render(4).channel(0), &[-0.5; 4]);
    // The replaced buffer and the transaction vector.
    assert_eq!(handle.collect_garbage(), 2);
}
