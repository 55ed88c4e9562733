//! End-to-end checks: patch files built into graphs through the registry.

use sigflow_config::{
    ConfigError, EngineConfig, NodeConfig, Patch, ValidationError, factory_patches,
    get_factory_patch, validate_patch,
};
use sigflow_core::{Buffer, BufferBank, Graph};
use sigflow_registry::NodeRegistry;
use tempfile::TempDir;

fn build(patch: &Patch, bank: &BufferBank) -> Graph {
    let engine = patch.engine_or(EngineConfig::default());
    let registry = NodeRegistry::new();
    let mut graph = Graph::new(engine.graph_config()).unwrap();
    for spec in patch.output_specs() {
        graph.add_output_spec(&spec, &registry, bank).unwrap();
    }
    graph.compile().unwrap();
    graph
}

#[test]
fn factory_patches_render() {
    for patch in factory_patches() {
        let mut graph = build(&patch, &BufferBank::new());
        let mut peak = 0.0f32;
        for _ in 0..200 {
            let out = graph.render(256);
            peak = out
                .channel(0)
                .iter()
                .fold(peak, |acc, s| acc.max(s.abs()));
            assert!(out.channel(0).iter().all(|s| s.is_finite()), "{}", patch.name);
        }
        assert!(peak > 0.0, "{} rendered silence", patch.name);
    }
}

#[test]
fn granulator_patch_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cloud.toml");
    std::fs::write(
        &path,
        r#"
name = "Cloud"

[engine]
sample_rate = 48000
block_size = 480
output_channels = 2

[buffers]
ramp = "ramp.wav"

[[outputs]]
node = "granulator"
buffers = { buffer = "ramp" }

[outputs.inputs]
pos = 0.0
grain_length = 0.01
max_grains = 4
clock = { node = "impulse", inputs = { frequency = 50 } }
"#,
    )
    .unwrap();

    let patch = Patch::load(&path).unwrap();
    validate_patch(&patch).unwrap();
    assert_eq!(
        patch.buffer_path("ramp", dir.path()),
        Some(dir.path().join("ramp.wav"))
    );

    let ramp: Vec<f32> = (0..48000).map(|i| i as f32 / 48000.0).collect();
    let mut bank = BufferBank::new();
    bank.insert("ramp", Buffer::from_channels(vec![ramp], 48000.0).unwrap());

    let mut graph = build(&patch, &bank);
    let out = graph.render(480);
    assert_eq!(out.num_channels(), 2);
    assert_eq!(out.num_frames(), 480);
    assert!(out.channel(0).iter().any(|&s| s > 0.0));
}

#[test]
fn unknown_buffer_is_rejected_before_building() {
    let patch = Patch::new("broken").with_output(
        NodeConfig::new("sampler").with_buffer("buffer", "missing"),
    );
    assert_eq!(
        validate_patch(&patch),
        Err(ValidationError::UnknownBuffer("missing".into()))
    );
    let err: ConfigError = validate_patch(&patch).unwrap_err().into();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn saved_patch_builds_identically() {
    let dir = TempDir::new().unwrap();
    let original = get_factory_patch("pulse_bursts").unwrap();
    let path = dir.path().join("copy.json");
    original.save(&path).unwrap();
    let loaded = Patch::load(&path).unwrap();
    assert_eq!(loaded, original);

    let mut a = build(&original, &BufferBank::new());
    let mut b = build(&loaded, &BufferBank::new());
    for _ in 0..20 {
        assert_eq!(a.render(256).channel(0), b.render(256).channel(0));
    }
}
