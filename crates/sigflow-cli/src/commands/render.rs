//! Offline patch rendering command.

use super::common::{EngineOverrides, engine_settings, load_assets, load_patch, validate};
use clap::Args;
use sigflow_core::Buffer;
use sigflow_io::{DummyClock, DummySink, OutputSink, SinkConfig, engine, write_wav};
use sigflow_registry::NodeRegistry;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Patch name or path
    patch: String,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Length in seconds
    #[arg(short, long, default_value = "5.0")]
    duration: f32,

    #[command(flatten)]
    engine: EngineOverrides,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !args.duration.is_finite() || args.duration <= 0.0 {
        anyhow::bail!("duration must be positive, got {}", args.duration);
    }

    let loaded = load_patch(&args.patch)?;
    validate(&loaded)?;
    let config = engine_settings(&loaded, &args.engine)?;
    let bank = load_assets(&loaded)?;
    let graph_config = config.graph_config();

    let (mut handle, renderer) = engine(graph_config)?;
    let registry = NodeRegistry::new();
    let mut tx = handle.transaction();
    for spec in loaded.patch.output_specs() {
        let root = tx.add_spec(&spec, &registry, &bank)?;
        tx.add_output(root);
    }
    tx.commit()?;

    let frames = (args.duration * graph_config.sample_rate).ceil() as usize;
    let blocks = frames.div_ceil(graph_config.block_size);

    println!(
        "Rendering '{}' ({} node(s)) to {}...",
        loaded.patch.name,
        handle.node_count(),
        args.output.display()
    );

    let mut sink = DummySink::new(DummyClock::Manual);
    sink.init(
        &SinkConfig::from_graph(&graph_config, None),
        renderer.into_callback(graph_config.output_channels),
    )?;
    sink.start()?;
    let mut samples = sink.pump(blocks)?;
    sink.destroy()?;

    samples.truncate(frames * graph_config.output_channels);
    let buffer = Buffer::from_interleaved(
        &samples,
        graph_config.output_channels,
        graph_config.sample_rate,
    );
    write_wav(&args.output, &buffer)?;

    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    println!(
        "  {} frames, {} channel(s), {:.1}s, peak {:.3}",
        buffer.num_frames(),
        buffer.num_channels(),
        args.duration,
        peak
    );
    if peak > 1.0 {
        tracing::warn!(peak, "output exceeds full scale and will clip in 16-bit players");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_io::read_wav_info;
    use tempfile::TempDir;

    #[test]
    fn test_render_factory_patch_to_wav() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("tone.wav");
        run(RenderArgs {
            patch: "tone".to_string(),
            output: output.clone(),
            duration: 0.25,
            engine: EngineOverrides {
                sample_rate: Some(8000),
                block_size: Some(64),
                channels: Some(2),
            },
        })
        .unwrap();

        let info = read_wav_info(&output).unwrap();
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 2);
        assert_eq!(info.num_frames, 2000);
    }

    #[test]
    fn test_render_rejects_bad_duration() {
        let dir = TempDir::new().unwrap();
        let err = run(RenderArgs {
            patch: "tone".to_string(),
            output: dir.path().join("x.wav"),
            duration: 0.0,
            engine: EngineOverrides::default(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("duration"));
    }
}
