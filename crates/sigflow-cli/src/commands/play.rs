//! Live patch playback command.

use super::common::{EngineOverrides, engine_settings, load_assets, load_patch, validate};
use clap::Args;
use sigflow_io::{CpalSink, DummyClock, DummySink, EngineHandle, OutputSink, SinkConfig, engine};
use sigflow_registry::NodeRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the control loop wakes to reclaim garbage and check for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct PlayArgs {
    /// Patch name or path
    patch: String,

    /// Output device (exact or partial name)
    #[arg(short, long)]
    output: Option<String>,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<f32>,

    /// Render on a real-time clock without opening an audio device
    #[arg(long)]
    dummy: bool,

    #[command(flatten)]
    engine: EngineOverrides,
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let loaded = load_patch(&args.patch)?;
    validate(&loaded)?;
    let config = engine_settings(&loaded, &args.engine)?;
    let limit = args
        .duration
        .map(Duration::try_from_secs_f32)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid --duration: {}", e))?;
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

    println!(
        "Playing '{}' ({} node(s), {} Hz, {} frames/block)",
        loaded.patch.name,
        handle.node_count(),
        config.sample_rate,
        config.block_size
    );
    println!("Press Ctrl+C to stop.\n");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let device = args.output.or(config.output_device.clone());
    let mut sink: Box<dyn OutputSink> = if args.dummy {
        Box::new(DummySink::new(DummyClock::Realtime))
    } else {
        Box::new(CpalSink::new())
    };
    sink.init(
        &SinkConfig::from_graph(&graph_config, device),
        renderer.into_callback(graph_config.output_channels),
    )?;
    sink.start()?;
    tracing::info!(sink = sink.name(), "playback started");

    wait(&running, limit, &handle);

    sink.stop()?;
    sink.destroy()?;
    let reclaimed = handle.collect_garbage();
    tracing::debug!(reclaimed, "playback stopped");
    Ok(())
}

/// Blocks until Ctrl+C or `limit`, dropping whatever the renderer sends back.
fn wait(running: &AtomicBool, limit: Option<Duration>, handle: &EngineHandle) {
    let started = Instant::now();
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
        handle.collect_garbage();
    }
}
