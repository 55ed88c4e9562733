//! Patch validation and schedule inspection command.

use super::common::{
    EngineOverrides, LoadedPatch, engine_settings, load_assets, load_patch, validate,
};
use clap::Args;
use sigflow_core::{Buffer, BufferBank, Graph, NodeSpec};
use sigflow_registry::NodeRegistry;

#[derive(Args)]
pub struct CheckArgs {
    /// Patch name or path
    patch: String,

    /// Substitute silent placeholders for sample files instead of reading them
    #[arg(long)]
    no_assets: bool,

    #[command(flatten)]
    engine: EngineOverrides,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let loaded = load_patch(&args.patch)?;
    validate(&loaded)?;
    let config = engine_settings(&loaded, &args.engine)?;
    let patch = &loaded.patch;

    println!("Patch: {} ({})", patch.name, loaded.origin());
    if let Some(desc) = &patch.description {
        println!("  {}", desc);
    }
    println!(
        "  {} Hz, {} frames/block, {} channel(s)",
        config.sample_rate, config.block_size, config.output_channels
    );

    let specs = patch.output_specs();
    for (i, spec) in specs.iter().enumerate() {
        println!("\nOutput {}:", i);
        print_tree(spec, None, 1);
    }

    let bank = if args.no_assets {
        placeholder_bank(&loaded, config.sample_rate as f32)
    } else {
        load_assets(&loaded)?
    };

    let registry = NodeRegistry::new();
    let mut graph = Graph::new(config.graph_config())?;
    for spec in &specs {
        graph.add_output_spec(spec, &registry, &bank)?;
    }
    graph.compile()?;

    println!("\nRender order ({} node(s)):", graph.node_count());
    for (step, id) in graph.render_order().enumerate() {
        let kind = graph.node(id).map_or("?", |n| n.kind());
        println!("  {:>3}. {:<12} #{}", step + 1, kind, id.index());
    }
    if let Some(schedule) = graph.schedule()
        && schedule.feedback_count() > 0
    {
        println!("  ({} feedback node(s) read one block late)", schedule.feedback_count());
    }

    println!("\nOK");
    Ok(())
}

/// One-frame silent buffer for every declared asset.
fn placeholder_bank(loaded: &LoadedPatch, sample_rate: f32) -> BufferBank {
    let mut bank = BufferBank::new();
    for name in loaded.patch.buffers.keys() {
        bank.insert(name.as_str(), Buffer::new(1, 1, sample_rate));
    }
    bank
}

fn print_tree(spec: &NodeSpec, label: Option<&str>, depth: usize) {
    let indent = "  ".repeat(depth);
    let prefix = label.map(|l| format!("{l}: ")).unwrap_or_default();

    if let Some(value) = spec.value() {
        println!("{indent}{prefix}{value}");
        return;
    }

    let options: Vec<String> = spec.options().map(|(k, v)| format!("{k}={v}")).collect();
    if options.is_empty() {
        println!("{indent}{prefix}{}", spec.name());
    } else {
        println!("{indent}{prefix}{} [{}]", spec.name(), options.join(", "));
    }

    for (name, child) in spec.inputs() {
        print_tree(child, Some(name), depth + 1);
    }
    for (slot, asset) in spec.buffers() {
        println!("{indent}  {slot}: @{asset}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_config::{NodeConfig, Patch};
    use std::path::PathBuf;

    #[test]
    fn test_placeholder_bank_covers_declared_assets() {
        let loaded = LoadedPatch {
            patch: Patch::new("p")
                .with_buffer("voice", "voice.wav")
                .with_buffer("drums", "drums.wav")
                .with_output(NodeConfig::new("sampler").with_buffer("buffer", "voice")),
            base_dir: PathBuf::from("."),
            path: None,
        };
        let bank = placeholder_bank(&loaded, 48000.0);
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get("voice").unwrap().num_frames(), 1);
    }

    #[test]
    fn test_check_factory_patches() {
        for name in sigflow_config::FACTORY_PATCH_NAMES {
            let args = CheckArgs {
                patch: (*name).to_string(),
                no_assets: false,
                engine: EngineOverrides::default(),
            };
            run(args).unwrap();
        }
    }
}
