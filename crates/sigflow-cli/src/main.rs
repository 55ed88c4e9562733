//! sigflow CLI - play, render, and inspect signal graph patches.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sigflow")]
#[command(author, version, about = "sigflow signal graph CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a patch through an audio output device
    Play(commands::play::PlayArgs),

    /// Render a patch offline to a WAV file
    Render(commands::render::RenderArgs),

    /// Validate a patch and show how it will be scheduled
    Check(commands::check::CheckArgs),

    /// List available node kinds and their inputs
    Nodes(commands::nodes::NodesArgs),

    /// List factory and user patches
    Patches(commands::patches::PatchesArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Nodes(args) => commands::nodes::run(args),
        Commands::Patches(args) => commands::patches::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
