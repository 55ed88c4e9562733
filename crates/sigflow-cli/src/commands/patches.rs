//! Patch listing command.

use clap::Args;
use sigflow_config::{
    Patch, factory_patches, list_user_patches, patch_name_from_path, user_engine_config,
    user_patches_dir,
};

#[derive(Args)]
pub struct PatchesArgs {
    /// Show only factory patches
    #[arg(long, conflicts_with = "user")]
    factory: bool,

    /// Show only user patches
    #[arg(long)]
    user: bool,

    /// Show the directories patches and settings are read from
    #[arg(long)]
    paths: bool,
}

pub fn run(args: PatchesArgs) -> anyhow::Result<()> {
    if args.paths {
        println!("User patches:    {}", user_patches_dir().display());
        println!("Engine settings: {}", user_engine_config().display());
        return Ok(());
    }

    if !args.user {
        println!("Factory Patches:");
        println!("================");
        for patch in factory_patches() {
            let desc = patch.description.as_deref().unwrap_or("");
            println!("  {:20} - {}", patch.name, desc);
        }
        println!();
    }

    if !args.factory {
        println!("User Patches:");
        println!("=============");
        let paths = list_user_patches();
        if paths.is_empty() {
            println!("  (none)");
            println!();
            println!("  Save patches to {}", user_patches_dir().display());
        }
        for path in paths {
            let name = patch_name_from_path(&path).unwrap_or_else(|| "unknown".to_string());
            match Patch::load(&path) {
                Ok(patch) => {
                    let desc = patch.description.as_deref().unwrap_or("");
                    println!("  {:20} - {}", name, desc);
                }
                Err(e) => println!("  {:20} - (error: {})", name, e),
            }
        }
    }

    Ok(())
}
