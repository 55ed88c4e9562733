//! Audio device listing command.

use clap::Args;
use sigflow_io::{default_device, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    /// Show only the default output device
    #[arg(long)]
    default: bool,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    if args.default {
        match default_device() {
            Some(device) => {
                println!("Default Output:");
                println!("  Name: {}", device.name);
                println!("  Channels: {}", device.channels);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
            }
            None => println!("Default Output: None"),
        }
        return Ok(());
    }

    let devices = list_devices()?;
    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    println!("Output Devices");
    println!("==============\n");
    for (idx, device) in devices.iter().enumerate() {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "  [{}] {} ({} ch, {} Hz){}",
            idx, device.name, device.channels, device.default_sample_rate, marker
        );
    }
    println!();
    println!("Tip: select a device by partial name:");
    println!("  sigflow play tone --output \"USB\"");
    Ok(())
}
