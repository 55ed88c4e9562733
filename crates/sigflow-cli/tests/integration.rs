//! Integration tests for sigflow-cli.
//!
//! Tests invoke the built `sigflow` binary the way a user would.

use std::process::Command;
use tempfile::TempDir;

fn sigflow_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sigflow"))
}

fn stdout_of(args: &[&str]) -> String {
    let output = sigflow_bin()
        .args(args)
        .output()
        .expect("failed to run sigflow");
    assert!(
        output.status.success(),
        "sigflow {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_help() {
    let stdout = stdout_of(&["--help"]);
    assert!(stdout.contains("sigflow signal graph CLI"));
    for command in ["play", "render", "check", "nodes", "patches", "devices"] {
        assert!(stdout.contains(command), "help should mention '{command}'");
    }
}

#[test]
fn cli_nodes_lists_every_category() {
    let stdout = stdout_of(&["nodes"]);
    assert!(stdout.contains("Available Nodes"));
    for kind in ["sine", "impulse", "dust", "env", "delay", "granulator", "model"] {
        assert!(stdout.contains(kind), "listing should contain '{kind}'");
    }
    assert!(stdout.contains("Time-Based"));
}

#[test]
fn cli_nodes_details() {
    let stdout = stdout_of(&["nodes", "granulator"]);
    assert!(stdout.contains("Inputs:"));
    assert!(stdout.contains("grain_length"));
    assert!(stdout.contains("Buffer slots:"));
    assert!(stdout.contains("buffers = { buffer = \"my_sample\" }"));
}

#[test]
fn cli_nodes_unknown_kind_fails() {
    let output = sigflow_bin().args(["nodes", "theremin"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown node kind"));
}

#[test]
fn cli_patches_lists_factory() {
    let stdout = stdout_of(&["patches", "--factory"]);
    assert!(stdout.contains("Factory Patches"));
    assert!(!stdout.contains("User Patches"));
}

#[test]
fn cli_check_prints_render_order() {
    let stdout = stdout_of(&["check", "pulse_bursts"]);
    assert!(stdout.contains("Render order"));
    assert!(stdout.contains("impulse"));
    assert!(stdout.contains("multiply"));
    assert!(stdout.trim_end().ends_with("OK"));
}

#[test]
fn cli_check_rejects_unknown_node() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "name = \"Bad\"\n\n[[outputs]]\nnode = \"theremin\"\n",
    )
    .unwrap();

    let output = sigflow_bin()
        .args(["check", path.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("theremin"));
}

#[test]
fn cli_check_no_assets_skips_sample_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cloud.toml");
    std::fs::write(
        &path,
        r#"
name = "Cloud"

[buffers]
voice = "missing.wav"

[[outputs]]
node = "granulator"
buffers = { buffer = "voice" }

[outputs.inputs]
pos = 0.5
clock = { node = "impulse", inputs = { frequency = 10 } }
"#,
    )
    .unwrap();
    let path = path.to_str().unwrap();

    let output = sigflow_bin().args(["check", path]).output().unwrap();
    assert!(!output.status.success(), "missing sample file should fail");

    let stdout = stdout_of(&["check", path, "--no-assets"]);
    assert!(stdout.contains("granulator"));
    assert!(stdout.contains("buffer: @voice"));
}

#[test]
fn cli_render_writes_wav() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("echoes.wav");
    stdout_of(&[
        "render",
        "dust_echoes",
        out.to_str().unwrap(),
        "--duration",
        "0.5",
        "--sample-rate",
        "16000",
    ]);

    let info = sigflow_io::read_wav_info(&out).unwrap();
    assert_eq!(info.sample_rate, 16000);
    assert_eq!(info.num_frames, 8000);
}
