//! Factory patches bundled with the library.
//!
//! These need no sample files, so they always load and render.

use crate::Patch;

/// Names of the bundled patches.
pub static FACTORY_PATCH_NAMES: &[&str] = &["tone", "pulse_bursts", "dust_echoes", "sample_hold"];

static FACTORY_PATCHES_TOML: &[(&str, &str)] = &[
    ("tone", TONE_PATCH),
    ("pulse_bursts", PULSE_BURSTS_PATCH),
    ("dust_echoes", DUST_ECHOES_PATCH),
    ("sample_hold", SAMPLE_HOLD_PATCH),
];

/// A quiet sine, for checking the output path.
const TONE_PATCH: &str = r#"
name = "Tone"
description = "Quiet 220 Hz sine"

[[outputs]]
node = "sine"
inputs = { frequency = 220, amplitude = 0.2 }
"#;

/// Enveloped noise bursts on a steady clock.
const PULSE_BURSTS_PATCH: &str = r#"
name = "Pulse Bursts"
description = "Noise bursts shaped by a clocked envelope"

[[outputs]]
node = "multiply"

[outputs.inputs.a]
node = "noise"
options = { seed = 7 }
inputs = { min = -0.3, max = 0.3 }

[outputs.inputs.b]
node = "env"

[outputs.inputs.b.inputs]
attack = 0.002
sustain = 0.03
release = 0.2
clock = { node = "impulse", inputs = { frequency = 4 } }
"#;

/// Random impulses through a feedback delay.
const DUST_ECHOES_PATCH: &str = r#"
name = "Dust Echoes"
description = "Sparse clicks smeared by a feedback delay"

[[outputs]]
node = "delay"
options = { max_time = 1.0 }

[outputs.inputs]
time = 0.375
feedback = 0.6

[outputs.inputs.input]
node = "dust"
options = { seed = 11 }
inputs = { density = 20 }
"#;

/// Stepped random pitches driving a square wave.
const SAMPLE_HOLD_PATCH: &str = r#"
name = "Sample and Hold"
description = "Square wave stepping through random pitches"

[[outputs]]
node = "square"
inputs = { amplitude = 0.15 }

[outputs.inputs.frequency]
node = "noise"
options = { seed = 3 }
inputs = { frequency = 6, min = 110, max = 660 }
"#;

/// All factory patches that parse.
pub fn factory_patches() -> Vec<Patch> {
    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| Patch::from_toml(toml).ok())
        .collect()
}

/// Look up a factory patch by key or display name, ignoring case.
pub fn get_factory_patch(name: &str) -> Option<Patch> {
    let name_lower = name.to_lowercase();

    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(key, toml)| Some((key, Patch::from_toml(toml).ok()?)))
        .find(|(key, patch)| {
            key.to_lowercase() == name_lower || patch.name.to_lowercase() == name_lower
        })
        .map(|(_, patch)| patch)
}

/// Keys of all factory patches.
pub fn factory_patch_names() -> Vec<&'static str> {
    FACTORY_PATCHES_TOML.iter().map(|(name, _)| *name).collect()
}

/// Returns true if `name` matches a factory patch.
pub fn is_factory_patch(name: &str) -> bool {
    get_factory_patch(name).is_some()
}
