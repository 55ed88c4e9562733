//! Triggered attack/sustain/release envelope.

use sigflow_core::{Buffer, InputSpec, Inputs, Node, RenderContext};

use crate::trigger::RisingEdge;

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    /// At rest, output 0.
    #[default]
    Idle,
    /// Rising linearly towards 1.
    Attack,
    /// Holding at 1.
    Sustain,
    /// Falling linearly towards 0.
    Release,
}

const ENV_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("clock", 0.0),
    InputSpec::with_default("attack", 0.01),
    InputSpec::with_default("sustain", 0.0),
    InputSpec::with_default("release", 0.1),
];

/// Linear ASR envelope started by each rising edge of `clock`.
///
/// `attack`, `sustain` and `release` are durations in seconds. A retrigger
/// restarts the attack from the current level, so overlapping triggers do
/// not click.
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    level: f32,
    held: f32,
    edge: RisingEdge,
    sample_rate: f32,
}

impl Envelope {
    /// Creates an idle envelope.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            held: 0.0,
            edge: RisingEdge::new(),
            sample_rate,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current output level.
    pub fn level(&self) -> f32 {
        self.level
    }

    #[inline]
    fn step(&mut self, attack: f32, sustain: f32, release: f32) {
        match self.stage {
            EnvelopeStage::Idle => {}
            EnvelopeStage::Attack => {
                let frames = attack * self.sample_rate;
                self.level = if frames <= 1.0 { 1.0 } else { self.level + 1.0 / frames };
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.held = 0.0;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.held += 1.0;
                if self.held >= sustain * self.sample_rate {
                    self.stage = EnvelopeStage::Release;
                }
            }
            EnvelopeStage::Release => {
                let frames = release * self.sample_rate;
                self.level = if frames <= 1.0 { 0.0 } else { self.level - 1.0 / frames };
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
    }
}

impl Node for Envelope {
    fn kind(&self) -> &'static str {
        "env"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        ENV_INPUTS
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (clock, attack, sustain, release) =
            (inputs.get(0), inputs.get(1), inputs.get(2), inputs.get(3));
        let out = output.channel_mut(0);
        for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
            if self.edge.step(clock.value(f)) {
                self.stage = EnvelopeStage::Attack;
            }
            *sample = self.level;
            self.step(attack.value(f), sustain.value(f), release.value(f));
        }
    }

    fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.held = 0.0;
        self.edge.reset();
    }
}
