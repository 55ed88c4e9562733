//! Periodic generators: band-limited oscillators and the impulse clock.

use core::f32::consts::TAU;
use libm::{floorf, sinf};
use sigflow_core::{Buffer, InputSpec, Inputs, Node, RenderContext};

/// Wraps a phase into [0, 1).
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let r = phase - floorf(phase);
    if r >= 1.0 { 0.0 } else { r }
}

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine.
    #[default]
    Sine,
    /// 50% duty square with PolyBLEP edges.
    Square,
    /// Rising sawtooth with a PolyBLEP wrap.
    Saw,
    /// Triangle.
    Triangle,
}

impl Waveform {
    /// Node kind name for this waveform.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Saw => "saw",
            Self::Triangle => "triangle",
        }
    }

    /// Looks a waveform up by its kind name.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "sine" => Some(Self::Sine),
            "square" => Some(Self::Square),
            "saw" => Some(Self::Saw),
            "triangle" => Some(Self::Triangle),
            _ => None,
        }
    }

    #[inline]
    fn sample(self, phase: f32, dt: f32) -> f32 {
        match self {
            Self::Sine => sinf(phase * TAU),
            Self::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, dt) - poly_blep(wrap_phase(phase + 0.5), dt)
            }
            Self::Saw => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Self::Triangle => 1.0 - 4.0 * libm::fabsf(phase - 0.5),
        }
    }
}

/// Two-sample polynomial step correction around a discontinuity at phase 0.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}

const OSC_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("frequency", 440.0),
    InputSpec::with_default("amplitude", 1.0),
];

/// Phase-accumulator oscillator.
///
/// Frequency and amplitude are read per frame, so both accept audio-rate
/// modulation.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    sample_rate: f32,
}

impl Oscillator {
    /// Creates an oscillator starting at phase 0.
    pub fn new(waveform: Waveform, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Current phase in [0, 1).
    pub fn phase(&self) -> f32 {
        self.phase
    }
}

impl Node for Oscillator {
    fn kind(&self) -> &'static str {
        self.waveform.kind()
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        OSC_INPUTS
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let frequency = inputs.get(0);
        let amplitude = inputs.get(1);
        let out = output.channel_mut(0);
        for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
            let dt = frequency.value(f) / self.sample_rate;
            *sample = self.waveform.sample(self.phase, libm::fabsf(dt)) * amplitude.value(f);
            self.phase = wrap_phase(self.phase + dt);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

const IMPULSE_INPUTS: &[InputSpec] = &[InputSpec::with_default("frequency", 1.0)];

/// Clock that emits 1.0 on the first frame of every period and 0.0
/// elsewhere.
///
/// The first frame after construction or reset is a tick. Non-positive
/// frequencies never tick again.
#[derive(Debug, Clone)]
pub struct Impulse {
    phase: f32,
    sample_rate: f32,
    started: bool,
}

impl Impulse {
    /// Creates a clock whose first tick is the next rendered frame.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
            started: false,
        }
    }
}

impl Node for Impulse {
    fn kind(&self) -> &'static str {
        "impulse"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        IMPULSE_INPUTS
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let frequency = inputs.get(0);
        let out = output.channel_mut(0);
        for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
            let tick = if self.started {
                self.phase >= 1.0
            } else {
                self.started = true;
                true
            };
            if tick {
                self.phase -= floorf(self.phase);
            }
            *sample = if tick { 1.0 } else { 0.0 };
            self.phase += (frequency.value(f) / self.sample_rate).max(0.0);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::InputSource;

    fn render(node: &mut dyn Node, sources: &[Option<InputSource>], frames: usize) -> Vec<f32> {
        let mut out = Buffer::new(1, frames, 48000.0);
        node.process(&Inputs::new(sources, &[]), &mut out, frames);
        out.channel(0).to_vec()
    }

    #[test]
    fn test_sine_quarter_period() {
        let mut osc = Oscillator::new(Waveform::Sine, 48000.0);
        let sources = [Some(InputSource::Constant(12000.0)), Some(InputSource::Constant(1.0))];
        let out = render(&mut osc, &sources, 4);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!(out[2].abs() < 1e-5);
        assert!((out[3] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_waveforms_bounded() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform, 48000.0);
            let sources = [Some(InputSource::Constant(997.0)), Some(InputSource::Constant(0.5))];
            for s in render(&mut osc, &sources, 4800) {
                assert!(s.abs() <= 0.5 + 1e-4, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn test_phase_persists_across_blocks() {
        let mut a = Oscillator::new(Waveform::Saw, 48000.0);
        let mut b = Oscillator::new(Waveform::Saw, 48000.0);
        let sources = [Some(InputSource::Constant(100.0)), Some(InputSource::Constant(1.0))];
        let whole = render(&mut a, &sources, 64);
        let mut split = render(&mut b, &sources, 32);
        split.extend(render(&mut b, &sources, 32));
        assert_eq!(whole, split);
    }

    #[test]
    fn test_waveform_names() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Saw, Waveform::Triangle] {
            assert_eq!(Waveform::from_kind(waveform.kind()), Some(waveform));
        }
        assert_eq!(Waveform::from_kind("noise"), None);
    }

    #[test]
    fn test_impulse_ticks_once_per_period() {
        let mut clock = Impulse::new(48000.0);
        let sources = [Some(InputSource::Constant(12000.0))];
        let out = render(&mut clock, &sources, 9);
        assert_eq!(out, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_impulse_zero_frequency_ticks_once() {
        let mut clock = Impulse::new(48000.0);
        let sources = [Some(InputSource::Constant(0.0))];
        let out = render(&mut clock, &sources, 16);
        assert_eq!(out[0], 1.0);
        assert!(out[1..].iter().all(|&s| s == 0.0));
        clock.reset();
        assert_eq!(render(&mut clock, &sources, 1), [1.0]);
    }
}
