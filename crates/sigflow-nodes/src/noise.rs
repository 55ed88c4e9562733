//! Random processes: white noise and random impulses.

use sigflow_core::{Buffer, InputSpec, Inputs, Node, RenderContext};

/// Xorshift32 generator.
#[derive(Debug, Clone, Copy)]
pub struct Xorshift {
    state: u32,
}

impl Xorshift {
    /// Seeds the generator. A zero seed is replaced, since xorshift never
    /// leaves the all-zero state.
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x1234_5678 } else { seed },
        }
    }

    /// Next raw value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform value in [-1, 1].
    #[inline]
    pub fn bipolar(&mut self) -> f32 {
        (self.next_u32() as i32 as f32) / (i32::MAX as f32)
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn unipolar(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

impl Default for Xorshift {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}

const NOISE_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("frequency", 0.0),
    InputSpec::with_default("min", -1.0),
    InputSpec::with_default("max", 1.0),
];

/// Uniform noise between `min` and `max`.
///
/// With `frequency` at 0 every frame draws a fresh value. A positive
/// `frequency` holds each value for one period, which makes the node usable
/// as a slow random modulator (e.g. for a granulator's position).
#[derive(Debug, Clone)]
pub struct Noise {
    rng: Xorshift,
    seed: u32,
    held: f32,
    phase: f32,
    sample_rate: f32,
}

impl Noise {
    /// Creates a noise source with the given seed.
    pub fn new(seed: u32, sample_rate: f32) -> Self {
        let mut rng = Xorshift::new(seed);
        let held = rng.unipolar();
        Self {
            rng,
            seed,
            held,
            phase: 0.0,
            sample_rate,
        }
    }
}

impl Node for Noise {
    fn kind(&self) -> &'static str {
        "noise"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        NOISE_INPUTS
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (frequency, min, max) = (inputs.get(0), inputs.get(1), inputs.get(2));
        let out = output.channel_mut(0);
        for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
            let freq = frequency.value(f);
            if freq <= 0.0 {
                self.held = self.rng.unipolar();
            } else {
                self.phase += freq / self.sample_rate;
                if self.phase >= 1.0 {
                    self.phase -= libm::floorf(self.phase);
                    self.held = self.rng.unipolar();
                }
            }
            let (lo, hi) = (min.value(f), max.value(f));
            *sample = lo + (hi - lo) * self.held;
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.seed, self.sample_rate);
    }
}

const DUST_INPUTS: &[InputSpec] = &[InputSpec::with_default("density", 10.0)];

/// Random impulses at an average rate of `density` per second.
///
/// Each impulse is a single frame with a random amplitude in (0, 1]; all
/// other frames are 0. Every impulse is a rising edge, so dust works as an
/// irregular clock.
#[derive(Debug, Clone)]
pub struct Dust {
    rng: Xorshift,
    seed: u32,
    sample_rate: f32,
}

impl Dust {
    /// Creates a dust source with the given seed.
    pub fn new(seed: u32, sample_rate: f32) -> Self {
        Self {
            rng: Xorshift::new(seed),
            seed,
            sample_rate,
        }
    }
}

impl Node for Dust {
    fn kind(&self) -> &'static str {
        "dust"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        DUST_INPUTS
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let density = inputs.get(0);
        let out = output.channel_mut(0);
        for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
            let threshold = density.value(f).max(0.0) / self.sample_rate;
            let r = self.rng.unipolar();
            *sample = if r < threshold { 1.0 - r / threshold * 0.999 } else { 0.0 };
        }
    }

    fn reset(&mut self) {
        self.rng = Xorshift::new(self.seed);
    }
}
