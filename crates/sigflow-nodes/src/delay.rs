//! Delay lines: a feedback echo and the one-block feedback tap.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use sigflow_core::{Buffer, InputSpec, Inputs, Node, RenderContext};

const DELAY_INPUTS: &[InputSpec] = &[
    InputSpec::required("input"),
    InputSpec::with_default("time", 0.25),
    InputSpec::with_default("feedback", 0.0),
];

/// Echo with a fractional, modulatable delay time.
///
/// One line per channel is allocated up front for `max_time` seconds.
/// Channels beyond the allocated count render silence. `time` is clamped to
/// the line length and `feedback` to [0, 0.99].
#[derive(Debug, Clone)]
pub struct Delay {
    lines: Vec<Vec<f32>>,
    write: usize,
    channels: usize,
    max_time: f32,
    sample_rate: f32,
}

impl Delay {
    /// Creates a delay with room for `max_time` seconds on `channels`
    /// channels.
    pub fn new(max_time: f32, channels: usize, sample_rate: f32) -> Self {
        let mut delay = Self {
            lines: Vec::new(),
            write: 0,
            channels: channels.max(1),
            max_time: max_time.max(0.0),
            sample_rate,
        };
        delay.allocate();
        delay
    }

    /// Longest delay in seconds.
    pub fn max_time(&self) -> f32 {
        self.max_time
    }

    fn allocate(&mut self) {
        let len = (self.max_time * self.sample_rate) as usize + 2;
        self.lines = vec![vec![0.0; len]; self.channels];
        self.write = 0;
    }
}

impl Node for Delay {
    fn kind(&self) -> &'static str {
        "delay"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        DELAY_INPUTS
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        if ctx.sample_rate != self.sample_rate {
            self.sample_rate = ctx.sample_rate;
            self.allocate();
        }
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (input, time, feedback) = (inputs.get(0), inputs.get(1), inputs.get(2));
        let Some(len) = self.lines.first().map(Vec::len) else {
            return;
        };
        let channels = output.num_channels().min(self.lines.len());
        let max_delay = (len - 2) as f32;

        for f in 0..num_frames {
            let delay = (time.value(f) * self.sample_rate).clamp(0.0, max_delay);
            let fb = feedback.value(f).clamp(0.0, 0.99);
            let read = self.write as f32 + len as f32 - delay;
            let i0 = read as usize % len;
            let i1 = (i0 + 1) % len;
            let frac = read - libm::floorf(read);

            for ch in 0..channels {
                let line = &mut self.lines[ch];
                let delayed = line[i0] + (line[i1] - line[i0]) * frac;
                let dry = input.sample(ch, f);
                line[self.write] = dry + delayed * fb;
                output.channel_mut(ch)[f] = delayed;
            }
            self.write = (self.write + 1) % len;
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write = 0;
    }
}

const FEEDBACK_INPUTS: &[InputSpec] = &[InputSpec::required("input")];

/// Emits its input exactly one block late.
///
/// Its input is captured after the whole graph has rendered, so it may read
/// from any node downstream of itself. This is the only way to close a loop
/// in a graph.
#[derive(Debug, Clone)]
pub struct Feedback {
    held: Buffer,
    channels: usize,
}

impl Feedback {
    /// Creates a feedback tap with a fixed channel count.
    pub fn new(channels: usize) -> Self {
        Self {
            held: Buffer::default(),
            channels: channels.max(1),
        }
    }
}

impl Node for Feedback {
    fn kind(&self) -> &'static str {
        "feedback"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        FEEDBACK_INPUTS
    }

    fn num_output_channels(&self) -> usize {
        self.channels
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.held = Buffer::new(self.channels, ctx.block_size, ctx.sample_rate);
    }

    fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let n = num_frames.min(self.held.num_frames());
        for ch in 0..output.num_channels().min(self.channels) {
            output.channel_mut(ch)[..n].copy_from_slice(&self.held.channel(ch)[..n]);
        }
    }

    fn delays_inputs(&self) -> bool {
        true
    }

    fn capture(&mut self, inputs: &Inputs<'_>, num_frames: usize) {
        let input = inputs.get(0);
        let n = num_frames.min(self.held.num_frames());
        for ch in 0..self.channels {
            let held = self.held.channel_mut(ch);
            for (f, sample) in held.iter_mut().take(n).enumerate() {
                *sample = input.sample(ch, f);
            }
        }
    }

    fn reset(&mut self) {
        self.held.clear();
    }
}
