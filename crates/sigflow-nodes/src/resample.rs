//! Sample-rate reduction.

use sigflow_core::{Buffer, InputSpec, Inputs, Node, RenderContext};

/// Channels a [`Resample`] node holds state for. Further channels are silent.
pub const MAX_HELD_CHANNELS: usize = 8;

const RESAMPLE_INPUTS: &[InputSpec] = &[
    InputSpec::required("input"),
    InputSpec::with_default("rate", 8000.0),
];

/// Samples its input at `rate` Hz and holds each value until the next
/// sample point.
#[derive(Debug, Clone)]
pub struct Resample {
    held: [f32; MAX_HELD_CHANNELS],
    phase: f32,
    sample_rate: f32,
}

impl Resample {
    /// Creates a resampler that samples on its first frame.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            held: [0.0; MAX_HELD_CHANNELS],
            phase: 1.0,
            sample_rate,
        }
    }
}

impl Node for Resample {
    fn kind(&self) -> &'static str {
        "resample"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        RESAMPLE_INPUTS
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        self.sample_rate = ctx.sample_rate;
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (input, rate) = (inputs.get(0), inputs.get(1));
        let channels = output.num_channels().min(MAX_HELD_CHANNELS);
        for f in 0..num_frames {
            if self.phase >= 1.0 {
                self.phase -= libm::floorf(self.phase);
                for (ch, held) in self.held.iter_mut().take(channels).enumerate() {
                    *held = input.sample(ch, f);
                }
            }
            for ch in 0..channels {
                output.channel_mut(ch)[f] = self.held[ch];
            }
            self.phase += (rate.value(f) / self.sample_rate).max(0.0);
        }
    }

    fn reset(&mut self) {
        self.held = [0.0; MAX_HELD_CHANNELS];
        self.phase = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::{InputSource, NodeId};

    #[test]
    fn test_holds_between_sample_points() {
        let mut ramp = Buffer::new(1, 8, 8000.0);
        for (i, s) in ramp.channel_mut(0).iter_mut().enumerate() {
            *s = i as f32;
        }
        let outputs = [ramp];
        let sources = [
            Some(InputSource::Node(NodeId::from_raw(0))),
            Some(InputSource::Constant(2000.0)),
        ];
        let mut node = Resample::new(8000.0);
        let mut out = Buffer::new(1, 8, 8000.0);
        node.process(&Inputs::new(&sources, &outputs), &mut out, 8);
        assert_eq!(out.channel(0), &[0.0, 0.0, 0.0, 0.0, 4.0, 4.0, 4.0, 4.0]);
    }
}
