//! Buffer playback.

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
#[cfg(feature = "std")]
use std::sync::Arc;

use sigflow_core::{Buffer, InputSpec, Inputs, Node, WarnOnce};

use crate::trigger::RisingEdge;

const SAMPLER_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("rate", 1.0),
    InputSpec::with_default("clock", 0.0),
    InputSpec::with_default("start", 0.0),
    InputSpec::with_default("loop", 1.0),
];

const SAMPLER_SLOTS: &[&str] = &["buffer"];

/// Plays a source buffer at a variable rate.
///
/// A rising edge on `clock` restarts playback at `start` seconds. With
/// `loop` above 0.5 the read position wraps; otherwise playback stops at
/// either end of the buffer. The output has one channel per source
/// channel.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    buffer: Option<Arc<Buffer>>,
    position: f64,
    playing: bool,
    edge: RisingEdge,
    missing: WarnOnce,
}

impl Sampler {
    /// Creates a sampler with no source attached.
    pub fn new() -> Self {
        Self {
            playing: true,
            ..Self::default()
        }
    }

    /// Read position in source frames.
    pub fn position(&self) -> f64 {
        self.position
    }
}

impl Node for Sampler {
    fn kind(&self) -> &'static str {
        "sampler"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        SAMPLER_INPUTS
    }

    fn buffer_slots(&self) -> &'static [&'static str] {
        SAMPLER_SLOTS
    }

    fn num_output_channels(&self) -> usize {
        self.buffer
            .as_ref()
            .map_or(1, |b| b.num_channels().max(1))
    }

    fn set_buffer(&mut self, _slot: usize, buffer: Arc<Buffer>) -> Option<Arc<Buffer>> {
        self.missing.rearm();
        self.position = 0.0;
        self.buffer.replace(buffer)
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let Some(source) = self.buffer.as_deref().filter(|b| !b.is_empty()) else {
            self.missing.warn("sampler", "no source buffer attached; rendering silence");
            return;
        };
        let (rate, clock, start, looping) =
            (inputs.get(0), inputs.get(1), inputs.get(2), inputs.get(3));
        let len = source.num_frames() as f64;
        let channels = output.num_channels().min(source.num_channels());

        for f in 0..num_frames {
            if self.edge.step(clock.value(f)) {
                self.position = f64::from(start.value(f) * source.sample_rate());
                self.playing = true;
            }
            let looped = looping.value(f) > 0.5;
            if !looped && (self.position < 0.0 || self.position >= len) {
                self.playing = false;
            }
            if !self.playing {
                continue;
            }
            for ch in 0..channels {
                output.channel_mut(ch)[f] = source.get_channel(ch, self.position);
            }
            self.position += f64::from(rate.value(f));
            if looped {
                self.position = self.position.rem_euclid(len);
            }
        }
    }

    fn reset(&mut self) {
        self.position = 0.0;
        self.playing = true;
        self.edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::InputSource;

    fn ramp(frames: usize) -> Arc<Buffer> {
        let mut b = Buffer::new(1, frames, 1000.0);
        for (i, s) in b.channel_mut(0).iter_mut().enumerate() {
            *s = i as f32;
        }
        Arc::new(b)
    }

    fn render(node: &mut Sampler, sources: &[Option<InputSource>], frames: usize) -> Vec<f32> {
        let mut out = Buffer::new(1, frames, 1000.0);
        node.process(&Inputs::new(sources, &[]), &mut out, frames);
        out.channel(0).to_vec()
    }

    #[test]
    fn test_loops_at_half_rate() {
        let mut sampler = Sampler::new();
        sampler.set_buffer(0, ramp(4));
        let sources = [
            Some(InputSource::Constant(0.5)),
            Some(InputSource::Constant(0.0)),
            Some(InputSource::Constant(0.0)),
            Some(InputSource::Constant(1.0)),
        ];
        let out = render(&mut sampler, &sources, 10);
        assert_eq!(out, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 1.5, 0.0, 0.5]);
    }

    #[test]
    fn test_one_shot_stops_and_clock_restarts() {
        let mut sampler = Sampler::new();
        sampler.set_buffer(0, ramp(3));
        let mut sources = [
            Some(InputSource::Constant(1.0)),
            Some(InputSource::Constant(0.0)),
            Some(InputSource::Constant(0.001)),
            Some(InputSource::Constant(0.0)),
        ];
        assert_eq!(render(&mut sampler, &sources, 5), [0.0, 1.0, 2.0, 0.0, 0.0]);

        // A constant high clock is a single rising edge.
        sources[1] = Some(InputSource::Constant(1.0));
        assert_eq!(render(&mut sampler, &sources, 4), [1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_buffer_is_silent() {
        let mut sampler = Sampler::new();
        assert_eq!(sampler.num_output_channels(), 1);
        let out = render(&mut sampler, &[None, None, None, None], 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
