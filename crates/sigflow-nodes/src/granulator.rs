//! Granular synthesis over a source buffer.
//!
//! A [`Granulator`] spawns a grain on each rising edge of its clock input.
//! Each grain reads a windowed slice of the source buffer at its own rate
//! and is panned linearly across the first two output channels. Grains live
//! in a fixed-capacity [`GrainPool`] sized before the node reaches the audio
//! thread; spawning and retiring only move indices between a free list and
//! an active list.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use sigflow_core::{
    Buffer, GrainWindow, InputSpec, Inputs, Node, RenderContext, WarnOnce, pan_gains,
    seconds_to_frames,
};

use crate::trigger::RisingEdge;

/// Default upper bound on simultaneously live grains.
pub const DEFAULT_MAX_GRAINS: usize = 2048;

/// One playing grain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Grain {
    /// First source frame read.
    pub start: f64,
    /// Source frames advanced so far.
    pub progress: f64,
    /// Source frames to play before the grain ends.
    pub length: f64,
    /// Source frames advanced per output frame. Always positive.
    pub speed: f64,
    /// +1 for forward playback, -1 for reverse.
    pub direction: f64,
    /// Pan position in [0, 1].
    pub pan: f32,
}

impl Grain {
    /// Builds a grain, or `None` if it could never finish: a non-positive
    /// length or a zero or non-finite rate.
    pub fn new(start: f64, length: f64, rate: f64, pan: f32) -> Option<Self> {
        if !(length > 0.0 && length.is_finite() && rate.is_finite() && rate != 0.0) {
            return None;
        }
        Some(Self {
            start,
            progress: 0.0,
            length,
            speed: rate.abs(),
            direction: rate.signum(),
            pan: pan.clamp(0.0, 1.0),
        })
    }

    /// Source frame read on the current output frame.
    #[inline]
    pub fn read_position(&self) -> f64 {
        self.start + self.progress * self.direction
    }

    /// Position within the grain, from 0 at the start to 1 at the end.
    #[inline]
    pub fn phase(&self) -> f32 {
        (self.progress / self.length) as f32
    }

    /// Returns true once the grain has played its full length.
    #[inline]
    pub fn finished(&self) -> bool {
        self.progress >= self.length
    }
}

/// Fixed-capacity grain arena with a free list.
#[derive(Debug, Clone, Default)]
pub struct GrainPool {
    slots: Vec<Grain>,
    free: Vec<usize>,
    active: Vec<usize>,
}

impl GrainPool {
    /// Allocates room for `capacity` grains.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Grain::default(); capacity],
            free: (0..capacity).rev().collect(),
            active: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of live grains.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live grains.
    pub fn live(&self) -> usize {
        self.active.len()
    }

    /// Returns true if no grain is playing.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Claims a free slot for `grain`. Returns false when the pool is full.
    pub fn spawn(&mut self, grain: Grain) -> bool {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = grain;
                self.active.push(slot);
                true
            }
            None => false,
        }
    }

    /// Live grains, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Grain> {
        self.active.iter().map(|&slot| &self.slots[slot])
    }

    /// Retires every live grain.
    pub fn clear(&mut self) {
        self.free.extend(self.active.drain(..));
    }

    /// Runs `f` on each live grain and retires those for which it returns
    /// false.
    #[inline]
    fn update(&mut self, mut f: impl FnMut(&mut Grain) -> bool) {
        let mut k = 0;
        while k < self.active.len() {
            let slot = self.active[k];
            if f(&mut self.slots[slot]) {
                k += 1;
            } else {
                self.active.swap_remove(k);
                self.free.push(slot);
            }
        }
    }
}

const GRANULATOR_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("clock", 0.0),
    InputSpec::with_default("pos", 0.0),
    InputSpec::with_default("grain_length", 0.1),
    InputSpec::with_default("rate", 1.0),
    InputSpec::with_default("pan", 0.5),
    InputSpec::with_default("max_grains", DEFAULT_MAX_GRAINS as f32),
];

const GRANULATOR_SLOTS: &[&str] = &["buffer"];

mod input {
    pub const CLOCK: usize = 0;
    pub const POS: usize = 1;
    pub const LENGTH: usize = 2;
    pub const RATE: usize = 3;
    pub const PAN: usize = 4;
    pub const MAX_GRAINS: usize = 5;
}

/// Clock-driven granulator.
///
/// Inputs, all in seconds where they are times:
///
/// | input | meaning |
/// |-------|---------|
/// | `clock` | a grain spawns on each rising edge |
/// | `pos` | where in the source the grain starts |
/// | `grain_length` | grain duration, in source time |
/// | `rate` | playback speed; negative plays backwards |
/// | `pan` | 0 is fully channel 0, 1 fully channel 1 |
/// | `max_grains` | spawns are skipped while this many grains are live |
///
/// `max_grains` is additionally capped at the pool capacity fixed at
/// construction. With no source buffer (or an empty one) the node renders
/// silence and logs once.
#[derive(Debug, Clone)]
pub struct Granulator {
    buffer: Option<Arc<Buffer>>,
    pool: GrainPool,
    window: GrainWindow,
    channels: usize,
    edge: RisingEdge,
    missing: WarnOnce,
}

impl Granulator {
    /// Creates a granulator with room for `capacity` grains rendering to
    /// `channels` output channels.
    pub fn new(capacity: usize, channels: usize, window: GrainWindow) -> Self {
        Self {
            buffer: None,
            pool: GrainPool::with_capacity(capacity),
            window,
            channels: channels.max(1),
            edge: RisingEdge::new(),
            missing: WarnOnce::new(),
        }
    }

    /// Number of grains currently playing.
    pub fn live_grains(&self) -> usize {
        self.pool.live()
    }

    /// The grain pool.
    pub fn pool(&self) -> &GrainPool {
        &self.pool
    }

    /// Grain amplitude window.
    pub fn window(&self) -> GrainWindow {
        self.window
    }
}

impl Default for Granulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GRAINS, 2, GrainWindow::Triangle)
    }
}

impl Node for Granulator {
    fn kind(&self) -> &'static str {
        "granulator"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        GRANULATOR_INPUTS
    }

    fn buffer_slots(&self) -> &'static [&'static str] {
        GRANULATOR_SLOTS
    }

    fn num_output_channels(&self) -> usize {
        self.channels
    }

    fn alloc(&mut self, _ctx: &RenderContext) {
        self.pool.clear();
    }

    fn set_buffer(&mut self, _slot: usize, buffer: Arc<Buffer>) -> Option<Arc<Buffer>> {
        self.missing.rearm();
        self.buffer.replace(buffer)
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let clock = inputs.get(input::CLOCK);
        let Some(source) = self.buffer.as_deref().filter(|b| !b.is_empty()) else {
            for f in 0..num_frames {
                self.edge.step(clock.value(f));
            }
            self.missing.warn("granulator", "no source buffer attached; rendering silence");
            return;
        };

        let pos = inputs.get(input::POS);
        let length = inputs.get(input::LENGTH);
        let rate = inputs.get(input::RATE);
        let pan = inputs.get(input::PAN);
        let max_grains = inputs.get(input::MAX_GRAINS);
        let source_rate = source.sample_rate();
        let stereo = output.num_channels() >= 2;
        let window = self.window;

        for f in 0..num_frames {
            if self.edge.step(clock.value(f)) {
                let limit = max_grains.value(f).max(0.0) as usize;
                if self.pool.live() < limit {
                    let grain = Grain::new(
                        seconds_to_frames(pos.value(f), source_rate),
                        seconds_to_frames(length.value(f), source_rate),
                        f64::from(rate.value(f)),
                        pan.value(f),
                    );
                    if let Some(grain) = grain {
                        self.pool.spawn(grain);
                    }
                }
            }

            let (mut left, mut right) = (0.0f32, 0.0f32);
            self.pool.update(|grain| {
                let sample = source.get(grain.read_position());
                let value = sample * window.weight(grain.phase());
                grain.progress += grain.speed;
                let (l, r) = pan_gains(grain.pan);
                left += value * l;
                right += value * r;
                !grain.finished()
            });

            if stereo {
                output.channel_mut(0)[f] = left;
                output.channel_mut(1)[f] = right;
            } else {
                output.channel_mut(0)[f] = left + right;
            }
        }
    }

    fn reset(&mut self) {
        self.pool.clear();
        self.edge.reset();
    }
}
