//! Multi-channel sample storage.
//!
//! A [`Buffer`] holds equal-length channels of `f32` samples at a sample rate.
//! It is both the per-node render target and the source material for samplers
//! and granulators, which read it at fractional, wrapping frame positions via
//! [`Buffer::get`].

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::GraphError;
use crate::math::lerp;

/// How [`Buffer::get`] reads between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Truncate to the frame below.
    None,
    /// Linear blend of the two neighbouring frames (wrapping at the end).
    #[default]
    Linear,
}

/// Owned multi-channel audio buffer.
///
/// All channels have the same frame count. A zero-frame buffer is legal and
/// reads as silence.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    channels: Vec<Vec<f32>>,
    sample_rate: f32,
    interpolation: Interpolation,
}

impl Buffer {
    /// Creates a zeroed buffer.
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: f32) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
            sample_rate,
            interpolation: Interpolation::Linear,
        }
    }

    /// Creates a buffer from per-channel sample vectors.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ChannelLengthMismatch`] if the channels differ in length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f32) -> Result<Self, GraphError> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
                return Err(GraphError::ChannelLengthMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
            interpolation: Interpolation::Linear,
        })
    }

    /// Creates a buffer by de-interleaving `samples` into `num_channels` channels.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], num_channels: usize, sample_rate: f32) -> Self {
        let num_channels = num_channels.max(1);
        let frames = samples.len() / num_channels;
        let mut buffer = Self::new(num_channels, frames, sample_rate);
        for (frame, chunk) in samples.chunks_exact(num_channels).enumerate() {
            for (ch, &s) in chunk.iter().enumerate() {
                buffer.channels[ch][frame] = s;
            }
        }
        buffer
    }

    /// Number of frames per channel.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Sets the sample rate without touching the samples.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Duration in seconds, or 0 if the sample rate is not positive.
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate > 0.0 {
            self.num_frames() as f32 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Returns true if the buffer has no frames or no channels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// Read mode used by [`get`](Self::get).
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Sets the read mode used by [`get`](Self::get).
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Samples of one channel. Panics if `ch` is out of range.
    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch]
    }

    /// Mutable samples of one channel. Panics if `ch` is out of range.
    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.channels[ch]
    }

    /// Iterates over all channels.
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Sample at an integer frame, or 0.0 when out of range.
    #[inline]
    pub fn sample(&self, ch: usize, frame: usize) -> f32 {
        self.channels
            .get(ch)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    /// Reads channel 0 at a fractional frame index.
    ///
    /// The index wraps modulo the frame count, so negative and past-the-end
    /// positions are valid.
    #[inline]
    pub fn get(&self, index: f64) -> f32 {
        self.get_channel(0, index)
    }

    /// Reads channel `ch` at a fractional, wrapping frame index.
    ///
    /// Returns 0.0 for a zero-frame buffer or a missing channel.
    pub fn get_channel(&self, ch: usize, index: f64) -> f32 {
        let Some(data) = self.channels.get(ch) else {
            return 0.0;
        };
        let n = data.len();
        if n == 0 || !index.is_finite() {
            return 0.0;
        }
        let len = n as f64;
        let mut pos = index % len;
        if pos < 0.0 {
            pos += len;
        }
        let base = libm::floor(pos);
        let i0 = (base as usize).min(n - 1);
        match self.interpolation {
            Interpolation::None => data[i0],
            Interpolation::Linear => {
                let frac = (pos - base) as f32;
                let i1 = if i0 + 1 == n { 0 } else { i0 + 1 };
                lerp(data[i0], data[i1], frac)
            }
        }
    }

    /// Fills every channel with zeros.
    pub fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }

    /// Resizes to `num_channels` x `num_frames`, zero-filling new samples.
    ///
    /// Changing the frame count within a channel's existing capacity does not
    /// allocate.
    pub fn resize(&mut self, num_channels: usize, num_frames: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for ch in &mut self.channels {
            ch.resize(num_frames, 0.0);
        }
    }

    /// Copies `other` channel by channel, up to the shorter of each dimension.
    pub fn copy_from(&mut self, other: &Buffer) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            let n = dst.len().min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    /// Adds `other` into this buffer.
    ///
    /// A mono source is added to every channel; otherwise channel `c` is added
    /// to channel `c` and extra channels on either side are ignored.
    pub fn accumulate_from(&mut self, other: &Buffer) {
        if other.num_channels() == 1 {
            let src = &other.channels[0];
            for dst in &mut self.channels {
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d += *s;
                }
            }
            return;
        }
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
    }

    /// Writes frames into an interleaved slice with `channels` channels.
    ///
    /// Missing source channels are written as silence. Returns the number of
    /// frames written.
    pub fn write_interleaved(&self, out: &mut [f32], channels: usize) -> usize {
        if channels == 0 {
            return 0;
        }
        let frames = (out.len() / channels).min(self.num_frames());
        for frame in 0..frames {
            for ch in 0..channels {
                out[frame * channels + ch] = self.sample(ch, frame);
            }
        }
        frames
    }
}
