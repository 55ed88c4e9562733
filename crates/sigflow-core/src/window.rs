//! Grain envelope windows.
//!
//! A window maps a grain's phase (`progress / length`, in `[0, 1]`) to an
//! amplitude weight. Both windows are zero at phase 0 and phase 1 and peak at
//! the midpoint, which removes clicks at grain boundaries.

use core::f32::consts::PI;

use libm::cosf;

/// Envelope shape applied to each grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrainWindow {
    /// Linear ramp up to 1.0 at the midpoint and back down.
    #[default]
    Triangle,
    /// Raised cosine.
    Hann,
}

impl GrainWindow {
    /// Envelope weight at `phase`. Phases outside `(0, 1)` weigh zero.
    #[inline]
    pub fn weight(self, phase: f32) -> f32 {
        if !(phase > 0.0 && phase < 1.0) {
            return 0.0;
        }
        match self {
            Self::Triangle => 1.0 - (2.0 * phase - 1.0).abs(),
            Self::Hann => 0.5 - 0.5 * cosf(2.0 * PI * phase),
        }
    }

    /// Parses a window name (`"triangle"` or `"hann"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "triangle" | "tri" => Some(Self::Triangle),
            "hann" | "hanning" => Some(Self::Hann),
            _ => None,
        }
    }
}
