//! Mathematical utility functions for signal graphs.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! - [`power_ceil`] - Round a block size up to a power of two
//! - [`seconds_to_frames`] - Time to fractional frame conversion
//! - [`pan_gains`] - Linear two-channel pan law
//! - [`lerp`] - Linear interpolation

/// Returns the smallest power of two that is greater than or equal to `x`.
///
/// Values of 0 and 1 both map to 1.
///
/// # Example
/// ```rust
/// use sigflow_core::power_ceil;
///
/// assert_eq!(power_ceil(1), 1);
/// assert_eq!(power_ceil(3), 4);
/// assert_eq!(power_ceil(1024), 1024);
/// assert_eq!(power_ceil(1025), 2048);
/// ```
#[inline]
pub fn power_ceil(x: usize) -> usize {
    if x <= 1 {
        return 1;
    }
    let mut power = 2;
    let mut rest = (x - 1) >> 1;
    while rest != 0 {
        power <<= 1;
        rest >>= 1;
    }
    power
}

/// Converts a duration in seconds into a fractional frame count.
///
/// Grain positions and lengths are kept in `f64` so long sources do not lose
/// sub-frame precision.
#[inline]
pub fn seconds_to_frames(seconds: f32, sample_rate: f32) -> f64 {
    f64::from(seconds) * f64::from(sample_rate)
}

/// Linear pan law for two channels.
///
/// Returns `(left, right)` gains: `(1 - pan, pan)`. `pan` is clamped to
/// `[0, 1]`, so the two gains always sum to 1.
///
/// # Example
/// ```rust
/// use sigflow_core::pan_gains;
///
/// assert_eq!(pan_gains(0.0), (1.0, 0.0));
/// assert_eq!(pan_gains(1.0), (0.0, 1.0));
/// assert_eq!(pan_gains(0.5), (0.5, 0.5));
/// ```
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(0.0, 1.0);
    (1.0 - pan, pan)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
