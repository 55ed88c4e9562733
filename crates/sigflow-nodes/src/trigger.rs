//! Clock edge detection.

/// Detects rising edges in a clock signal.
///
/// An edge is any frame whose value is strictly greater than the previous
/// frame's value. The previous value carries across blocks, and starts at 0,
/// so a clock that is already high on the very first frame counts as an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct RisingEdge {
    last: f32,
}

impl RisingEdge {
    /// Creates a detector whose previous value is 0.
    pub const fn new() -> Self {
        Self { last: 0.0 }
    }

    /// Feeds one frame and returns true on a rising edge.
    #[inline]
    pub fn step(&mut self, value: f32) -> bool {
        let edge = value > self.last;
        self.last = value;
        edge
    }

    /// Forgets the previous value.
    pub fn reset(&mut self) {
        self.last = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edges() {
        let mut edge = RisingEdge::new();
        let clock = [0.0, 1.0, 1.0, 0.0, 0.5, 0.7, 0.2];
        let edges: Vec<bool> = clock.iter().map(|&v| edge.step(v)).collect();
        assert_eq!(edges, [false, true, false, false, true, true, false]);
    }

    #[test]
    fn test_high_on_first_frame_is_edge() {
        let mut edge = RisingEdge::new();
        assert!(edge.step(1.0));
        edge.reset();
        assert!(edge.step(1.0));
    }
}
