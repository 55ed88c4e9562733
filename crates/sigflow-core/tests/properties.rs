//! Property-based tests for sigflow-core primitives.
//!
//! Tests ring buffer ordering, power-of-two rounding, pan law, window shape,
//! and wrapping buffer reads using proptest for randomized input generation.

use proptest::prelude::*;
use sigflow_core::{Buffer, CircularBuffer, GrainWindow, pan_gains, power_ceil};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any sequence of puts and gets that respects capacity and fill level
    /// returns the samples in the order they were written.
    #[test]
    fn circular_buffer_preserves_order(
        capacity in 1usize..512,
        ops in prop::collection::vec((any::<bool>(), 0usize..128), 1..64),
    ) {
        let mut ring = CircularBuffer::new(capacity);
        let mut next_value = 0u32;
        let mut expected_next = 0u32;

        for (is_put, size) in ops {
            if is_put {
                let count = size.min(ring.free());
                let block: Vec<f32> = (0..count)
                    .map(|i| (next_value + i as u32) as f32)
                    .collect();
                ring.put(&block).unwrap();
                next_value += count as u32;
            } else {
                let count = size.min(ring.len());
                let mut out = vec![0.0; count];
                ring.get(&mut out).unwrap();
                for s in out {
                    prop_assert_eq!(s, expected_next as f32);
                    expected_next += 1;
                }
            }
            prop_assert!(ring.len() <= ring.capacity());
            prop_assert_eq!(ring.len() as u32, next_value - expected_next);
        }
    }

    /// A rejected transfer never changes the fill level.
    #[test]
    fn circular_buffer_rejects_oversized(
        capacity in 1usize..256,
        fill in 0usize..256,
        extra in 1usize..64,
    ) {
        let mut ring = CircularBuffer::new(capacity);
        let fill = fill.min(capacity);
        ring.put(&vec![1.0; fill]).unwrap();

        prop_assert!(ring.put(&vec![0.0; ring.free() + extra]).is_err());
        prop_assert_eq!(ring.len(), fill);

        let mut out = vec![0.0; fill + extra];
        prop_assert!(ring.get(&mut out).is_err());
        prop_assert_eq!(ring.len(), fill);
    }

    /// `power_ceil` returns the smallest power of two not below its input.
    #[test]
    fn power_ceil_is_smallest_power(x in 2usize..(1 << 30)) {
        let p = power_ceil(x);
        prop_assert!(p.is_power_of_two());
        prop_assert!(p >= x);
        prop_assert!(p / 2 < x);
    }

    /// Pan gains stay in [0, 1] and always sum to 1.
    #[test]
    fn pan_gains_sum_to_one(pan in -2.0f32..3.0f32) {
        let (l, r) = pan_gains(pan);
        prop_assert!((0.0..=1.0).contains(&l));
        prop_assert!((0.0..=1.0).contains(&r));
        prop_assert!((l + r - 1.0).abs() < 1e-6);
    }

    /// The triangle window is symmetric and peaks at the midpoint.
    #[test]
    fn triangle_window_symmetric(phase in 0.0f32..=1.0f32) {
        let w = GrainWindow::Triangle;
        prop_assert!((w.weight(phase) - w.weight(1.0 - phase)).abs() < 1e-5);
        prop_assert!(w.weight(phase) <= w.weight(0.5));
        prop_assert!(w.weight(phase) >= 0.0);
    }

    /// Reads wrap: shifting the index by the frame count gives the same sample.
    #[test]
    fn buffer_get_wraps(
        data in prop::collection::vec(-1.0f32..=1.0f32, 1..64),
        index in -1000.0f64..1000.0f64,
    ) {
        let n = data.len() as f64;
        let buffer = Buffer::from_channels(vec![data], 48000.0).unwrap();
        let a = buffer.get(index);
        let b = buffer.get(index + n);
        prop_assert!(a.is_finite());
        prop_assert!((a - b).abs() < 1e-3, "get({index})={a} get({})={b}", index + n);
    }
}
