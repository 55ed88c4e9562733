//! Fixed-capacity ring for bridging mismatched block sizes.
//!
//! The engine renders in small blocks (e.g. 64 frames) while some stages only
//! run efficiently on large ones (e.g. 2048). A [`CircularBuffer`] sits
//! between them: the producer [`put`](CircularBuffer::put)s each small block,
//! and the consumer checks [`is_full`](CircularBuffer::is_full) before
//! [`get`](CircularBuffer::get)ting a large one. It performs no computation.
//!
//! Transfers are all-or-nothing. A `put` larger than the free space or a `get`
//! larger than the fill level is rejected with a [`RingError`] and leaves the
//! ring untouched.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::error::RingError;

/// Single-channel ring buffer with separate read and write cursors.
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    data: Vec<f32>,
    read: usize,
    write: usize,
    len: usize,
}

impl CircularBuffer {
    /// Creates an empty ring holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            read: 0,
            write: 0,
            len: 0,
        }
    }

    /// Maximum number of buffered samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of buffered samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Remaining free space.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// Returns true when the fill level equals the capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Returns true when nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `samples` at the write cursor.
    ///
    /// # Errors
    ///
    /// [`RingError::Overflow`] if `samples` does not fit in the free space.
    pub fn put(&mut self, samples: &[f32]) -> Result<(), RingError> {
        let count = samples.len();
        if count > self.free() {
            return Err(RingError::Overflow {
                requested: count,
                available: self.free(),
            });
        }
        if count == 0 {
            return Ok(());
        }
        let cap = self.capacity();
        let first = count.min(cap - self.write);
        self.data[self.write..self.write + first].copy_from_slice(&samples[..first]);
        self.data[..count - first].copy_from_slice(&samples[first..]);
        self.write = (self.write + count) % cap;
        self.len += count;
        Ok(())
    }

    /// Removes `out.len()` samples from the read cursor into `out`.
    ///
    /// # Errors
    ///
    /// [`RingError::Underflow`] if fewer than `out.len()` samples are buffered.
    pub fn get(&mut self, out: &mut [f32]) -> Result<(), RingError> {
        let count = out.len();
        if count > self.len {
            return Err(RingError::Underflow {
                requested: count,
                available: self.len,
            });
        }
        if count == 0 {
            return Ok(());
        }
        let cap = self.capacity();
        let first = count.min(cap - self.read);
        out[..first].copy_from_slice(&self.data[self.read..self.read + first]);
        out[first..].copy_from_slice(&self.data[..count - first]);
        self.read = (self.read + count) % cap;
        self.len -= count;
        Ok(())
    }

    /// Discards all buffered samples and rewinds both cursors.
    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
        self.len = 0;
        self.data.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let ring = CircularBuffer::new(8);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.free(), 8);
    }

    #[test]
    fn test_put_get_wraps() {
        let mut ring = CircularBuffer::new(4);
        ring.put(&[1.0, 2.0, 3.0]).unwrap();
        let mut out = [0.0; 2];
        ring.get(&mut out).unwrap();
        assert_eq!(out, [1.0, 2.0]);

        // Write cursor wraps past the end.
        ring.put(&[4.0, 5.0, 6.0]).unwrap();
        assert!(ring.is_full());

        let mut out = [0.0; 4];
        ring.get(&mut out).unwrap();
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_overflow_rejected_without_side_effects() {
        let mut ring = CircularBuffer::new(4);
        ring.put(&[1.0, 2.0, 3.0]).unwrap();
        let err = ring.put(&[4.0, 5.0]).unwrap_err();
        assert_eq!(
            err,
            RingError::Overflow {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(ring.len(), 3);

        let mut out = [0.0; 3];
        ring.get(&mut out).unwrap();
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_underflow_rejected_without_side_effects() {
        let mut ring = CircularBuffer::new(4);
        ring.put(&[1.0]).unwrap();
        let mut out = [0.0; 2];
        assert_eq!(
            ring.get(&mut out).unwrap_err(),
            RingError::Underflow {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(ring.len(), 1);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut ring = CircularBuffer::new(0);
        assert!(ring.is_full());
        assert!(ring.is_empty());
        ring.put(&[]).unwrap();
        ring.get(&mut []).unwrap();
        assert!(ring.put(&[1.0]).is_err());
    }

    #[test]
    fn test_small_blocks_fill_large_block() {
        let mut ring = CircularBuffer::new(2048);
        let mut expected = Vec::with_capacity(2048);
        for call in 1..=32 {
            let block: Vec<f32> = (0..64).map(|i| ((call - 1) * 64 + i) as f32).collect();
            ring.put(&block).unwrap();
            expected.extend_from_slice(&block);
            assert_eq!(ring.is_full(), call == 32, "call {call}");
        }
        let mut out = vec![0.0; 2048];
        ring.get(&mut out).unwrap();
        assert_eq!(out, expected);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut ring = CircularBuffer::new(4);
        ring.put(&[1.0, 2.0]).unwrap();
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 4);
    }
}
