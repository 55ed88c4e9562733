//! Constant-valued node.

use sigflow_core::{Buffer, CONSTANT_KIND, InputSpec, Inputs, Node};

/// Emits the same value on every frame.
///
/// Constant inputs are normally wired directly without a node; this kind
/// exists for constant leaves used as a graph output or for a value that is
/// changed in place at runtime.
#[derive(Debug, Clone, Copy)]
pub struct Constant {
    value: f32,
}

impl Constant {
    /// Creates a constant node.
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Replaces the value from the next block on.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }
}

impl Node for Constant {
    fn kind(&self) -> &'static str {
        CONSTANT_KIND
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        &[]
    }

    fn process(&mut self, _inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        for ch in 0..output.num_channels() {
            output.channel_mut(ch)[..num_frames].fill(self.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_block() {
        let mut node = Constant::new(0.3);
        let mut out = Buffer::new(1, 8, 48000.0);
        node.process(&Inputs::new(&[], &[]), &mut out, 8);
        assert!(out.channel(0).iter().all(|&s| s == 0.3));
        node.set_value(-1.0);
        node.process(&Inputs::new(&[], &[]), &mut out, 4);
        assert_eq!(out.channel(0)[3], -1.0);
        assert_eq!(out.channel(0)[4], 0.3);
    }
}
