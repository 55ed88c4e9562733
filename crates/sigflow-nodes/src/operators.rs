//! Arithmetic on signals.

use sigflow_core::{Buffer, InputSpec, Inputs, Node};

const MULTIPLY_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("a", 1.0),
    InputSpec::with_default("b", 1.0),
];

const ADD_INPUTS: &[InputSpec] = &[
    InputSpec::with_default("a", 0.0),
    InputSpec::with_default("b", 0.0),
];

/// Binary operator applied frame by frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a * b`, e.g. a signal scaled by an envelope.
    Multiply,
    /// `a + b`.
    Add,
}

/// Combines inputs `a` and `b` per channel and frame.
///
/// The output has as many channels as `a`; `b` wraps over them, so a mono
/// envelope scales every channel of a stereo signal.
#[derive(Debug, Clone, Copy)]
pub struct Operator {
    op: BinaryOp,
}

impl Operator {
    /// Creates an operator node.
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }

    /// Operation this node applies.
    pub fn op(&self) -> BinaryOp {
        self.op
    }
}

impl Node for Operator {
    fn kind(&self) -> &'static str {
        match self.op {
            BinaryOp::Multiply => "multiply",
            BinaryOp::Add => "add",
        }
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        match self.op {
            BinaryOp::Multiply => MULTIPLY_INPUTS,
            BinaryOp::Add => ADD_INPUTS,
        }
    }

    fn matches_input_channels(&self) -> bool {
        true
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (a, b) = (inputs.get(0), inputs.get(1));
        for ch in 0..output.num_channels() {
            let out = output.channel_mut(ch);
            for (f, sample) in out.iter_mut().take(num_frames).enumerate() {
                let (x, y) = (a.sample(ch, f), b.sample(ch, f));
                *sample = match self.op {
                    BinaryOp::Multiply => x * y,
                    BinaryOp::Add => x + y,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigflow_core::{InputSource, NodeId};

    #[test]
    fn test_multiply_broadcasts_mono() {
        let mut stereo = Buffer::new(2, 4, 48000.0);
        stereo.channel_mut(0).fill(0.5);
        stereo.channel_mut(1).fill(-1.0);
        let mut env = Buffer::new(1, 4, 48000.0);
        env.channel_mut(0).copy_from_slice(&[0.0, 0.5, 1.0, 2.0]);
        let outputs = [stereo, env];
        let sources = [
            Some(InputSource::Node(NodeId::from_raw(0))),
            Some(InputSource::Node(NodeId::from_raw(1))),
        ];

        let mut node = Operator::new(BinaryOp::Multiply);
        let mut out = Buffer::new(2, 4, 48000.0);
        node.process(&Inputs::new(&sources, &outputs), &mut out, 4);
        assert_eq!(out.channel(0), &[0.0, 0.25, 0.5, 1.0]);
        assert_eq!(out.channel(1), &[0.0, -0.5, -1.0, -2.0]);
    }

    #[test]
    fn test_add_constants() {
        let sources = [Some(InputSource::Constant(0.25)), Some(InputSource::Constant(0.5))];
        let mut node = Operator::new(BinaryOp::Add);
        let mut out = Buffer::new(1, 3, 48000.0);
        node.process(&Inputs::new(&sources, &[]), &mut out, 3);
        assert_eq!(out.channel(0), &[0.75, 0.75, 0.75]);
        assert_eq!(node.kind(), "add");
    }
}
