//! Runs a backend on its own thread behind lock-free rings.
//!
//! The audio thread pushes interleaved input frames into one `rtrb` ring and
//! pops interleaved output frames from another. The worker waits until a
//! full model block is queued, runs `perform`, and pushes the result back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};

use super::backend::InferenceBackend;

const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Audio-thread side of a running worker.
pub(crate) struct Worker {
    to_model: Producer<f32>,
    from_model: Consumer<f32>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn InferenceBackend>>>,
    input_dim: usize,
    output_dim: usize,
    buffer_size: usize,
    primed: bool,
}

/// Result of moving one block through the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exchange {
    /// Output was written.
    Rendered,
    /// Still filling the first model block; output is silent.
    Priming,
    /// The input ring was full; the block was dropped.
    Overrun,
    /// Output had started but the worker fell behind.
    Underrun,
}

impl Worker {
    /// Moves `backend` onto a new thread.
    pub fn spawn(
        mut backend: Box<dyn InferenceBackend>,
        input_dim: usize,
        output_dim: usize,
        buffer_size: usize,
        block_size: usize,
    ) -> std::io::Result<Self> {
        let frames = 2 * (buffer_size + block_size);
        let (to_model, mut model_in) = RingBuffer::<f32>::new(frames * input_dim);
        let (mut model_out, from_model) = RingBuffer::<f32>::new(frames * output_dim);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("sigflow-model".into())
            .spawn(move || {
                let mut inputs = vec![vec![0.0; buffer_size]; input_dim];
                let mut outputs = vec![vec![0.0; buffer_size]; output_dim];
                while flag.load(Ordering::Acquire) {
                    let ready = model_in.slots() >= buffer_size * input_dim
                        && model_out.slots() >= buffer_size * output_dim;
                    if !ready {
                        thread::park_timeout(IDLE_WAIT);
                        continue;
                    }
                    for f in 0..buffer_size {
                        for input in &mut inputs {
                            input[f] = model_in.pop().unwrap_or(0.0);
                        }
                    }
                    backend.perform(&inputs, &mut outputs, buffer_size, 1);
                    for f in 0..buffer_size {
                        for output in &outputs {
                            // Room for the whole block was checked above.
                            let pushed = model_out.push(output[f]);
                            debug_assert!(pushed.is_ok());
                        }
                    }
                }
                backend
            })?;

        Ok(Self {
            to_model,
            from_model,
            running,
            handle: Some(handle),
            input_dim,
            output_dim,
            buffer_size,
            primed: false,
        })
    }

    /// Queues `num_frames` input frames and drains as many output frames
    /// into `write`, which receives (dimension, frame, value).
    pub fn exchange(
        &mut self,
        num_frames: usize,
        read: impl Fn(usize, usize) -> f32,
        mut write: impl FnMut(usize, usize, f32),
    ) -> Exchange {
        if self.to_model.slots() < num_frames * self.input_dim {
            return Exchange::Overrun;
        }
        for f in 0..num_frames {
            for d in 0..self.input_dim {
                let pushed = self.to_model.push(read(d, f));
                debug_assert!(pushed.is_ok());
            }
        }

        let queued = self.from_model.slots();
        if !self.primed {
            if queued < self.buffer_size * self.output_dim {
                return Exchange::Priming;
            }
            self.primed = true;
        }
        if queued < num_frames * self.output_dim {
            return Exchange::Underrun;
        }
        for f in 0..num_frames {
            for d in 0..self.output_dim {
                let value = self.from_model.pop().unwrap_or(0.0);
                write(d, f, value);
            }
        }
        Exchange::Rendered
    }

    /// Stops the thread and hands the backend back.
    pub fn shutdown(mut self) -> Option<Box<dyn InferenceBackend>> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Box<dyn InferenceBackend>> {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.take()?;
        handle.thread().unpark();
        handle.join().ok()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
