//! Output sinks: where rendered blocks go.
//!
//! A sink owns a render callback and drives it from its own clock. Every
//! sink follows the same lifecycle:
//!
//! ```text
//! Uninitialized --init--> Stopped --start--> Running
//!       ^                    ^  <----stop----   |
//!       +------destroy-------+------------------+
//! ```
//!
//! `start` on a running sink and `stop` on a stopped one are no-ops;
//! `destroy` is always allowed and releases the callback.

use crate::{Error, Result};
use sigflow_core::GraphConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Fills an interleaved block of output samples.
///
/// Called on the sink's real-time thread: no allocation, no locks, no I/O.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Stream settings a sink is initialised with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per callback.
    pub block_size: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Device name filter; the default device when `None`.
    pub device: Option<String>,
}

impl SinkConfig {
    /// Settings matching a graph's render configuration.
    pub fn from_graph(config: &GraphConfig, device: Option<String>) -> Self {
        Self {
            sample_rate: config.sample_rate as u32,
            block_size: config.block_size as u32,
            channels: config.output_channels as u16,
            device,
        }
    }

    fn samples_per_block(&self) -> usize {
        self.block_size as usize * usize::from(self.channels)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::from_graph(&GraphConfig::default(), None)
    }
}

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Not initialised, or destroyed.
    Uninitialized,
    /// Initialised and paused.
    Stopped,
    /// Delivering blocks.
    Running,
}

impl std::fmt::Display for SinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SinkState::Uninitialized => "uninitialized",
            SinkState::Stopped => "stopped",
            SinkState::Running => "running",
        })
    }
}

/// A destination for rendered audio.
pub trait OutputSink: Send {
    /// Short backend name (e.g. `"dummy"`, `"cpal"`).
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> SinkState;

    /// Prepares the sink and takes ownership of the render callback.
    fn init(&mut self, config: &SinkConfig, render: RenderCallback) -> Result<()>;

    /// Begins calling the render callback.
    fn start(&mut self) -> Result<()>;

    /// Pauses delivery; the callback is kept for a later `start`.
    fn stop(&mut self) -> Result<()>;

    /// Stops delivery and releases the callback and any device resources.
    fn destroy(&mut self) -> Result<()>;
}

fn require(state: SinkState, op: &'static str) -> Result<()> {
    if state == SinkState::Uninitialized {
        Err(Error::InvalidSinkState { op, state })
    } else {
        Ok(())
    }
}

/// How a [`DummySink`] advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DummyClock {
    /// Blocks render only when [`DummySink::pump`] is called.
    #[default]
    Manual,
    /// A background thread renders one block per block period and discards
    /// the samples.
    Realtime,
}

/// Headless sink for tests and machines without audio hardware.
pub struct DummySink {
    clock: DummyClock,
    state: SinkState,
    config: SinkConfig,
    callback: Option<RenderCallback>,
    runner: Option<Runner>,
    frames: Arc<AtomicU64>,
}

struct Runner {
    running: Arc<AtomicBool>,
    thread: JoinHandle<RenderCallback>,
}

impl DummySink {
    /// Creates an uninitialised sink.
    pub fn new(clock: DummyClock) -> Self {
        Self {
            clock,
            state: SinkState::Uninitialized,
            config: SinkConfig::default(),
            callback: None,
            runner: None,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Frames rendered since `init`.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Renders `blocks` blocks synchronously and returns the interleaved
    /// samples. Only available with [`DummyClock::Manual`] while running.
    pub fn pump(&mut self, blocks: usize) -> Result<Vec<f32>> {
        if self.clock != DummyClock::Manual || self.state != SinkState::Running {
            return Err(Error::InvalidSinkState {
                op: "pump",
                state: self.state,
            });
        }
        let Some(callback) = self.callback.as_mut() else {
            return Err(Error::InvalidSinkState {
                op: "pump",
                state: self.state,
            });
        };
        let block = self.config.samples_per_block();
        let mut out = vec![0.0; block * blocks];
        for chunk in out.chunks_mut(block.max(1)) {
            callback(chunk);
        }
        self.frames.fetch_add(
            (blocks * self.config.block_size as usize) as u64,
            Ordering::Relaxed,
        );
        Ok(out)
    }

    fn spawn(&mut self, mut callback: RenderCallback) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let frames = Arc::clone(&self.frames);
        let block_size = self.config.block_size;
        let period = Duration::from_secs_f64(
            f64::from(block_size) / f64::from(self.config.sample_rate.max(1)),
        );
        let mut scratch = vec![0.0; self.config.samples_per_block()];

        let thread = std::thread::Builder::new()
            .name("sigflow-dummy-sink".into())
            .spawn(move || {
                let mut deadline = Instant::now();
                while flag.load(Ordering::Acquire) {
                    scratch.fill(0.0);
                    callback(&mut scratch);
                    frames.fetch_add(u64::from(block_size), Ordering::Relaxed);
                    deadline += period;
                    if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                        std::thread::park_timeout(wait);
                    }
                }
                callback
            })?;

        self.runner = Some(Runner { running, thread });
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        let Some(runner) = self.runner.take() else {
            return Ok(());
        };
        runner.running.store(false, Ordering::Release);
        runner.thread.thread().unpark();
        match runner.thread.join() {
            Ok(callback) => {
                self.callback = Some(callback);
                Ok(())
            }
            Err(_) => Err(Error::Stream("dummy sink thread panicked".into())),
        }
    }
}

impl Default for DummySink {
    fn default() -> Self {
        Self::new(DummyClock::Manual)
    }
}

impl OutputSink for DummySink {
    fn name(&self) -> &str {
        "dummy"
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn init(&mut self, config: &SinkConfig, render: RenderCallback) -> Result<()> {
        if self.state != SinkState::Uninitialized {
            return Err(Error::InvalidSinkState {
                op: "init",
                state: self.state,
            });
        }
        self.config = config.clone();
        self.callback = Some(render);
        self.frames.store(0, Ordering::Relaxed);
        self.state = SinkState::Stopped;
        tracing::debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            channels = config.channels,
            "dummy sink initialized"
        );
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        require(self.state, "start")?;
        if self.state == SinkState::Running {
            return Ok(());
        }
        if self.clock == DummyClock::Realtime
            && let Some(callback) = self.callback.take()
        {
            self.spawn(callback)?;
        }
        self.state = SinkState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        require(self.state, "stop")?;
        self.join()?;
        self.state = SinkState::Stopped;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        let joined = self.join();
        self.callback = None;
        self.state = SinkState::Uninitialized;
        joined
    }
}

impl Drop for DummySink {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            tracing::debug!(error = %e, "dummy sink pump thread ended with an error");
        }
    }
}
