//! Inference node: streams audio through a block-based model.
//!
//! Models consume fixed blocks of `buffer_size` frames per dimension, which
//! rarely matches the graph's block size. The node bridges the two with one
//! [`CircularBuffer`] per dimension: input accumulates until a model block
//! is full, `perform` runs, and the result is queued for output. The output
//! side is primed with one model block of silence, so the node adds exactly
//! `buffer_size` frames of latency and never starves once running.
//!
//! Loading happens at construction, on the control thread. A load failure,
//! a missing method, or a backend too slow for real time leaves the node in
//! a disabled [`ModelState`]: it renders silence and logs once.
//!
//! In [`ModelMode::Worker`] the backend moves to its own thread on `alloc`
//! and the audio thread only touches lock-free rings. Dropping such a node
//! joins that thread, so it must be dropped off the audio thread.

mod backend;
mod worker;

pub use backend::{InferenceBackend, LoadStatus, ModelInfo, NullBackend};

use std::fmt;
use std::time::{Duration, Instant};

use sigflow_core::{
    Buffer, CircularBuffer, InputSpec, Inputs, Node, RenderContext, WarnOnce, power_ceil,
};

use worker::{Exchange, Worker};

/// Where `perform` runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelMode {
    /// On the audio thread, inside `process`.
    #[default]
    Inline,
    /// On a dedicated thread fed through lock-free rings.
    Worker,
}

impl ModelMode {
    /// Parses `"inline"` or `"worker"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "inline" => Some(Self::Inline),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }
}

/// Warm-up policy: run `perform` up to `max_runs` times and enable the node
/// once `min_runs` of them finished within `limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Warmup {
    /// Longest acceptable single `perform` call.
    pub limit: Duration,
    /// Fast runs required.
    pub min_runs: usize,
    /// Attempts before giving up.
    pub max_runs: usize,
}

impl Default for Warmup {
    fn default() -> Self {
        Self {
            limit: Duration::from_millis(30),
            min_runs: 5,
            max_runs: 64,
        }
    }
}

/// Construction parameters for a [`ModelNode`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model location, interpreted by the backend.
    pub path: String,
    /// Method to run.
    pub method: String,
    /// Requested model block size; 0 uses the model's minimum.
    pub buffer_size: usize,
    /// Inline or worker execution.
    pub mode: ModelMode,
    /// Warm-up policy.
    pub warmup: Warmup,
}

impl ModelConfig {
    /// Config for `method` of the model at `path`, with defaults elsewhere.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            buffer_size: 0,
            mode: ModelMode::Inline,
            warmup: Warmup::default(),
        }
    }
}

/// Whether a model node renders, and why not.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    /// Loaded, warmed up and rendering.
    Ready,
    /// The backend could not load the model.
    LoadFailed(String),
    /// The model has no such method.
    MethodNotFound(String),
    /// No warm-up run met the time limit often enough; holds the best time.
    TooSlow(Duration),
    /// The worker thread could not be started.
    WorkerFailed(String),
}

impl ModelState {
    /// Returns true if the node renders model output.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::LoadFailed(reason) => write!(f, "could not load model: {reason}"),
            Self::MethodNotFound(method) => write!(f, "method does not exist in model: {method}"),
            Self::TooSlow(best) => write!(
                f,
                "could not achieve real-time performance: best run {:.2} ms",
                best.as_secs_f64() * 1000.0
            ),
            Self::WorkerFailed(reason) => write!(f, "could not start model worker: {reason}"),
        }
    }
}

/// Failure to set a model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The loaded model does not list this attribute as settable.
    NotSettable(String),
    /// The backend is not available (never loaded, or owned by the worker).
    Unavailable,
    /// The backend refused the values.
    Rejected(String),
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSettable(name) => write!(f, "attribute '{name}' is not settable in this model"),
            Self::Unavailable => write!(f, "model backend is not available"),
            Self::Rejected(reason) => write!(f, "attribute rejected: {reason}"),
        }
    }
}

impl std::error::Error for AttributeError {}

/// Block size the model runs at, and whether the request was raised.
///
/// Zero selects `higher_ratio`; anything below it is raised to it; anything
/// else is rounded up to a power of two.
pub fn resolve_buffer_size(requested: usize, higher_ratio: usize) -> (usize, bool) {
    let higher_ratio = higher_ratio.max(1);
    if requested == 0 {
        (higher_ratio, false)
    } else if requested < higher_ratio {
        (higher_ratio, true)
    } else {
        (power_ceil(requested), false)
    }
}

fn warm_up(
    backend: &mut dyn InferenceBackend,
    inputs: &[Vec<f32>],
    outputs: &mut [Vec<f32>],
    buffer_size: usize,
    policy: &Warmup,
) -> Result<(), Duration> {
    let mut good = 0;
    let mut best = Duration::MAX;
    for _ in 0..policy.max_runs {
        let start = Instant::now();
        backend.perform(inputs, outputs, buffer_size, 1);
        let elapsed = start.elapsed();
        best = best.min(elapsed);
        if elapsed < policy.limit {
            good += 1;
            if good >= policy.min_runs {
                return Ok(());
            }
        }
    }
    Err(best)
}

const MODEL_INPUTS: &[InputSpec] = &[InputSpec::with_default("input", 0.0)];

/// Circular buffers and model blocks for inline execution.
struct InlineRings {
    inputs: Vec<CircularBuffer>,
    outputs: Vec<CircularBuffer>,
    model_in: Vec<Vec<f32>>,
    model_out: Vec<Vec<f32>>,
    scratch: Vec<f32>,
}

impl InlineRings {
    fn new(info: &ModelInfo, buffer_size: usize) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            model_in: vec![vec![0.0; buffer_size]; info.input_dim],
            model_out: vec![vec![0.0; buffer_size]; info.output_dim],
            scratch: Vec::new(),
        }
    }

    fn size(&mut self, buffer_size: usize, block_size: usize) {
        let in_dim = self.model_in.len();
        let out_dim = self.model_out.len();
        self.inputs = (0..in_dim).map(|_| CircularBuffer::new(buffer_size)).collect();
        self.outputs = (0..out_dim)
            .map(|_| CircularBuffer::new(2 * buffer_size.max(block_size)))
            .collect();
        self.scratch = vec![0.0; buffer_size.max(block_size)];
        self.prime();
    }

    /// Empties every ring and queues one model block of silence per output.
    fn prime(&mut self) {
        for ring in &mut self.inputs {
            ring.reset();
        }
        let silence = &mut self.scratch;
        silence.fill(0.0);
        for (ring, block) in self.outputs.iter_mut().zip(&self.model_out) {
            ring.reset();
            // Rings are at least twice the model block, so one block fits.
            let queued = ring.put(&silence[..block.len().min(silence.len())]);
            debug_assert!(queued.is_ok());
        }
    }
}

/// Runs an [`InferenceBackend`] as a graph node.
///
/// The single `input` feeds model dimension `d` from input channel `d`
/// (wrapping), and each model output dimension becomes an output channel.
pub struct ModelNode {
    config: ModelConfig,
    info: ModelInfo,
    buffer_size: usize,
    state: ModelState,
    attributes: Vec<String>,
    backend: Option<Box<dyn InferenceBackend>>,
    inline: Option<InlineRings>,
    worker: Option<Worker>,
    inactive: WarnOnce,
    starved: WarnOnce,
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelNode")
            .field("config", &self.config)
            .field("info", &self.info)
            .field("buffer_size", &self.buffer_size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ModelNode {
    /// Loads and warms up the model. Never fails; check
    /// [`state`](Self::state) for the outcome.
    pub fn load(mut backend: Box<dyn InferenceBackend>, config: ModelConfig) -> Self {
        let mut node = Self {
            info: ModelInfo::default(),
            buffer_size: config.buffer_size,
            state: ModelState::Ready,
            attributes: Vec::new(),
            backend: None,
            inline: None,
            worker: None,
            inactive: WarnOnce::new(),
            starved: WarnOnce::new(),
            config,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %node.config.path, "loading model");
        match backend.load(&node.config.path, &node.config.method) {
            LoadStatus::Loaded => {}
            LoadStatus::MethodNotFound => {
                node.disable(ModelState::MethodNotFound(node.config.method.clone()));
                return node;
            }
            LoadStatus::Failed(reason) => {
                node.disable(ModelState::LoadFailed(reason));
                return node;
            }
        }

        node.info = backend.info().unwrap_or_default();
        node.attributes = backend.settable_attributes();
        let (size, raised) = resolve_buffer_size(node.config.buffer_size, node.info.higher_ratio);
        node.buffer_size = size;
        if raised {
            #[cfg(feature = "tracing")]
            tracing::warn!("model buffer size too small, switching to {size}");
        }

        let mut rings = InlineRings::new(&node.info, size);
        let warm = warm_up(
            backend.as_mut(),
            &rings.model_in,
            &mut rings.model_out,
            size,
            &node.config.warmup,
        );
        node.backend = Some(backend);
        match warm {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(buffer_size = size, "model loaded");
                node.inline = Some(rings);
            }
            Err(best) => node.disable(ModelState::TooSlow(best)),
        }
        node
    }

    fn disable(&mut self, state: ModelState) {
        #[cfg(feature = "tracing")]
        tracing::warn!(path = %self.config.path, "{state}");
        self.state = state;
    }

    /// Current state.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Shape of the loaded method (all ones when nothing loaded).
    pub fn info(&self) -> ModelInfo {
        self.info
    }

    /// Model block size in frames; also the node's latency.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Attributes the model accepts.
    pub fn settable_attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Forwards an attribute to the backend after checking it is settable.
    ///
    /// # Errors
    ///
    /// See [`AttributeError`]. In worker mode the backend is unavailable
    /// once the node has been allocated.
    pub fn set_attribute(&mut self, name: &str, values: &[String]) -> Result<(), AttributeError> {
        if !self.attributes.iter().any(|a| a == name) {
            #[cfg(feature = "tracing")]
            tracing::warn!("argument name not settable in current model: {name}");
            return Err(AttributeError::NotSettable(name.into()));
        }
        let backend = self.backend.as_mut().ok_or(AttributeError::Unavailable)?;
        backend.set_attribute(name, values).map_err(|reason| {
            #[cfg(feature = "tracing")]
            tracing::warn!("model rejected attribute {name}: {reason}");
            AttributeError::Rejected(reason)
        })
    }

    fn process_inline(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let (Some(rings), Some(backend)) = (self.inline.as_mut(), self.backend.as_mut()) else {
            return;
        };
        let input = inputs.get(0);
        let mut done = 0;
        while done < num_frames {
            let free = rings.inputs.first().map_or(0, CircularBuffer::free);
            let chunk = (num_frames - done).min(free).min(rings.scratch.len());
            if chunk == 0 {
                break;
            }
            for (d, ring) in rings.inputs.iter_mut().enumerate() {
                for (i, s) in rings.scratch[..chunk].iter_mut().enumerate() {
                    *s = input.sample(d, done + i);
                }
                // `chunk` never exceeds the free space of the first ring, and
                // every input ring fills in lockstep.
                let queued = ring.put(&rings.scratch[..chunk]);
                debug_assert!(queued.is_ok());
            }
            done += chunk;

            if rings.inputs.first().is_some_and(CircularBuffer::is_full) {
                for (ring, block) in rings.inputs.iter_mut().zip(&mut rings.model_in) {
                    let drained = ring.get(block);
                    debug_assert!(drained.is_ok());
                }
                backend.perform(&rings.model_in, &mut rings.model_out, self.buffer_size, 1);
                for (ring, block) in rings.outputs.iter_mut().zip(&rings.model_out) {
                    let queued = ring.put(block);
                    debug_assert!(queued.is_ok(), "model output ring overflowed");
                }
            }
        }

        let channels = output.num_channels().min(rings.outputs.len());
        for (ch, ring) in rings.outputs.iter_mut().enumerate().take(channels) {
            if ring.get(&mut output.channel_mut(ch)[..num_frames]).is_err() {
                self.starved
                    .warn("model", "model output ring ran dry; rendering silence");
            }
        }
    }

    fn process_worker(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        let input = inputs.get(0);
        let channels = output.num_channels();
        let status = worker.exchange(
            num_frames,
            |d, f| input.sample(d, f),
            |d, f, value| {
                if d < channels {
                    output.channel_mut(d)[f] = value;
                }
            },
        );
        match status {
            Exchange::Rendered | Exchange::Priming => {}
            Exchange::Overrun => self
                .starved
                .warn("model", "model worker input ring is full; dropping input"),
            Exchange::Underrun => self
                .starved
                .warn("model", "model worker fell behind; rendering silence"),
        }
    }
}

impl Node for ModelNode {
    fn kind(&self) -> &'static str {
        "model"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        MODEL_INPUTS
    }

    fn num_input_channels(&self) -> usize {
        self.info.input_dim.max(1)
    }

    fn num_output_channels(&self) -> usize {
        self.info.output_dim.max(1)
    }

    fn alloc(&mut self, ctx: &RenderContext) {
        if !self.state.is_ready() {
            return;
        }
        match self.config.mode {
            ModelMode::Inline => {
                if let Some(rings) = self.inline.as_mut() {
                    rings.size(self.buffer_size, ctx.block_size);
                }
            }
            ModelMode::Worker => {
                if let Some(previous) = self.worker.take() {
                    self.backend = previous.shutdown();
                }
                let Some(backend) = self.backend.take() else {
                    return;
                };
                match Worker::spawn(
                    backend,
                    self.info.input_dim,
                    self.info.output_dim,
                    self.buffer_size,
                    ctx.block_size,
                ) {
                    Ok(worker) => {
                        self.inline = None;
                        self.worker = Some(worker);
                    }
                    Err(e) => self.disable(ModelState::WorkerFailed(e.to_string())),
                }
            }
        }
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        if !self.state.is_ready() {
            self.inactive.warn("model", "model is disabled; rendering silence");
            return;
        }
        match self.config.mode {
            ModelMode::Inline => self.process_inline(inputs, output, num_frames),
            ModelMode::Worker => self.process_worker(inputs, output, num_frames),
        }
    }

    fn reset(&mut self) {
        if let Some(rings) = self.inline.as_mut() {
            rings.prime();
        }
    }
}
