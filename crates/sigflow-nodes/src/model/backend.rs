//! The inference backend contract.

use std::fmt;

/// Outcome of [`InferenceBackend::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Model and method are ready.
    Loaded,
    /// The model loaded but has no method by that name.
    MethodNotFound,
    /// The model could not be loaded.
    Failed(String),
}

impl LoadStatus {
    /// Returns true for [`LoadStatus::Loaded`].
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::MethodNotFound => write!(f, "method not found"),
            Self::Failed(reason) => write!(f, "load failed: {reason}"),
        }
    }
}

/// Shape of a loaded method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    /// Number of input signals.
    pub input_dim: usize,
    /// Input frames per model step.
    pub input_ratio: usize,
    /// Number of output signals.
    pub output_dim: usize,
    /// Output frames per model step.
    pub output_ratio: usize,
    /// Smallest block size the model accepts.
    pub higher_ratio: usize,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            input_dim: 1,
            input_ratio: 1,
            output_dim: 1,
            output_ratio: 1,
            higher_ratio: 1,
        }
    }
}

/// A loadable inference engine.
///
/// Implementations wrap a model runtime. `perform` is called with one
/// `block_size`-long buffer per input and output dimension.
pub trait InferenceBackend: Send {
    /// Loads the model at `path` and selects `method`.
    fn load(&mut self, path: &str, method: &str) -> LoadStatus;

    /// Shape of the loaded method, or `None` before a successful load.
    fn info(&self) -> Option<ModelInfo>;

    /// Names of attributes [`set_attribute`](Self::set_attribute) accepts.
    fn settable_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Sets a model attribute.
    ///
    /// # Errors
    ///
    /// Returns the backend's diagnostic if it rejects the values.
    fn set_attribute(&mut self, name: &str, _values: &[String]) -> Result<(), String> {
        Err(format!("attribute '{name}' is not supported"))
    }

    /// Runs the model on `block_size` frames.
    fn perform(
        &mut self,
        inputs: &[Vec<f32>],
        outputs: &mut [Vec<f32>],
        block_size: usize,
        batch: usize,
    );
}

/// Backend used when no inference runtime is available. Every load fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl InferenceBackend for NullBackend {
    fn load(&mut self, path: &str, _method: &str) -> LoadStatus {
        LoadStatus::Failed(format!("no inference backend available to load '{path}'"))
    }

    fn info(&self) -> Option<ModelInfo> {
        None
    }

    fn perform(&mut self, _: &[Vec<f32>], outputs: &mut [Vec<f32>], _: usize, _: usize) {
        for out in outputs {
            out.fill(0.0);
        }
    }
}
