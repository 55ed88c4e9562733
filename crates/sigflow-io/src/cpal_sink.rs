//! Hardware output through cpal.
//!
//! Supports ALSA (Linux), CoreAudio (macOS), and WASAPI (Windows) through
//! the platform's default host.

use crate::devices::{device_name, find_output_device};
use crate::sink::{OutputSink, RenderCallback, SinkConfig, SinkState};
use crate::{Error, Result};
use cpal::Host;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Output sink backed by a cpal stream.
///
/// `init` opens the device and builds a paused stream, `start`/`stop` play
/// and pause it, `destroy` closes it.
pub struct CpalSink {
    host: Host,
    stream: Option<cpal::Stream>,
    state: SinkState,
    errors: Arc<AtomicU32>,
}

impl CpalSink {
    /// Creates a sink on the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal sink created");
        Self {
            host,
            stream: None,
            state: SinkState::Uninitialized,
            errors: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Stream errors reported by the device since `init`.
    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for CpalSink {
    fn name(&self) -> &str {
        "cpal"
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn init(&mut self, config: &SinkConfig, mut render: RenderCallback) -> Result<()> {
        if self.state != SinkState::Uninitialized {
            return Err(Error::InvalidSinkState {
                op: "init",
                state: self.state,
            });
        }
        let device = find_output_device(&self.host, config.device.as_deref())?;
        let name = device_name(&device).unwrap_or_else(|_| "<unnamed>".into());

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.block_size),
        };

        self.errors.store(0, Ordering::Relaxed);
        let errors = Arc::clone(&self.errors);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render(data);
                },
                move |err| {
                    errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %err, "output stream error");
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        // Some hosts start streams on creation.
        if let Err(e) = stream.pause() {
            tracing::debug!(error = %e, "could not pause new output stream");
        }

        tracing::info!(
            device = %name,
            channels = config.channels,
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            "output stream opened"
        );
        self.stream = Some(stream);
        self.state = SinkState::Stopped;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_ref() else {
            return Err(Error::InvalidSinkState {
                op: "start",
                state: self.state,
            });
        };
        if self.state == SinkState::Running {
            return Ok(());
        }
        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        self.state = SinkState::Running;
        tracing::info!("output stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_ref() else {
            return Err(Error::InvalidSinkState {
                op: "stop",
                state: self.state,
            });
        };
        if self.state == SinkState::Stopped {
            return Ok(());
        }
        stream.pause().map_err(|e| Error::Stream(e.to_string()))?;
        self.state = SinkState::Stopped;
        tracing::info!("output stream stopped");
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        if self.stream.take().is_some() {
            tracing::info!("output stream closed");
        }
        self.state = SinkState::Uninitialized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_sink_name() {
        let sink = CpalSink::new();
        assert_eq!(sink.name(), "cpal");
        assert_eq!(sink.state(), SinkState::Uninitialized);
    }

    #[test]
    fn test_start_before_init_fails() {
        let mut sink = CpalSink::new();
        assert!(matches!(
            sink.start(),
            Err(Error::InvalidSinkState { op: "start", .. })
        ));
        assert!(sink.destroy().is_ok());
    }
}
