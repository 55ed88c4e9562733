//! WAV sample assets.
//!
//! Files load into a [`Buffer`] with one channel per file channel, at the
//! file's own sample rate. Nodes resample on read by comparing that rate to
//! the graph's.

use crate::Result;
use hound::{SampleFormat, WavReader, WavWriter};
use sigflow_core::{Buffer, BufferBank};
use std::path::Path;

/// Header of a sample asset, read without decoding any samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    /// Bits per stored sample; 32 for float files.
    pub bits_per_sample: u16,
    /// True for IEEE float data, false for integer PCM.
    pub float: bool,
    /// Samples per channel.
    pub num_frames: u64,
}

impl WavInfo {
    fn from_reader<R: std::io::Read>(reader: &WavReader<R>) -> Self {
        let spec = reader.spec();
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            float: spec.sample_format == SampleFormat::Float,
            num_frames: u64::from(reader.len()) / u64::from(spec.channels.max(1)),
        }
    }

    /// Length in seconds at the file's own rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames as f64 / f64::from(self.sample_rate)
    }
}

/// Reads the header of a WAV file.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    Ok(WavInfo::from_reader(&WavReader::open(path)?))
}

/// Read a WAV file into a [`Buffer`].
///
/// Integer PCM is scaled to [-1, 1). A file with no samples yields an empty
/// buffer, which nodes treat as silence.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Buffer> {
    let reader = WavReader::open(path)?;
    let info = WavInfo::from_reader(&reader);

    let samples = if info.float {
        reader.into_samples::<f32>().collect::<std::result::Result<Vec<f32>, _>>()?
    } else {
        let scale = 1.0 / (1i64 << (info.bits_per_sample.saturating_sub(1))) as f32;
        let mut samples = Vec::with_capacity(reader.len() as usize);
        for s in reader.into_samples::<i32>() {
            samples.push(s? as f32 * scale);
        }
        samples
    };

    Ok(Buffer::from_interleaved(
        &samples,
        usize::from(info.channels.max(1)),
        info.sample_rate as f32,
    ))
}

/// Write a [`Buffer`] as a 32-bit float WAV file at the buffer's sample rate.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &Buffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.num_channels().max(1) as u16,
        sample_rate: buffer.sample_rate() as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;

    for frame in 0..buffer.num_frames() {
        for ch in 0..buffer.num_channels() {
            writer.write_sample(buffer.sample(ch, frame))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Load every `(name, path)` pair into a new [`BufferBank`].
///
/// Stops at the first file that fails to load.
pub fn load_bank<'a, I, P>(assets: I) -> Result<BufferBank>
where
    I: IntoIterator<Item = (&'a str, P)>,
    P: AsRef<Path>,
{
    let mut bank = BufferBank::new();
    for (name, path) in assets {
        let path = path.as_ref();
        let buffer = read_wav(path).map_err(|e| crate::Error::Asset {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(
            asset = name,
            frames = buffer.num_frames(),
            channels = buffer.num_channels(),
            seconds = buffer.duration_seconds(),
            "loaded sample asset"
        );
        bank.insert(name, buffer);
    }
    Ok(bank)
}
