//! Output device discovery via cpal.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Channel count of the default output configuration.
    pub channels: u16,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

fn describe(device: &Device, default_name: Option<&str>) -> Option<AudioDevice> {
    let name = device_name(device).ok()?;
    let (channels, default_sample_rate) = device
        .default_output_config()
        .map(|c| (c.channels(), c.sample_rate()))
        .unwrap_or((2, 48000));
    Some(AudioDevice {
        is_default: default_name == Some(name.as_str()),
        name,
        channels,
        default_sample_rate,
    })
}

/// List every output device of the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());
    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    Ok(devices
        .filter_map(|d| describe(&d, default_name.as_deref()))
        .collect())
}

/// The default output device, if the host has one.
pub fn default_device() -> Option<AudioDevice> {
    let host = cpal::default_host();
    let device = host.default_output_device()?;
    let name = device_name(&device).ok();
    describe(&device, name.as_deref())
}

/// Find an output device whose name contains `search` (case-insensitive),
/// or the default device when `search` is `None`.
pub(crate) fn find_output_device(host: &Host, search: Option<&str>) -> Result<Device> {
    let Some(search) = search else {
        return host.default_output_device().ok_or(Error::NoDevice);
    };
    let search_lower = search.to_lowercase();
    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    for device in devices {
        if let Ok(name) = device_name(&device)
            && name.to_lowercase().contains(&search_lower)
        {
            return Ok(device);
        }
    }
    Err(Error::DeviceNotFound(search.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_panic() {
        // Device availability depends on the machine.
        let _ = list_devices();
        let _ = default_device();
    }

    #[test]
    fn test_find_missing_device() {
        let host = cpal::default_host();
        let result = find_output_device(&host, Some("no-such-device-zz-9137"));
        assert!(matches!(
            result,
            Err(Error::DeviceNotFound(_) | Error::Stream(_))
        ));
    }
}
