//! Seam between the routing state machine and the platform audio layer

#[cfg(test)]
pub mod mock;

use crate::audio::capture::CpalCapture;
use crate::audio::renderer::CpalRenderer;
use crate::audio::{AudioFormat, SampleSink};
use crate::device::{DeviceInfo, Direction};
use crate::error::{Result, SidetoneError};
use cpal::traits::{DeviceTrait, HostTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// An open capture stream bound to one device
pub trait InputStream {
    fn device_name(&self) -> &str;

    /// Capture gain applied before samples reach the sink
    fn set_volume(&mut self, volume: f32);

    /// Requested callback buffer size in frames
    fn set_buffer_size(&mut self, frames: u32);

    /// Start capturing, pushing every frame into `sink`
    fn start(&mut self, sink: SampleSink) -> Result<()>;

    /// Stop capturing and release the sink
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// An open playback stream bound to one device
pub trait OutputStream {
    fn device_name(&self) -> &str;

    /// Start playback and return the sink feeding it
    fn start(&mut self) -> Result<SampleSink>;

    /// Stop playback; the previously returned sink goes nowhere afterwards
    fn stop(&mut self);

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn is_active(&self) -> bool;
}

/// Platform audio layer: device listing and stream creation
pub trait AudioBackend {
    type Input: InputStream;
    type Output: OutputStream;

    /// Devices for one direction, in platform order
    fn devices(&self, direction: Direction) -> Result<Vec<DeviceInfo>>;

    /// The host's default device, if any
    fn default_device(&self, direction: Direction) -> Option<DeviceInfo>;

    fn open_input(&self, device: &DeviceInfo) -> Result<Self::Input>;

    fn open_output(&self, device: &DeviceInfo) -> Result<Self::Output>;
}

/// Last error reported by a stream callback
///
/// Stream error callbacks run on the audio threads; the console reads
/// the slot from the event thread.
#[derive(Debug, Clone, Default)]
pub struct StreamHealth(Arc<Mutex<Option<String>>>);

impl StreamHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, device: &str, message: impl std::fmt::Display) {
        *self.0.lock() = Some(format!("{}: {}", device, message));
    }

    pub fn last_error(&self) -> Option<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        *self.0.lock() = None;
    }
}

/// Audio backend over the default cpal host
pub struct CpalBackend {
    host: cpal::Host,
    health: StreamHealth,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {}", host.id().name());
        Self {
            host,
            health: StreamHealth::new(),
        }
    }

    /// Name of the platform audio host (ALSA, CoreAudio, WASAPI, ...)
    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// Error slot shared with every stream this backend opens
    pub fn health(&self) -> StreamHealth {
        self.health.clone()
    }

    fn default_cpal_device(&self, direction: Direction) -> Option<cpal::Device> {
        match direction {
            Direction::Input => self.host.default_input_device(),
            Direction::Output => self.host.default_output_device(),
        }
    }

    fn cpal_devices(&self, direction: Direction) -> Result<Vec<cpal::Device>> {
        let devices: Vec<cpal::Device> = match direction {
            Direction::Input => self
                .host
                .input_devices()
                .map_err(|e| SidetoneError::device_error("input", e.to_string()))?
                .collect(),
            Direction::Output => self
                .host
                .output_devices()
                .map_err(|e| SidetoneError::device_error("output", e.to_string()))?
                .collect(),
        };
        Ok(devices)
    }

    /// Find the cpal device matching an enumerated descriptor
    fn find_device(&self, info: &DeviceInfo) -> Result<cpal::Device> {
        if info.is_fallback {
            return Err(SidetoneError::DeviceNotFound(info.name.clone()));
        }

        let found = self
            .cpal_devices(info.direction)?
            .into_iter()
            .find(|d| d.name().map(|n| n == info.name).unwrap_or(false));

        match found {
            Some(device) => Ok(device),
            None if info.is_default => self
                .default_cpal_device(info.direction)
                .ok_or_else(|| SidetoneError::DeviceNotFound(info.name.clone())),
            None => Err(SidetoneError::DeviceNotFound(info.name.clone())),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Input = CpalCapture;
    type Output = CpalRenderer;

    fn devices(&self, direction: Direction) -> Result<Vec<DeviceInfo>> {
        let default_name = self
            .default_cpal_device(direction)
            .and_then(|d| d.name().ok());

        let devices = self
            .cpal_devices(direction)?
            .iter()
            .filter_map(|device| describe(device, direction, default_name.as_deref()))
            .collect();

        Ok(devices)
    }

    fn default_device(&self, direction: Direction) -> Option<DeviceInfo> {
        let device = self.default_cpal_device(direction)?;
        let mut info = describe(&device, direction, None)?;
        info.is_default = true;
        Some(info)
    }

    fn open_input(&self, device: &DeviceInfo) -> Result<CpalCapture> {
        let cpal_device = self.find_device(device)?;
        CpalCapture::new(cpal_device, device.name.clone(), self.health.clone())
    }

    fn open_output(&self, device: &DeviceInfo) -> Result<CpalRenderer> {
        let cpal_device = self.find_device(device)?;
        CpalRenderer::new(cpal_device, device.name.clone(), self.health.clone())
    }
}

/// Build a descriptor for a cpal device; devices without a name are skipped
fn describe(
    device: &cpal::Device,
    direction: Direction,
    default_name: Option<&str>,
) -> Option<DeviceInfo> {
    let name = device.name().ok()?;

    let config = match direction {
        Direction::Input => device.default_input_config(),
        Direction::Output => device.default_output_config(),
    };

    let format = match config {
        Ok(config) => AudioFormat {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            encoding: config.sample_format().into(),
        },
        Err(e) => {
            debug!("No preferred {} format for {}: {}", direction, name, e);
            AudioFormat::FALLBACK
        }
    };

    let is_default = default_name == Some(name.as_str());

    Some(DeviceInfo {
        name,
        direction,
        format,
        is_default,
        is_fallback: false,
    })
}
