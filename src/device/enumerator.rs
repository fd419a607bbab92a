//! Audio device enumeration over the platform audio layer

use crate::audio::{AudioBackend, AudioFormat};
use std::fmt;
use tracing::{debug, info, warn};

/// Capture or playback side of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Information about an audio device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Human-readable device name, also used as the persisted key
    pub name: String,
    pub direction: Direction,
    /// Preferred stream format reported by the device
    pub format: AudioFormat,
    /// Whether this is the host's default device for its direction
    pub is_default: bool,
    /// Placeholder standing in for an empty device list
    pub is_fallback: bool,
}

impl DeviceInfo {
    /// Placeholder used when the host reports no device at all
    pub fn placeholder(direction: Direction) -> Self {
        Self {
            name: format!("Default {} device", direction),
            direction,
            format: AudioFormat::FALLBACK,
            is_default: true,
            is_fallback: true,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default_marker = if self.is_default { " (default)" } else { "" };
        write!(f, "{}{}", self.name, default_marker)
    }
}

/// Ordered device lists for both directions, never empty
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    pub inputs: Vec<DeviceInfo>,
    pub outputs: Vec<DeviceInfo>,
}

impl DeviceCatalog {
    pub fn devices(&self, direction: Direction) -> &[DeviceInfo] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    pub fn get(&self, direction: Direction, index: usize) -> Option<&DeviceInfo> {
        self.devices(direction).get(index)
    }

    /// Short summary for the status line
    pub fn summary(&self) -> String {
        format!("{} inputs {} outputs", self.inputs.len(), self.outputs.len())
    }
}

/// Lists devices from an audio backend
pub struct DeviceEnumerator<'a, B: AudioBackend> {
    backend: &'a B,
}

impl<'a, B: AudioBackend> DeviceEnumerator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Enumerate one direction, substituting a default descriptor when the
    /// host reports no device
    pub fn enumerate(&self, direction: Direction) -> Vec<DeviceInfo> {
        let devices = match self.backend.devices(direction) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate {} devices: {}", direction, e);
                Vec::new()
            }
        };

        debug!("Found {} {} devices", devices.len(), direction);

        if !devices.is_empty() {
            return devices;
        }

        let fallback = self
            .backend
            .default_device(direction)
            .unwrap_or_else(|| DeviceInfo::placeholder(direction));
        info!("No {} devices listed, falling back to {}", direction, fallback.name);
        vec![fallback]
    }

    /// Enumerate both directions
    pub fn catalog(&self) -> DeviceCatalog {
        let catalog = DeviceCatalog {
            inputs: self.enumerate(Direction::Input),
            outputs: self.enumerate(Direction::Output),
        };
        info!("Device enumeration: {}", catalog.summary());
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::mock::MockBackend;

    #[test]
    fn test_catalog_keeps_platform_order() {
        let backend = MockBackend::new(&["Mic A", "Mic B"], &["Spk A"]);
        let catalog = DeviceEnumerator::new(&backend).catalog();

        let inputs: Vec<_> = catalog.inputs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(inputs, ["Mic A", "Mic B"]);
        assert_eq!(catalog.outputs.len(), 1);
        assert_eq!(catalog.summary(), "2 inputs 1 outputs");
    }

    #[test]
    fn test_empty_direction_uses_default_device() {
        let backend = MockBackend::new(&[], &["Spk A"]).with_default_input("Built-in Mic");
        let inputs = DeviceEnumerator::new(&backend).enumerate(Direction::Input);

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "Built-in Mic");
    }

    #[test]
    fn test_empty_direction_without_default_uses_placeholder() {
        let backend = MockBackend::new(&["Mic A"], &[]);
        let outputs = DeviceEnumerator::new(&backend).enumerate(Direction::Output);

        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_fallback);
        assert_eq!(outputs[0].direction, Direction::Output);
    }

    #[test]
    fn test_enumeration_error_treated_as_empty() {
        let backend = MockBackend::new(&["Mic A"], &["Spk A"]).failing_enumeration();
        let catalog = DeviceEnumerator::new(&backend).catalog();

        assert!(catalog.inputs[0].is_fallback);
        assert!(catalog.outputs[0].is_fallback);
    }
}
