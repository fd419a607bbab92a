//! Recording backend for exercising the routing state machine without audio hardware

use crate::audio::backend::{AudioBackend, InputStream, OutputStream};
use crate::audio::{sample_link, AudioFormat, SampleSink};
use crate::device::{DeviceInfo, Direction};
use crate::error::{Result, SidetoneError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered log of every call the engine made into the backend
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

pub struct MockBackend {
    inputs: Vec<DeviceInfo>,
    outputs: Vec<DeviceInfo>,
    default_input: Option<DeviceInfo>,
    failing_enumeration: bool,
    unavailable: Vec<String>,
    failing_start: Vec<String>,
    pub log: CallLog,
}

fn device(name: &str, direction: Direction) -> DeviceInfo {
    DeviceInfo {
        name: name.to_string(),
        direction,
        format: AudioFormat::FALLBACK,
        is_default: false,
        is_fallback: false,
    }
}

impl MockBackend {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|n| device(n, Direction::Input)).collect(),
            outputs: outputs.iter().map(|n| device(n, Direction::Output)).collect(),
            default_input: None,
            failing_enumeration: false,
            unavailable: Vec::new(),
            failing_start: Vec::new(),
            log: CallLog::default(),
        }
    }

    pub fn with_default_input(mut self, name: &str) -> Self {
        let mut info = device(name, Direction::Input);
        info.is_default = true;
        self.default_input = Some(info);
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.failing_enumeration = true;
        self
    }

    /// Opening this device fails, as if it was unplugged
    pub fn unavailable(mut self, name: &str) -> Self {
        self.unavailable.push(name.to_string());
        self
    }

    /// Opening succeeds but starting the stream fails
    pub fn failing_start(mut self, name: &str) -> Self {
        self.failing_start.push(name.to_string());
        self
    }

    fn check_open(&self, device: &DeviceInfo) -> Result<()> {
        if device.is_fallback || self.unavailable.contains(&device.name) {
            self.log.push(format!("open failed {}", device.name));
            return Err(SidetoneError::DeviceNotFound(device.name.clone()));
        }
        Ok(())
    }
}

impl AudioBackend for MockBackend {
    type Input = MockInput;
    type Output = MockOutput;

    fn devices(&self, direction: Direction) -> Result<Vec<DeviceInfo>> {
        if self.failing_enumeration {
            return Err(SidetoneError::device_error("mock", "enumeration failed"));
        }
        Ok(match direction {
            Direction::Input => self.inputs.clone(),
            Direction::Output => self.outputs.clone(),
        })
    }

    fn default_device(&self, direction: Direction) -> Option<DeviceInfo> {
        match direction {
            Direction::Input => self.default_input.clone(),
            Direction::Output => None,
        }
    }

    fn open_input(&self, device: &DeviceInfo) -> Result<MockInput> {
        self.check_open(device)?;
        self.log.push(format!("open input {}", device.name));
        Ok(MockInput {
            name: device.name.clone(),
            volume: 0.0,
            buffer_frames: None,
            sink: None,
            fail_start: self.failing_start.contains(&device.name),
            log: self.log.clone(),
        })
    }

    fn open_output(&self, device: &DeviceInfo) -> Result<MockOutput> {
        self.check_open(device)?;
        self.log.push(format!("open output {}", device.name));
        Ok(MockOutput {
            name: device.name.clone(),
            volume: 1.0,
            active: false,
            fail_start: self.failing_start.contains(&device.name),
            log: self.log.clone(),
        })
    }
}

pub struct MockInput {
    name: String,
    pub volume: f32,
    pub buffer_frames: Option<u32>,
    sink: Option<SampleSink>,
    fail_start: bool,
    log: CallLog,
}

impl InputStream for MockInput {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_buffer_size(&mut self, frames: u32) {
        self.buffer_frames = Some(frames);
    }

    fn start(&mut self, sink: SampleSink) -> Result<()> {
        if self.fail_start {
            self.log.push(format!("start failed input {}", self.name));
            return Err(SidetoneError::device_error(&self.name, "start failed"));
        }
        self.log.push(format!("start input {}", self.name));
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.push(format!("stop input {}", self.name));
        self.sink = None;
    }

    fn is_active(&self) -> bool {
        self.sink.is_some()
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        self.log.push(format!("drop input {}", self.name));
    }
}

pub struct MockOutput {
    name: String,
    volume: f32,
    active: bool,
    fail_start: bool,
    log: CallLog,
}

impl OutputStream for MockOutput {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> Result<SampleSink> {
        if self.fail_start {
            self.log.push(format!("start failed output {}", self.name));
            return Err(SidetoneError::device_error(&self.name, "start failed"));
        }
        self.log.push(format!("start output {}", self.name));
        self.active = true;
        let (sink, _source) = sample_link(AudioFormat::FALLBACK, 16);
        Ok(sink)
    }

    fn stop(&mut self) {
        self.log.push(format!("stop output {}", self.name));
        self.active = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        self.log.push(format!("drop output {}", self.name));
    }
}
