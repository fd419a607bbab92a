//! Audio streams, splicing, and the routing state machine

pub mod backend;
mod buffer;
mod capture;
mod engine;
mod renderer;
mod volume;

pub use backend::{AudioBackend, CpalBackend, InputStream, OutputStream, StreamHealth};
pub use buffer::{sample_link, SampleSink, SampleSource};
pub use capture::CpalCapture;
pub use renderer::CpalRenderer;
pub use engine::{EngineConfig, Event, Flow, RouteState, SidetoneEngine};
pub use volume::{apply_volume_f32, VolumeLevel, VolumeState, MAX_LEVEL};

/// Sample encoding reported by the platform audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    I16,
    I32,
    U16,
    F32,
    F64,
    /// Anything we do not convert
    Other,
}

impl SampleEncoding {
    /// Bits per sample, 0 when unknown
    pub fn bits(&self) -> u16 {
        match self {
            SampleEncoding::I16 | SampleEncoding::U16 => 16,
            SampleEncoding::I32 | SampleEncoding::F32 => 32,
            SampleEncoding::F64 => 64,
            SampleEncoding::Other => 0,
        }
    }
}

impl From<cpal::SampleFormat> for SampleEncoding {
    fn from(format: cpal::SampleFormat) -> Self {
        match format {
            cpal::SampleFormat::I16 => SampleEncoding::I16,
            cpal::SampleFormat::I32 => SampleEncoding::I32,
            cpal::SampleFormat::U16 => SampleEncoding::U16,
            cpal::SampleFormat::F32 => SampleEncoding::F32,
            cpal::SampleFormat::F64 => SampleEncoding::F64,
            _ => SampleEncoding::Other,
        }
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Format assumed for placeholder devices
    pub const FALLBACK: AudioFormat = AudioFormat {
        sample_rate: 48_000,
        channels: 2,
        encoding: SampleEncoding::F32,
    };

    /// Number of frames covering the given milliseconds
    pub fn frames_for_ms(&self, ms: u32) -> usize {
        ((self.sample_rate as u64 * ms as u64) / 1000) as usize
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz {}ch {}bit {:?}",
            self.sample_rate,
            self.channels,
            self.encoding.bits(),
            self.encoding
        )
    }
}
