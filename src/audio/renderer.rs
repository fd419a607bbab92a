//! cpal playback stream draining a sample source

use crate::audio::backend::{OutputStream, StreamHealth};
use crate::audio::{sample_link, AudioFormat, SampleSink, SampleSource, VolumeLevel};
use crate::error::{Result, SidetoneError};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// Queue capacity between capture and playback
const QUEUE_MS: u32 = 250;

/// Queued audio beyond this is dropped to keep the delay short
const MAX_LATENCY_MS: u32 = 60;

/// Playback stream for one output device
pub struct CpalRenderer {
    device: Device,
    device_name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    volume: Arc<VolumeLevel>,
    stream: Option<Stream>,
    health: StreamHealth,
}

impl CpalRenderer {
    /// Open a renderer for the given device in its preferred format
    pub fn new(device: Device, device_name: String, health: StreamHealth) -> Result<Self> {
        let preferred = device.default_output_config().map_err(|e| {
            SidetoneError::device_error(&device_name, format!("No output config: {}", e))
        })?;

        let sample_format = preferred.sample_format();
        let config: StreamConfig = preferred.into();

        debug!(
            "Opened renderer for {}: {}Hz {}ch {:?}",
            device_name, config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            device_name,
            config,
            sample_format,
            volume: Arc::new(VolumeLevel::new(0.0)),
            stream: None,
            health,
        })
    }

    /// Format the renderer plays at
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.config.sample_rate.0,
            channels: self.config.channels,
            encoding: self.sample_format.into(),
        }
    }

    fn build<T>(&self, mut source: SampleSource) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let format = self.format();
        let max_latency = format.frames_for_ms(MAX_LATENCY_MS);
        let volume = self.volume.clone();
        let mut scratch: Vec<f32> = Vec::new();

        let health = self.health.clone();
        let name = self.device_name.clone();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let dropped = source.catch_up(max_latency);
                    if dropped > 0 {
                        trace!("Playback lagging, skipped {} frames", dropped);
                    }

                    scratch.resize(data.len(), 0.0);
                    source.fill(&mut scratch, volume.get());
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                move |err| {
                    error!("Playback stream error on {}: {}", name, err);
                    health.record(&name, err);
                },
                None,
            )
            .map_err(|e| {
                SidetoneError::device_error(
                    &self.device_name,
                    format!("Failed to build output stream: {}", e),
                )
            })
    }
}

impl OutputStream for CpalRenderer {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn start(&mut self) -> Result<SampleSink> {
        if self.stream.is_some() {
            return Err(SidetoneError::AlreadyRunning(self.device_name.clone()));
        }

        let format = self.format();
        let (sink, source) = sample_link(format, format.frames_for_ms(QUEUE_MS));

        let stream = match self.sample_format {
            SampleFormat::I16 => self.build::<i16>(source),
            SampleFormat::I32 => self.build::<i32>(source),
            SampleFormat::U16 => self.build::<u16>(source),
            SampleFormat::F32 => self.build::<f32>(source),
            SampleFormat::F64 => self.build::<f64>(source),
            other => Err(SidetoneError::UnsupportedFormat {
                device: self.device_name.clone(),
                format: format!("{:?}", other),
            }),
        }?;

        stream.play().map_err(|e| {
            SidetoneError::device_error(&self.device_name, format!("Failed to start playback: {}", e))
        })?;

        info!("Playback started on {} ({})", self.device_name, format);
        self.stream = Some(stream);
        Ok(sink)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pausing playback on {} failed: {}", self.device_name, e);
            }
            drop(stream);
            debug!("Playback stopped on {}", self.device_name);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume.set(volume);
    }

    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}
