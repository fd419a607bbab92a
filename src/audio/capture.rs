//! cpal capture stream feeding a sample sink

use crate::audio::backend::{InputStream, StreamHealth};
use crate::audio::{SampleSink, VolumeLevel};
use crate::error::{Result, SidetoneError};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig, SupportedBufferSize, SupportedStreamConfig,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Capture stream for one input device
///
/// Note: `cpal::Stream` is `!Send`, so a capture lives on the thread that
/// created it.
pub struct CpalCapture {
    device: Device,
    device_name: String,
    preferred: SupportedStreamConfig,
    volume: Arc<VolumeLevel>,
    buffer_frames: Option<u32>,
    stream: Option<Stream>,
    health: StreamHealth,
}

impl CpalCapture {
    /// Open a capture for the given device in its preferred format
    pub fn new(device: Device, device_name: String, health: StreamHealth) -> Result<Self> {
        let preferred = device.default_input_config().map_err(|e| {
            SidetoneError::device_error(&device_name, format!("No input config: {}", e))
        })?;

        debug!(
            "Opened capture for {}: {}Hz {}ch {:?}",
            device_name,
            preferred.sample_rate().0,
            preferred.channels(),
            preferred.sample_format()
        );

        Ok(Self {
            device,
            device_name,
            preferred,
            volume: Arc::new(VolumeLevel::default()),
            buffer_frames: None,
            stream: None,
            health,
        })
    }

    /// Pick a config at the sink's sample rate if the device supports it
    fn config_for_rate(&self, sample_rate: u32) -> SupportedStreamConfig {
        if self.preferred.sample_rate().0 == sample_rate {
            return self.preferred.clone();
        }

        let matching = self.device.supported_input_configs().ok().and_then(|mut ranges| {
            ranges.find(|range| {
                range.channels() == self.preferred.channels()
                    && range.sample_format() == self.preferred.sample_format()
                    && range.min_sample_rate().0 <= sample_rate
                    && range.max_sample_rate().0 >= sample_rate
            })
        });

        match matching {
            Some(range) => range.with_sample_rate(SampleRate(sample_rate)),
            None => {
                warn!(
                    "{} cannot capture at {}Hz, using {}Hz (pitch will be off)",
                    self.device_name,
                    sample_rate,
                    self.preferred.sample_rate().0
                );
                self.preferred.clone()
            }
        }
    }
}

impl InputStream for CpalCapture {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume.set(volume);
    }

    fn set_buffer_size(&mut self, frames: u32) {
        self.buffer_frames = Some(frames);
    }

    fn start(&mut self, sink: SampleSink) -> Result<()> {
        if self.stream.is_some() {
            return Err(SidetoneError::AlreadyRunning(self.device_name.clone()));
        }

        let supported = self.config_for_rate(sink.sample_rate());
        let requested = buffer_size_for(supported.buffer_size(), self.buffer_frames);
        if let (BufferSize::Default, Some(frames)) = (requested, self.buffer_frames) {
            warn!(
                "{} does not accept a {} frame buffer, using host default",
                self.device_name, frames
            );
        }

        // Shared so a rejected build can hand the sink to the retry
        let sink = Arc::new(Mutex::new(sink));
        let (stream, config) = with_buffer_fallback(requested, |buffer_size| {
            self.open_stream(&supported, buffer_size, &sink)
        })
        .map_err(|(requested, e)| {
            debug!("Capture on {} failed with buffer {:?}", self.device_name, requested);
            e
        })?;

        info!(
            "Capture started on {} ({}Hz {}ch, buffer {:?})",
            self.device_name, config.sample_rate.0, config.channels, config.buffer_size
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Pausing capture on {} failed: {}", self.device_name, e);
            }
            // Dropping the stream releases the sink
            drop(stream);
            debug!("Capture stopped on {}", self.device_name);
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl CpalCapture {
    /// Build and play a stream with the given buffer size
    fn open_stream(
        &self,
        supported: &SupportedStreamConfig,
        buffer_size: BufferSize,
        sink: &Arc<Mutex<SampleSink>>,
    ) -> Result<(Stream, StreamConfig)> {
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };

        let stream = match supported.sample_format() {
            SampleFormat::I16 => self.build::<i16>(&config, sink.clone()),
            SampleFormat::I32 => self.build::<i32>(&config, sink.clone()),
            SampleFormat::U16 => self.build::<u16>(&config, sink.clone()),
            SampleFormat::F32 => self.build::<f32>(&config, sink.clone()),
            SampleFormat::F64 => self.build::<f64>(&config, sink.clone()),
            other => Err(SidetoneError::UnsupportedFormat {
                device: self.device_name.clone(),
                format: format!("{:?}", other),
            }),
        }?;

        stream.play().map_err(|e| {
            SidetoneError::device_error(&self.device_name, format!("Failed to start capture: {}", e))
        })?;

        Ok((stream, config))
    }

    fn build<T>(&self, config: &StreamConfig, sink: Arc<Mutex<SampleSink>>) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = config.channels;
        let volume = self.volume.clone();
        let mut scratch: Vec<f32> = Vec::new();

        let health = self.health.clone();
        let name = self.device_name.clone();

        self.device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    // Only this callback locks once the stream is playing
                    let Some(mut sink) = sink.try_lock() else {
                        return;
                    };
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
                    let pushed = sink.push_frames(&scratch, channels, volume.get());
                    let frames = scratch.len() / channels.max(1) as usize;
                    if pushed < frames {
                        trace!("Sink full, dropped {} frames", frames - pushed);
                    }
                },
                move |err| {
                    error!("Capture stream error on {}: {}", name, err);
                    health.record(&name, err);
                },
                None,
            )
            .map_err(|e| {
                SidetoneError::device_error(
                    &self.device_name,
                    format!("Failed to build input stream: {}", e),
                )
            })
    }
}

/// Fixed buffer size if the reported range allows it, else the host default
///
/// Hosts that report no range get the fixed size; [`with_buffer_fallback`]
/// covers a host that then rejects it.
fn buffer_size_for(supported: &SupportedBufferSize, frames: Option<u32>) -> BufferSize {
    let Some(frames) = frames else {
        return BufferSize::Default;
    };

    match supported {
        SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&frames) => {
            BufferSize::Fixed(frames)
        }
        SupportedBufferSize::Range { .. } => BufferSize::Default,
        SupportedBufferSize::Unknown => BufferSize::Fixed(frames),
    }
}

/// Run `open` with `requested`, retrying once with the host default when a
/// fixed size is rejected
///
/// On failure the error is paired with the buffer size of the last attempt.
fn with_buffer_fallback<T>(
    requested: BufferSize,
    mut open: impl FnMut(BufferSize) -> Result<T>,
) -> std::result::Result<T, (BufferSize, SidetoneError)> {
    match open(requested) {
        Ok(value) => Ok(value),
        Err(e) if matches!(requested, BufferSize::Fixed(_)) => {
            warn!("{}; retrying with host default buffer size", e);
            open(BufferSize::Default).map_err(|e| (BufferSize::Default, e))
        }
        Err(e) => Err((requested, e)),
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
