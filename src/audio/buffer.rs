//! Sample queue splicing an input stream into an output stream
//!
//! The output side creates the link when it starts and keeps the
//! [`SampleSource`]; the [`SampleSink`] is handed to the input stream,
//! which pushes captured frames into it from its own callback thread.

use crate::audio::volume::apply_volume_f32;
use crate::audio::AudioFormat;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Create a linked sink/source pair holding up to `capacity_frames` frames
/// in the given format
pub fn sample_link(format: AudioFormat, capacity_frames: usize) -> (SampleSink, SampleSource) {
    let channels = format.channels.max(1);
    let rb = HeapRb::<f32>::new(capacity_frames.max(1) * channels as usize);
    let (producer, consumer) = rb.split();

    (
        SampleSink {
            producer,
            channels,
            sample_rate: format.sample_rate,
            scratch: Vec::new(),
        },
        SampleSource { consumer, channels },
    )
}

/// Producer end, owned by the input stream callback
pub struct SampleSink {
    producer: HeapProd<f32>,
    channels: u16,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl SampleSink {
    /// Sample rate the output side plays at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Free space in whole frames
    pub fn vacant_frames(&self) -> usize {
        self.producer.vacant_len() / self.channels as usize
    }

    /// Push interleaved frames with `in_channels` channels, remapped to the
    /// sink's channel count and scaled by `gain`.
    ///
    /// Frames that do not fit are dropped. Returns the number of frames
    /// queued.
    pub fn push_frames(&mut self, samples: &[f32], in_channels: u16, gain: f32) -> usize {
        let in_channels = in_channels.max(1) as usize;
        let out_channels = self.channels as usize;
        let frames = (samples.len() / in_channels).min(self.vacant_frames());
        if frames == 0 {
            return 0;
        }

        self.scratch.clear();
        for frame in samples.chunks_exact(in_channels).take(frames) {
            remix(frame, out_channels, gain, &mut self.scratch);
        }

        self.producer.push_slice(&self.scratch) / out_channels
    }
}

/// Consumer end, owned by the output stream callback
pub struct SampleSource {
    consumer: HeapCons<f32>,
    channels: u16,
}

impl SampleSource {
    /// Queued frames waiting to be played
    pub fn queued_frames(&self) -> usize {
        self.consumer.occupied_len() / self.channels as usize
    }

    /// Fill `out` with queued samples scaled by `gain`, padding with silence
    /// on underrun. Returns the number of frames taken from the queue.
    pub fn fill(&mut self, out: &mut [f32], gain: f32) -> usize {
        let read = self.consumer.pop_slice(out);
        apply_volume_f32(&mut out[..read], gain);
        out[read..].fill(0.0);
        read / self.channels as usize
    }

    /// Drop the oldest frames when more than `max_frames` are queued,
    /// leaving half of `max_frames` behind. Returns frames dropped.
    pub fn catch_up(&mut self, max_frames: usize) -> usize {
        let queued = self.queued_frames();
        if queued <= max_frames {
            return 0;
        }
        let excess = queued - max_frames / 2;
        self.consumer.skip(excess * self.channels as usize) / self.channels as usize
    }
}

/// Append one frame remapped to `out_channels`
fn remix(frame: &[f32], out_channels: usize, gain: f32, out: &mut Vec<f32>) {
    let in_channels = frame.len();
    if in_channels == out_channels {
        out.extend(frame.iter().map(|s| s * gain));
    } else if out_channels == 1 {
        let sum: f32 = frame.iter().sum();
        out.push(sum / in_channels as f32 * gain);
    } else {
        // mono fans out; otherwise wrap around the input channels
        out.extend((0..out_channels).map(|c| frame[c % in_channels] * gain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleEncoding;

    fn format(channels: u16) -> AudioFormat {
        AudioFormat {
            sample_rate: 48_000,
            channels,
            encoding: SampleEncoding::F32,
        }
    }

    #[test]
    fn test_passthrough() {
        let (mut sink, mut source) = sample_link(format(2), 16);
        assert_eq!(sink.push_frames(&[0.1, 0.2, 0.3, 0.4], 2, 1.0), 2);

        let mut out = [0.0f32; 4];
        assert_eq!(source.fill(&mut out, 1.0), 2);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_mono_to_stereo() {
        let (mut sink, mut source) = sample_link(format(2), 16);
        sink.push_frames(&[0.5, -0.5], 1, 1.0);

        let mut out = [0.0f32; 4];
        source.fill(&mut out, 1.0);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_stereo_to_mono() {
        let (mut sink, mut source) = sample_link(format(1), 16);
        sink.push_frames(&[0.2, 0.4, 1.0, 0.0], 2, 1.0);

        let mut out = [0.0f32; 2];
        source.fill(&mut out, 1.0);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_underrun_pads_silence() {
        let (mut sink, mut source) = sample_link(format(2), 16);
        sink.push_frames(&[1.0, 1.0], 2, 1.0);

        let mut out = [9.0f32; 6];
        assert_eq!(source.fill(&mut out, 0.5), 1);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_full_queue_drops_whole_frames() {
        let (mut sink, source) = sample_link(format(2), 2);
        assert_eq!(sink.push_frames(&[0.1; 6], 2, 1.0), 2);
        assert_eq!(sink.vacant_frames(), 0);
        assert_eq!(sink.push_frames(&[0.1; 2], 2, 1.0), 0);
        assert_eq!(source.queued_frames(), 2);
    }

    #[test]
    fn test_catch_up_bounds_latency() {
        let (mut sink, mut source) = sample_link(format(1), 64);
        sink.push_frames(&[0.0; 40], 1, 1.0);

        assert_eq!(source.catch_up(48), 0);
        assert_eq!(source.catch_up(32), 24);
        assert_eq!(source.queued_frames(), 16);
    }
}
