//! Volume and mute state, plus the gain shared with the output callback

use std::sync::atomic::{AtomicU32, Ordering};

/// Highest value of the volume slider
pub const MAX_LEVEL: u8 = 100;

/// Atomic gain stored as u32 bits of an f32 (0.0-1.0)
///
/// Using AtomicU32 with f32 bit representation for lock-free sharing
/// between the event thread and the output stream callback.
#[derive(Debug)]
pub struct VolumeLevel(AtomicU32);

impl VolumeLevel {
    /// Create with the given initial gain
    pub fn new(volume: f32) -> Self {
        Self(AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()))
    }

    /// Get current gain (0.0 - 1.0)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Set gain (0.0 - 1.0)
    pub fn set(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.0.store(clamped.to_bits(), Ordering::Relaxed);
    }
}

impl Default for VolumeLevel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Slider level and mute flag
///
/// The level is kept while muted, so unmuting restores exactly the
/// value the slider had before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    level: u8,
    muted: bool,
}

impl VolumeState {
    pub fn new(level: u8, muted: bool) -> Self {
        Self {
            level: level.min(MAX_LEVEL),
            muted,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Set the slider level, clamped to 0-100
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(MAX_LEVEL);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Gain to send to the output handle
    pub fn effective_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level as f32 / MAX_LEVEL as f32
        }
    }
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new(0, true)
    }
}

/// Apply gain to f32 samples in-place
#[inline]
pub fn apply_volume_f32(samples: &mut [f32], volume: f32) {
    if (volume - 1.0).abs() < f32::EPSILON {
        return;
    }
    for sample in samples.iter_mut() {
        *sample *= volume;
    }
}
