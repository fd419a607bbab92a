//! Transient status messages

use std::time::{Duration, Instant};

/// How long a message stays visible unless told otherwise
pub const DEFAULT_STATUS_DURATION: Duration = Duration::from_millis(1000);

/// A status line whose message expires after a short time
#[derive(Debug)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
    duration: Duration,
}

impl StatusLine {
    pub fn new(duration: Duration) -> Self {
        Self {
            message: None,
            duration,
        }
    }

    /// Show `text` for the default duration
    pub fn show(&mut self, text: impl Into<String>) {
        self.show_for(text, self.duration);
    }

    pub fn show_for(&mut self, text: impl Into<String>, duration: Duration) {
        self.message = Some((text.into(), Instant::now() + duration));
    }

    /// Message still visible at `now`
    pub fn current_at(&self, now: Instant) -> Option<&str> {
        match &self.message {
            Some((text, expires)) if now < *expires => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current_at(Instant::now())
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_DURATION)
    }
}
