//! Command line arguments and persisted preferences

mod args;
mod preferences;

pub use args::{Args, Command, RunOverrides};
pub use preferences::{Preferences, PreferencesStore, DEFAULT_BUFFER_FRAMES, UNKNOWN_DEVICE};
