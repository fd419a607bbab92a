//! sidetone - hear your own microphone in your headphones
//!
//! Routes a selected input device to a selected output device in real
//! time, with volume and mute, remembering the choices between sessions.

pub mod audio;
pub mod config;
pub mod console;
pub mod device;
pub mod error;

pub use error::{Result, SidetoneError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
