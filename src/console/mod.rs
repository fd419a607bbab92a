//! Console front end: selectors, volume, mute and status line as text commands

mod app;
mod commands;
mod status;

pub use app::{apply_overrides, ConsoleApp};
pub use commands::{parse, ConsoleCommand, HELP};
pub use status::{StatusLine, DEFAULT_STATUS_DURATION};
