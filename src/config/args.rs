//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sidetone - hear your own microphone in your headphones
///
/// Routes a selected input device to a selected output device in real time
#[derive(Parser, Debug)]
#[command(name = "sidetone")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Preferences file (default: per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List available input and output devices
    List {
        /// Show only input devices
        #[arg(long, conflicts_with = "outputs")]
        inputs: bool,

        /// Show only output devices
        #[arg(long)]
        outputs: bool,
    },

    /// Route the microphone to the headphones (default)
    Run(RunOverrides),

    /// Show detailed device information
    Info {
        /// Device name, or part of it
        name: String,
    },
}

/// Starting settings that take precedence over the saved preferences
///
/// Device, volume and mute choices are saved on exit like any other change;
/// the buffer size applies to this session only.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    /// Input device name, or part of it
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output device name, or part of it
    #[arg(short, long)]
    pub output: Option<String>,

    /// Starting volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,

    /// Start with sound on instead of muted
    #[arg(long)]
    pub unmute: bool,

    /// Capture buffer size in frames (default: 384)
    #[arg(short, long)]
    pub buffer_frames: Option<u32>,
}

impl Args {
    /// Get the log level based on verbose/quiet flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(RunOverrides::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let args = Args::parse_from(["sidetone"]);
        assert_eq!(args.command.unwrap_or_default(), Command::default());
    }

    #[test]
    fn test_run_overrides() {
        let args = Args::parse_from([
            "sidetone", "run", "--input", "USB", "--volume", "40", "--unmute",
        ]);
        match args.command {
            Some(Command::Run(overrides)) => {
                assert_eq!(overrides.input.as_deref(), Some("USB"));
                assert_eq!(overrides.volume, Some(40));
                assert!(overrides.unmute);
                assert_eq!(overrides.buffer_frames, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_volume_out_of_range_rejected() {
        assert!(Args::try_parse_from(["sidetone", "run", "--volume", "150"]).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(Args::parse_from(["sidetone", "-q"]).log_level(), tracing::Level::ERROR);
        assert_eq!(Args::parse_from(["sidetone", "-vv"]).log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = Args::parse_from(["sidetone", "list", "--config", "/tmp/s.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/s.toml")));
    }
}
