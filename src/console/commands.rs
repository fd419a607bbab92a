//! Parsing of console input lines

use crate::audio::{Event, MAX_LEVEL};
use crate::error::{Result, SidetoneError};

/// Help text listing every command
pub const HELP: &str = "\
Commands:
  input <n>      select input device n (see 'devices')
  output <n>     select output device n
  volume <0-100> set the volume (unmutes)
  mute | unmute  mute or unmute
  devices        list devices
  status         show the current route
  help           show this help
  quit           save preferences and exit";

/// Action requested from the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Forward to the engine
    Engine(Event),
    Devices,
    Status,
    Help,
    Quit,
}

/// Parse one line of input; blank lines give `None`
///
/// Device numbers are 1-based as shown by `devices`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    if words.next().is_some() {
        return Err(SidetoneError::InvalidCommand(format!(
            "too many arguments: {}",
            line.trim()
        )));
    }

    let command = match (verb.to_lowercase().as_str(), arg) {
        ("input" | "in" | "i", Some(n)) => {
            ConsoleCommand::Engine(Event::InputSelected(device_index(n)?))
        }
        ("output" | "out" | "o", Some(n)) => {
            ConsoleCommand::Engine(Event::OutputSelected(device_index(n)?))
        }
        ("volume" | "vol" | "v", Some(n)) => ConsoleCommand::Engine(Event::VolumeChanged(level(n)?)),
        ("mute" | "m", None) => ConsoleCommand::Engine(Event::MuteToggled(true)),
        ("mute" | "m", Some(flag)) => ConsoleCommand::Engine(Event::MuteToggled(on_off(flag)?)),
        ("unmute" | "u", None) => ConsoleCommand::Engine(Event::MuteToggled(false)),
        ("devices" | "list" | "d", None) => ConsoleCommand::Devices,
        ("status" | "s", None) => ConsoleCommand::Status,
        ("help" | "h" | "?", None) => ConsoleCommand::Help,
        ("quit" | "exit" | "q", None) => ConsoleCommand::Quit,
        ("input" | "in" | "i" | "output" | "out" | "o" | "volume" | "vol" | "v", None) => {
            return Err(SidetoneError::InvalidCommand(format!("{} needs a value", verb)));
        }
        _ => {
            return Err(SidetoneError::InvalidCommand(line.trim().to_string()));
        }
    };

    Ok(Some(command))
}

fn device_index(text: &str) -> Result<usize> {
    match text.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(SidetoneError::InvalidCommand(format!(
            "device number must be 1 or more: {}",
            text
        ))),
    }
}

fn level(text: &str) -> Result<u8> {
    match text.parse::<u8>() {
        Ok(v) if v <= MAX_LEVEL => Ok(v),
        _ => Err(SidetoneError::InvalidCommand(format!(
            "volume must be 0-100: {}",
            text
        ))),
    }
}

fn on_off(text: &str) -> Result<bool> {
    match text.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(SidetoneError::InvalidCommand(format!(
            "expected on or off: {}",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(line: &str) -> ConsoleCommand {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_selection_is_one_based() {
        assert_eq!(ok("input 1"), ConsoleCommand::Engine(Event::InputSelected(0)));
        assert_eq!(ok("  OUT 3 "), ConsoleCommand::Engine(Event::OutputSelected(2)));
        assert!(parse("input 0").is_err());
        assert!(parse("input x").is_err());
    }

    #[test]
    fn test_volume() {
        assert_eq!(ok("volume 40"), ConsoleCommand::Engine(Event::VolumeChanged(40)));
        assert_eq!(ok("v 100"), ConsoleCommand::Engine(Event::VolumeChanged(100)));
        assert!(parse("volume 101").is_err());
        assert!(parse("volume -1").is_err());
        assert!(parse("volume").is_err());
    }

    #[test]
    fn test_mute_forms() {
        assert_eq!(ok("mute"), ConsoleCommand::Engine(Event::MuteToggled(true)));
        assert_eq!(ok("unmute"), ConsoleCommand::Engine(Event::MuteToggled(false)));
        assert_eq!(ok("mute off"), ConsoleCommand::Engine(Event::MuteToggled(false)));
        assert_eq!(ok("mute ON"), ConsoleCommand::Engine(Event::MuteToggled(true)));
        assert!(parse("mute maybe").is_err());
    }

    #[test]
    fn test_plain_commands() {
        assert_eq!(ok("devices"), ConsoleCommand::Devices);
        assert_eq!(ok("status"), ConsoleCommand::Status);
        assert_eq!(ok("?"), ConsoleCommand::Help);
        assert_eq!(ok("exit"), ConsoleCommand::Quit);
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_unknown_and_extra_arguments() {
        assert!(matches!(parse("reboot"), Err(SidetoneError::InvalidCommand(_))));
        assert!(parse("input 1 2").is_err());
        assert!(parse("status now").is_err());
    }
}
