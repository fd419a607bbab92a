//! Persisted device and volume preferences in TOML format

use crate::audio::{VolumeState, MAX_LEVEL};
use crate::error::{Result, SidetoneError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Device name stored before any device was ever chosen
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Capture buffer size balancing delay against underrun "motorboating"
pub const DEFAULT_BUFFER_FRAMES: u32 = 384;

/// Last-used selections, read on startup and written on shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Input device name
    pub input_device: String,
    /// Output device name
    pub output_device: String,
    /// Volume slider value, 0-100
    pub volume: u8,
    /// Whether sidetone starts muted
    pub muted: bool,
    /// Capture buffer size in frames
    pub buffer_frames: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            input_device: UNKNOWN_DEVICE.to_string(),
            output_device: UNKNOWN_DEVICE.to_string(),
            volume: 0,
            muted: true,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

impl Preferences {
    pub fn volume_state(&self) -> VolumeState {
        VolumeState::new(self.volume, self.muted)
    }

    /// Read each key on its own; a missing or mistyped value keeps its default
    pub fn from_table(table: &toml::Table) -> Self {
        let defaults = Self::default();
        Self {
            input_device: field(table, "input_device").unwrap_or(defaults.input_device),
            output_device: field(table, "output_device").unwrap_or(defaults.output_device),
            volume: field::<i64>(table, "volume")
                .map(|v| v.clamp(0, i64::from(MAX_LEVEL)) as u8)
                .unwrap_or(defaults.volume),
            muted: field(table, "muted").unwrap_or(defaults.muted),
            buffer_frames: field(table, "buffer_frames").unwrap_or(defaults.buffer_frames),
        }
    }
}

fn field<T: DeserializeOwned>(table: &toml::Table, key: &str) -> Option<T> {
    let value = table.get(key)?.clone();
    match value.try_into() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring preference '{}': {}", key, e);
            None
        }
    }
}

/// Location of the preferences file
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Per-user config directory, e.g. `~/.config/sidetone/sidetone.toml`
    pub fn default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sidetone")
            .join("sidetone.toml");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences best effort
    ///
    /// A missing or unreadable file gives defaults; otherwise each key that
    /// holds a usable value is kept.
    pub fn load(&self) -> Preferences {
        if !self.path.exists() {
            debug!("Preferences file not found, using defaults");
            return Preferences::default();
        }

        match self.read_table() {
            Ok(table) => {
                info!("Loaded preferences from {:?}", self.path);
                Preferences::from_table(&table)
            }
            Err(e) => {
                warn!("{}", e);
                Preferences::default()
            }
        }
    }

    fn read_table(&self) -> Result<toml::Table> {
        let content = self.read()?;
        content.parse().map_err(|e| SidetoneError::PreferencesParse {
            path: self.path.to_string_lossy().to_string(),
            source: e,
        })
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| SidetoneError::PreferencesIo {
            path: self.path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Load preferences strictly, reporting read and parse failures
    pub fn try_load(&self) -> Result<Preferences> {
        let content = self.read()?;

        toml::from_str(&content).map_err(|e| SidetoneError::PreferencesParse {
            path: self.path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Save preferences, creating the parent directory if needed
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let content = toml::to_string_pretty(prefs)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SidetoneError::PreferencesIo {
                path: parent.to_string_lossy().to_string(),
                source: e,
            })?;
        }

        fs::write(&self.path, content).map_err(|e| SidetoneError::PreferencesIo {
            path: self.path.to_string_lossy().to_string(),
            source: e,
        })?;

        info!("Saved preferences to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.input_device, "unknown");
        assert_eq!(prefs.output_device, "unknown");
        assert_eq!(prefs.volume, 0);
        assert!(prefs.muted);
        assert_eq!(prefs.buffer_frames, 384);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("absent.toml"));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("nested").join("sidetone.toml"));

        let prefs = Preferences {
            input_device: "Mic B".into(),
            output_device: "Spk A".into(),
            volume: 40,
            muted: false,
            buffer_frames: 512,
        };
        store.save(&prefs).unwrap();

        assert_eq!(store.load(), prefs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidetone.toml");
        std::fs::write(&path, "input_device = \"Mic A\"\nvolume = 55\n").unwrap();

        let prefs = PreferencesStore::new(&path).load();
        assert_eq!(prefs.input_device, "Mic A");
        assert_eq!(prefs.volume, 55);
        assert_eq!(prefs.output_device, "unknown");
        assert!(prefs.muted);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidetone.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();

        let store = PreferencesStore::new(&path);
        assert!(matches!(
            store.try_load(),
            Err(SidetoneError::PreferencesParse { .. })
        ));
        assert_eq!(store.load(), Preferences::default());
    }

    #[test]
    fn test_bad_value_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidetone.toml");
        std::fs::write(
            &path,
            "input_device = \"Mic B\"\noutput_device = \"Spk A\"\nvolume = 300\nmuted = \"yes\"\n",
        )
        .unwrap();

        let prefs = PreferencesStore::new(&path).load();
        assert_eq!(prefs.input_device, "Mic B");
        assert_eq!(prefs.output_device, "Spk A");
        assert_eq!(prefs.volume, 100);
        assert!(prefs.muted);
    }

    #[test]
    fn test_negative_volume_clamped() {
        let table: toml::Table = "volume = -5".parse().unwrap();
        assert_eq!(Preferences::from_table(&table).volume, 0);
    }

    #[test]
    fn test_broken_toml_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidetone.toml");
        std::fs::write(&path, "input_device = \"Mic B").unwrap();

        assert_eq!(PreferencesStore::new(&path).load(), Preferences::default());
    }

    #[test]
    fn test_volume_state() {
        let prefs = Preferences {
            volume: 40,
            muted: false,
            ..Preferences::default()
        };
        assert_eq!(prefs.volume_state().effective_gain(), 0.4);
    }
}
