//! Persisted host-side preferences.
//!
//! The host keeps a small set of knobs (fade behavior, default volume,
//! duration-hint label words) in a JSON file under the XDG config
//! directory. The per-module runtime configs are derived from these
//! settings rather than duplicated in them.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as IoError,
    path::PathBuf,
    time::Duration,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

use crate::{playback::PlaybackConfig, scanner::DurationHintConfig};

/// Error type for settings persistence.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("Settings IO error: {0}")]
    Io(#[from] IoError),
    /// The settings file holds malformed JSON.
    #[error("Malformed settings: {0}")]
    Json(#[from] SerdeJsonError),
    /// A settings value is out of its accepted range.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Length of one fade ramp in milliseconds.
    pub fade_duration_ms: u64,
    /// Number of volume steps per fade ramp.
    pub fade_steps: u32,
    /// Master volume at session start, in [0, 1].
    pub default_volume: f32,
    /// Label words marking expected-duration lines in plan documents
    /// (lowercase). A locale configuration point.
    pub duration_label_words: Vec<String>,
    /// Most recently selected session folder, if any.
    pub last_root_folder: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            fade_duration_ms: 1200,
            fade_steps: 24,
            default_volume: 1.0,
            duration_label_words: DurationHintConfig::default().label_words,
            last_root_folder: None,
        }
    }
}

impl UserSettings {
    /// Derives the playback engine configuration.
    #[must_use]
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            fade_duration: Duration::from_millis(self.fade_duration_ms),
            fade_steps: self.fade_steps,
            initial_volume: self.default_volume,
        }
    }

    /// Derives the duration-hint extraction configuration.
    #[must_use]
    pub fn duration_hint_config(&self) -> DurationHintConfig {
        DurationHintConfig {
            label_words: self.duration_label_words.clone(),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(SettingsError::InvalidValue {
                reason: format!("default_volume {} outside [0, 1]", self.default_volume),
            });
        }
        if self.fade_steps == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "fade_steps must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads, validates, and saves user preferences.
#[derive(Debug)]
pub struct SettingsManager {
    settings: RwLock<UserSettings>,
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a manager over the default settings file location.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when an existing settings file cannot be
    /// read or parsed.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(default_config_path())
    }

    /// Creates a manager over an explicit settings file location.
    ///
    /// A missing file yields defaults; nothing is written until the first
    /// update.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when an existing settings file cannot be
    /// read or parsed.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading settings");
            from_str(&read_to_string(&config_path)?)?
        } else {
            debug!(path = %config_path.display(), "No settings file; using defaults");
            UserSettings::default()
        };

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Read access to the current settings.
    pub fn settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Location of the settings file.
    #[must_use]
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Validates, applies, and persists new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for out-of-range values, or
    /// an IO/serialization error when saving fails; the previous settings
    /// are kept on any failure.
    pub fn update_settings(&self, new_settings: UserSettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        let previous = {
            let mut settings = self.settings.write();
            std::mem::replace(&mut *settings, new_settings)
        };
        if let Err(error) = self.save() {
            *self.settings.write() = previous;
            return Err(error);
        }
        Ok(())
    }

    fn save(&self) -> Result<(), SettingsError> {
        debug!(path = %self.config_path.display(), "Saving settings");
        write(&self.config_path, to_string_pretty(&*self.settings.read())?)?;
        Ok(())
    }
}

/// Default settings file location: `$XDG_CONFIG_HOME/gmdeck/settings.json`,
/// falling back to `$HOME/.config` when `XDG_CONFIG_HOME` is unset.
#[must_use]
pub fn default_config_path() -> PathBuf {
    let mut path = match var("XDG_CONFIG_HOME") {
        Ok(config_home) if !config_home.is_empty() => PathBuf::from(config_home),
        _ => match var("HOME") {
            Ok(home) => {
                let mut home = PathBuf::from(home);
                home.push(".config");
                home
            }
            // No HOME on this platform; land next to the process.
            Err(_) => PathBuf::from("."),
        },
    };
    path.push("gmdeck");
    path.push("settings.json");
    path
}
