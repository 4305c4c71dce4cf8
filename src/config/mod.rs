//! Persisted user preferences.
//!
//! Host-facing knobs (fade behavior, default volume, duration-hint
//! labels) stored as JSON under the XDG config directory, from which the
//! per-module runtime configs are derived.

pub mod settings;

pub use settings::{SettingsError, SettingsManager, UserSettings, default_config_path};
