//! Session data model and JSON export/import.

pub mod io;
pub mod model;

pub use {
    io::{ConfigError, export_config, export_config_file, import_config, import_config_file},
    model::{AudioTrack, CharacterStats, FileKind, FileReference, Part, Playlist, SessionConfig},
};
