//! Session export and import as JSON.
//!
//! Export serializes a [`SessionConfig`] verbatim; import parses and then
//! validates the whole structure. Any violation rejects the entire import so
//! a half-imported session can never replace a working one.

use std::{
    fs::{read_to_string, write},
    path::Path,
};

use {
    anyhow::Result as AnyhowResult,
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

use crate::{
    error::ResultExt,
    session::model::{FileKind, FileReference, SessionConfig},
};

/// Error type for session config export/import.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The payload is not well-formed JSON or does not match the expected
    /// shape.
    #[error("Malformed session config: {0}")]
    Json(#[from] SerdeJsonError),
    /// The payload parsed but violates a structural invariant.
    #[error("Invalid session config: {reason}")]
    Invalid { reason: String },
}

/// Serializes a session config to pretty-printed JSON.
///
/// # Errors
///
/// Returns `ConfigError` if serialization fails.
pub fn export_config(config: &SessionConfig) -> Result<String, ConfigError> {
    Ok(to_string_pretty(config)?)
}

/// Parses and validates a session config from JSON.
///
/// The whole import is rejected on the first violation; the caller's
/// in-memory configuration is untouched because nothing is returned.
///
/// # Errors
///
/// Returns `ConfigError::Json` for malformed payloads and
/// `ConfigError::Invalid` for structural violations.
pub fn import_config(payload: &str) -> Result<SessionConfig, ConfigError> {
    let config: SessionConfig = from_str(payload)?;
    validate_config(&config)?;
    debug!(
        parts = config.parts.len(),
        characters = config.player_character_names.len(),
        "Imported session config"
    );
    Ok(config)
}

/// Exports a session config to a JSON file on disk.
///
/// # Errors
///
/// Returns an error with operational context if serialization or the
/// write fails.
pub fn export_config_file(config: &SessionConfig, path: &Path) -> AnyhowResult<()> {
    let payload = export_config(config).add_context("Serializing session config")?;
    write(path, payload).add_contextf(format_args!(
        "Writing session config to {}",
        path.display()
    ))?;
    Ok(())
}

/// Reads and imports a session config from a JSON file on disk.
///
/// # Errors
///
/// Returns an error with operational context if the read, parse, or
/// validation fails; nothing is partially imported.
pub fn import_config_file(path: &Path) -> AnyhowResult<SessionConfig> {
    let payload = read_to_string(path).add_contextf(format_args!(
        "Reading session config from {}",
        path.display()
    ))?;
    import_config(&payload).add_context("Importing session config")
}

fn validate_config(config: &SessionConfig) -> Result<(), ConfigError> {
    let mut seen_part_ids = std::collections::BTreeSet::new();

    for part in &config.parts {
        if part.id.is_empty() {
            return Err(invalid("part with empty id"));
        }
        if part.name.is_empty() {
            return Err(invalid(format!("part '{}' has an empty name", part.id)));
        }
        if !seen_part_ids.insert(part.id.as_str()) {
            return Err(invalid(format!("duplicate part id '{}'", part.id)));
        }

        if let Some(plan) = &part.plan_file {
            validate_reference(plan, FileKind::Markdown, &part.id)?;
        }
        for image in &part.images {
            validate_reference(image, FileKind::Image, &part.id)?;
        }
        for doc in &part.support_docs {
            validate_reference(doc, FileKind::Markdown, &part.id)?;
        }
        for track in &part.ambient_playlist {
            validate_reference(track, FileKind::Audio, &part.id)?;
        }

        let mut seen_playlist_ids = std::collections::BTreeSet::new();
        for playlist in &part.event_playlists {
            if playlist.id.is_empty() {
                return Err(invalid(format!("part '{}' has a playlist with empty id", part.id)));
            }
            if playlist.name.is_empty() {
                return Err(invalid(format!("playlist '{}' has an empty name", playlist.id)));
            }
            if !seen_playlist_ids.insert(playlist.id.as_str()) {
                return Err(invalid(format!(
                    "duplicate playlist id '{}' in part '{}'",
                    playlist.id, part.id
                )));
            }
            for track in &playlist.tracks {
                validate_reference(track, FileKind::Audio, &playlist.id)?;
            }
        }
    }

    for name in config.player_character_stats.keys() {
        if !config.player_character_names.contains(name) {
            return Err(invalid(format!(
                "stats for unknown player character '{name}'"
            )));
        }
    }

    Ok(())
}

fn validate_reference(
    reference: &FileReference,
    expected: FileKind,
    owner: &str,
) -> Result<(), ConfigError> {
    if reference.path.is_empty() {
        return Err(invalid(format!("file reference with empty path in '{owner}'")));
    }
    if reference.name.is_empty() {
        return Err(invalid(format!(
            "file reference '{}' has an empty name",
            reference.path
        )));
    }
    if reference.kind != expected {
        return Err(invalid(format!(
            "file reference '{}' in '{owner}' has kind {:?}, expected {expected:?}",
            reference.path, reference.kind
        )));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use crate::session::{
        io::{ConfigError, export_config, import_config},
        model::{CharacterStats, FileKind, FileReference, Part, Playlist, SessionConfig},
    };

    fn sample_config() -> SessionConfig {
        let mut config = SessionConfig {
            root_folder_name: "campaign".to_string(),
            parts: vec![Part {
                id: "act-1".to_string(),
                name: "The Hook".to_string(),
                plan_file: Some(FileReference::new("plan/act1/the_hook.md", FileKind::Markdown)),
                images: vec![FileReference::new("images/act1/tavern.png", FileKind::Image)],
                support_docs: vec![FileReference::new(
                    "threats/act1/bandits.md",
                    FileKind::Markdown,
                )],
                ambient_playlist: vec![FileReference::new("music/act1/rain.ogg", FileKind::Audio)],
                event_playlists: vec![Playlist {
                    id: "act-1/combat".to_string(),
                    name: "combat".to_string(),
                    tracks: vec![FileReference::new(
                        "music/act1/combat/drums.ogg",
                        FileKind::Audio,
                    )],
                }],
            }],
            ..SessionConfig::default()
        };
        config.player_character_names.insert("Brenna".to_string());
        config.player_character_stats.insert(
            "Brenna".to_string(),
            CharacterStats {
                max_hp: Some(30),
                defense_score: Some(16),
            },
        );
        config
    }

    #[test]
    fn test_round_trip_reproduces_config() {
        let config = sample_config();
        let exported = export_config(&config).unwrap();
        let imported = import_config(&exported).unwrap();
        assert_eq!(config, imported);
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let result = import_config("{ not json");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_import_rejects_unknown_kind() {
        let payload = export_config(&sample_config())
            .unwrap()
            .replace("\"image\"", "\"video\"");
        assert!(matches!(import_config(&payload), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_import_rejects_non_audio_playlist_track() {
        let mut config = sample_config();
        config.parts[0].event_playlists[0].tracks[0].kind = FileKind::Markdown;
        let payload = export_config(&config).unwrap();
        assert!(matches!(
            import_config(&payload),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_import_rejects_stats_for_unknown_character() {
        let mut config = sample_config();
        config
            .player_character_stats
            .insert("Nobody".to_string(), CharacterStats::default());
        let payload = export_config(&config).unwrap();
        assert!(matches!(
            import_config(&payload),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        use tempfile::tempdir;

        use crate::session::io::{export_config_file, import_config_file};

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let config = sample_config();
        export_config_file(&config, &path).unwrap();
        assert_eq!(import_config_file(&path).unwrap(), config);

        let missing = import_config_file(&dir.path().join("absent.json"));
        assert!(missing.unwrap_err().to_string().contains("absent.json"));
    }

    #[test]
    fn test_import_rejects_duplicate_part_ids() {
        let mut config = sample_config();
        let duplicate = config.parts[0].clone();
        config.parts.push(duplicate);
        let payload = export_config(&config).unwrap();
        assert!(matches!(
            import_config(&payload),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
