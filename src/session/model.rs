//! Core session data model.
//!
//! This module defines the structures a game session is made of: file
//! references, playlists, parts, and the `SessionConfig` that ties them
//! together with proper serde serialization.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Kind of content a `FileReference` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Markdown document (plan or support doc).
    Markdown,
    /// Raster or vector image.
    Image,
    /// Audio track.
    Audio,
}

/// Reference to a file inside the session folder.
///
/// Paths are '/'-separated and relative to the session root; identity is
/// `path` and must be unique within a session. `name` is the display name,
/// always the last path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Relative '/'-separated path, unique within a session.
    pub path: String,
    /// Display name, the last path segment.
    pub name: String,
    /// Content kind.
    pub kind: FileKind,
}

impl FileReference {
    /// Creates a reference from a relative path, deriving the display name
    /// from the last path segment.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: FileKind) -> Self {
        let path = path.into();
        let name = path
            .rsplit('/')
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self { path, name, kind }
    }

    /// Whether this reference may be used as a playlist track.
    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.kind == FileKind::Audio
    }
}

/// A `FileReference` constrained to `FileKind::Audio`.
///
/// The constraint is enforced at the boundaries (scanner output, config
/// import) rather than by a separate type.
pub type AudioTrack = FileReference;

/// A named, situational looping track list a GM can switch to on demand.
///
/// The always-present background track list of a [`Part`] is *not* a
/// `Playlist`; it lives as a bare track vector on the part because it has
/// different lifecycle rules (always present, never removable, unnamed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique playlist id.
    pub id: String,
    /// Display name shown to the GM.
    pub name: String,
    /// Ordered tracks. May be empty, but an empty playlist cannot be
    /// activated for playback.
    pub tracks: Vec<AudioTrack>,
}

/// One segment of a session: its plan, images, support docs, and music.
///
/// Exactly one part is "current" at a time during play. Every mutation
/// produces a fully-formed part; there is no partially-initialized state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Unique part id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The plan document, if one exists.
    pub plan_file: Option<FileReference>,
    /// Images shown during this part, in display order.
    pub images: Vec<FileReference>,
    /// Supporting documents (characters, threats, maps, extra plan files).
    pub support_docs: Vec<FileReference>,
    /// Background music tracks, looped while no event playlist is active.
    pub ambient_playlist: Vec<AudioTrack>,
    /// Named event playlists (combat, tavern, ...).
    pub event_playlists: Vec<Playlist>,
}

/// Numeric stats extracted from a player-character sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Maximum hit points, if a recognizable marker was found.
    pub max_hp: Option<u32>,
    /// Defense score (AC or equivalent), if found.
    pub defense_score: Option<u32>,
}

/// Complete configuration of a session: the unit of export/import and the
/// unit handed from setup to play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Display name of the selected root folder.
    pub root_folder_name: String,
    /// Parts in play order.
    pub parts: Vec<Part>,
    /// Player character names.
    pub player_character_names: BTreeSet<String>,
    /// Stats per player character. Keys are a subset of
    /// `player_character_names`.
    pub player_character_stats: BTreeMap<String, CharacterStats>,
}

impl SessionConfig {
    /// Looks up a part by id.
    #[must_use]
    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{from_str, to_string};

    use crate::session::model::{FileKind, FileReference, Part, Playlist, SessionConfig};

    #[test]
    fn test_file_reference_name_derivation() {
        let reference = FileReference::new("plan/act1/the_hook.md", FileKind::Markdown);
        assert_eq!(reference.name, "the_hook.md");
        assert_eq!(reference.path, "plan/act1/the_hook.md");

        let flat = FileReference::new("notes.md", FileKind::Markdown);
        assert_eq!(flat.name, "notes.md");
    }

    #[test]
    fn test_file_kind_serializes_lowercase() {
        assert_eq!(to_string(&FileKind::Markdown).unwrap(), "\"markdown\"");
        assert_eq!(to_string(&FileKind::Image).unwrap(), "\"image\"");
        assert_eq!(to_string(&FileKind::Audio).unwrap(), "\"audio\"");
    }

    #[test]
    fn test_part_serialization_round_trip() {
        let part = Part {
            id: "act-1".to_string(),
            name: "The Hook".to_string(),
            plan_file: Some(FileReference::new("plan/act1/the_hook.md", FileKind::Markdown)),
            images: vec![FileReference::new("images/act1/tavern.png", FileKind::Image)],
            support_docs: vec![],
            ambient_playlist: vec![FileReference::new("music/act1/rain.ogg", FileKind::Audio)],
            event_playlists: vec![Playlist {
                id: "act-1/combat".to_string(),
                name: "combat".to_string(),
                tracks: vec![FileReference::new("music/act1/combat/drums.ogg", FileKind::Audio)],
            }],
        };

        let serialized = to_string(&part).unwrap();
        let deserialized: Part = from_str(&serialized).unwrap();
        assert_eq!(part, deserialized);
    }

    #[test]
    fn test_session_config_default_is_empty() {
        let config = SessionConfig::default();
        assert!(config.parts.is_empty());
        assert!(config.player_character_names.is_empty());
        assert!(config.part("anything").is_none());
    }
}
