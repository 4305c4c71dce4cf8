//! Gmdeck - Session Runtime for Tabletop Game Masters
//!
//! The core of a local, folder-backed session-playback tool: it turns a
//! conventional directory tree of markdown, image, and audio files into
//! structured session data, drives a single-channel audio engine with
//! crossfades and per-playlist resume memory, and serves full-text search
//! over session documents. Everything visual is a host-side collaborator
//! calling in through these modules.

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod playback;
pub mod scanner;
pub mod search;
pub mod session;
pub mod store;

// Re-export key types for convenience
pub use {
    config::{SettingsManager, UserSettings},
    error::{ResultExt, SessionError},
    fuzzy::{filter_playlists, score},
    playback::{
        AudioChannel, PlaybackConfig, PlaybackEngine, PlaybackError, PlaybackMode, PlaybackPhase,
        TrackChange,
    },
    scanner::{ScanOutcome, ScannerConfig, SessionScanner, scan_session_folder},
    search::{SearchHit, SearchIndex, load_session_documents},
    session::{FileKind, FileReference, Part, Playlist, SessionConfig},
    store::{DirectoryStore, FileStore, StoreError, TextCache},
};

#[cfg(feature = "playback")]
pub use playback::RodioChannel;
