//! Aggregated error surface for the session runtime.
//!
//! Each module defines its own `thiserror` enum close to the code that
//! produces it; this module folds them into one [`SessionError`] for hosts
//! that route every failure through a single surface.

use std::result::Result as StdResult;

use {anyhow::Error, thiserror::Error};

use crate::{
    config::SettingsError,
    playback::{ChannelError, PlaybackError},
    session::ConfigError,
    store::StoreError,
};

/// Any error the session runtime can produce.
#[derive(Error, Debug)]
pub enum SessionError {
    /// File store error (missing path, revoked permission).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// Playback engine contract violation or skipped track.
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),
    /// Audio channel error (unplayable source, no output device).
    #[error("Audio channel error: {0}")]
    Channel(#[from] ChannelError),
    /// Session config export/import error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Settings persistence error.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Result alias for host-facing operations carrying `anyhow` context.
pub type Result<T> = StdResult<T, Error>;

#[cfg(test)]
mod tests {
    use crate::{
        error::domain::SessionError,
        playback::PlaybackError,
        store::StoreError,
    };

    #[test]
    fn test_session_error_wraps_store_error() {
        let error: SessionError = StoreError::NotFound {
            path: "plan/act1/gone.md".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Store error: Not found: plan/act1/gone.md");
    }

    #[test]
    fn test_session_error_wraps_playback_error() {
        let error: SessionError = PlaybackError::PlaylistNotFound {
            id: "act-1/combat".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Playback error: Playlist not found: act-1/combat"
        );
    }
}
