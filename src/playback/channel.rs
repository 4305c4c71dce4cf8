//! The single physical audio channel behind the playback engine.

use std::time::Duration;

use thiserror::Error;

/// Error type for audio channel operations.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The track source no longer resolves (moved or renamed file).
    #[error("Track source not found: {path}")]
    SourceNotFound { path: String },
    /// The track exists but cannot be decoded.
    #[error("Cannot decode {path}: {reason}")]
    Undecodable { path: String, reason: String },
    /// No audio output device is available.
    #[error("Audio output unavailable: {reason}")]
    OutputUnavailable { reason: String },
}

/// One playable audio stream.
///
/// The engine owns exactly one implementation and drives every audible
/// change through it. Implementations signal natural end-of-track through
/// the completion sender they were constructed with; the engine consumes
/// the paired receiver for auto-advance. All methods are synchronous and
/// cheap so the engine can call them from fade tasks without blocking the
/// runtime.
pub trait AudioChannel: Send + Sync + 'static {
    /// Loads the track at a session-relative path, positioned at
    /// `start_at`, leaving the channel paused.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` if the source cannot be resolved or decoded.
    fn load(&self, track_path: &str, start_at: Duration) -> Result<(), ChannelError>;

    /// Starts or resumes the loaded track. No-op when nothing is loaded.
    fn play(&self);

    /// Pauses immediately, keeping the loaded track and position.
    fn pause(&self);

    /// Stops and unloads the current track.
    fn stop(&self);

    /// Sets the channel volume in `[0, 1]`.
    fn set_volume(&self, volume: f32);

    /// Current position within the loaded track (load offset plus played
    /// time), or zero when nothing is loaded.
    fn position(&self) -> Duration;
}
