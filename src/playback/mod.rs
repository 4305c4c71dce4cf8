//! Audio playback engine.
//!
//! A state machine over one physical audio channel: two playlist modes
//! (ambient background vs. named event playlists), crossfade transitions,
//! per-playlist resume memory, and track navigation with wraparound. The
//! channel itself is abstracted behind [`AudioChannel`]; the real rodio
//! backend lives behind the opt-in `playback` cargo feature so the core
//! stays testable without an audio device.

mod channel;
mod config;
pub mod engine;
#[cfg(feature = "playback")]
mod rodio_channel;

pub use {
    channel::{AudioChannel, ChannelError},
    config::PlaybackConfig,
    engine::{PlaybackEngine, PlaybackError, PlaybackMode, PlaybackPhase, TrackChange},
};

#[cfg(feature = "playback")]
pub use rodio_channel::RodioChannel;
