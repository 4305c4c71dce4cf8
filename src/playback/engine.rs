//! Playback engine state machine.
//!
//! One engine drives one physical [`AudioChannel`] for an entire play
//! session. It owns two playlist roles (the ambient background list and the
//! named event playlists), per-playlist resume memory, and every audible
//! transition. Track changes route through a fade-out, source swap, and
//! fade-in so nothing ever pops; at most one fade task is in flight, and a
//! newer request synchronously aborts the old one before starting.
//!
//! Effective channel volume is always `master × fade scale`. The fade task
//! owns the scale curve while [`PlaybackEngine::set_volume`] only touches
//! the master, so a volume change during a fade never fights the ramp.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    async_channel::{Receiver, Sender, unbounded},
    parking_lot::{Mutex, RwLock},
    thiserror::Error,
    tokio::{spawn, task::JoinHandle, time::sleep},
    tracing::{debug, warn},
};

use crate::{
    playback::{channel::AudioChannel, config::PlaybackConfig},
    session::{AudioTrack, Playlist},
};

/// Which playlist role the engine is currently playing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// The part's background track list.
    Ambient,
    /// A named, situational playlist.
    Event,
}

/// Lifecycle phase of the single audio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Nothing loaded or audible.
    Idle,
    /// A transition is preparing a track with nothing audible yet.
    Loading,
    /// A track is playing at full fade scale.
    Playing,
    /// Paused, position retained.
    Paused,
    /// The outgoing track is ramping down.
    FadingOut,
    /// The incoming track is ramping up.
    FadingIn,
}

/// Error type for playback operations.
///
/// These are caller-contract violations and recoverable track failures;
/// they are reported through the warning channel and never corrupt engine
/// state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The addressed playlist has no tracks to activate.
    #[error("Playlist has no tracks: {playlist}")]
    EmptyPlaylist { playlist: String },
    /// No loaded event playlist has the requested id.
    #[error("Playlist not found: {id}")]
    PlaylistNotFound { id: String },
    /// Explicit track selection outside the active playlist.
    #[error("Track index {index} out of range for playlist of length {length}")]
    IndexOutOfRange { index: usize, length: usize },
    /// A track source failed to load; playback skipped past it.
    #[error("Track failed to load: {path}")]
    TrackUnplayable { path: String },
}

/// Notification sent whenever the audible track changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackChange {
    /// Mode the new track plays in.
    pub mode: PlaybackMode,
    /// Active event playlist id, `None` in ambient mode.
    pub playlist_id: Option<String>,
    /// Index of the new track within its playlist.
    pub track_index: usize,
    /// Display name of the new track.
    pub track_name: String,
}

/// Remembered playback location of one playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ResumeSlot {
    track_index: usize,
    position: Duration,
}

/// Everything a spawned fade task needs, captured at request time so a
/// superseding request cannot change it mid-flight.
struct Transition {
    fade_out: bool,
    tracks: Vec<AudioTrack>,
    start_index: usize,
    start_position: Duration,
    mode: PlaybackMode,
    playlist_id: Option<String>,
}

struct EngineState {
    mode: PlaybackMode,
    phase: PlaybackPhase,
    ambient_tracks: Vec<AudioTrack>,
    event_playlists: Vec<Playlist>,
    active_event_playlist: Option<String>,
    ambient_slot: ResumeSlot,
    event_slots: HashMap<String, ResumeSlot>,
    master_volume: f32,
    fade_scale: f32,
    /// Path of the track the channel currently holds, if any. Diverges
    /// from the current slot only while a transition is in flight.
    loaded_path: Option<String>,
}

impl EngineState {
    fn active_tracks(&self) -> &[AudioTrack] {
        match self.mode {
            PlaybackMode::Ambient => &self.ambient_tracks,
            PlaybackMode::Event => self
                .active_event_playlist
                .as_ref()
                .and_then(|id| self.event_playlists.iter().find(|p| p.id == *id))
                .map_or(&[], |playlist| playlist.tracks.as_slice()),
        }
    }

    fn current_slot(&self) -> ResumeSlot {
        match self.mode {
            PlaybackMode::Ambient => self.ambient_slot,
            PlaybackMode::Event => self
                .active_event_playlist
                .as_ref()
                .and_then(|id| self.event_slots.get(id).copied())
                .unwrap_or_default(),
        }
    }

    fn set_current_slot(&mut self, slot: ResumeSlot) {
        match self.mode {
            PlaybackMode::Ambient => self.ambient_slot = slot,
            PlaybackMode::Event => {
                if let Some(id) = self.active_event_playlist.clone() {
                    self.event_slots.insert(id, slot);
                }
            }
        }
    }

    fn current_track(&self) -> Option<&AudioTrack> {
        self.active_tracks().get(self.current_slot().track_index)
    }

    fn is_audible(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Playing | PlaybackPhase::FadingOut | PlaybackPhase::FadingIn
        )
    }

    fn playlist_label(&self) -> String {
        match self.mode {
            PlaybackMode::Ambient => "ambient".to_string(),
            PlaybackMode::Event => self
                .active_event_playlist
                .clone()
                .unwrap_or_else(|| "event".to_string()),
        }
    }
}

/// Playback engine over one [`AudioChannel`].
///
/// Clonable: all state lives behind `Arc`, so UI code can hold cheap
/// clones. Construct it inside a tokio runtime; the auto-advance task that
/// consumes the channel's completion receiver is spawned immediately.
pub struct PlaybackEngine<C: AudioChannel> {
    channel: Arc<C>,
    config: PlaybackConfig,
    state: Arc<RwLock<EngineState>>,
    /// At most one in-flight fade task; replacing it aborts the old one.
    fade_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    track_subscribers: Arc<Mutex<Vec<Sender<TrackChange>>>>,
    state_subscribers: Arc<Mutex<Vec<Sender<PlaybackPhase>>>>,
    warning_subscribers: Arc<Mutex<Vec<Sender<PlaybackError>>>>,
}

impl<C: AudioChannel> Clone for PlaybackEngine<C> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            fade_task: Arc::clone(&self.fade_task),
            track_subscribers: Arc::clone(&self.track_subscribers),
            state_subscribers: Arc::clone(&self.state_subscribers),
            warning_subscribers: Arc::clone(&self.warning_subscribers),
        }
    }
}

impl<C: AudioChannel> PlaybackEngine<C> {
    /// Creates an engine over `channel`.
    ///
    /// `track_finished_rx` is the completion receiver paired with the
    /// sender the channel was constructed with; every message on it
    /// advances the current playlist by one track with wraparound.
    #[must_use]
    pub fn new(channel: Arc<C>, track_finished_rx: Receiver<()>, config: PlaybackConfig) -> Self {
        let initial_volume = config.initial_volume.clamp(0.0, 1.0);
        channel.set_volume(initial_volume);

        let engine = Self {
            channel,
            config,
            state: Arc::new(RwLock::new(EngineState {
                mode: PlaybackMode::Ambient,
                phase: PlaybackPhase::Idle,
                ambient_tracks: Vec::new(),
                event_playlists: Vec::new(),
                active_event_playlist: None,
                ambient_slot: ResumeSlot::default(),
                event_slots: HashMap::new(),
                master_volume: initial_volume,
                fade_scale: 1.0,
                loaded_path: None,
            })),
            fade_task: Arc::new(Mutex::new(None)),
            track_subscribers: Arc::new(Mutex::new(Vec::new())),
            state_subscribers: Arc::new(Mutex::new(Vec::new())),
            warning_subscribers: Arc::new(Mutex::new(Vec::new())),
        };

        let advance = engine.clone();
        spawn(async move {
            while let Ok(()) = track_finished_rx.recv().await {
                advance.handle_track_finished();
            }
            debug!("Track completion channel closed; auto-advance task exiting");
        });

        engine
    }

    /// Replaces the ambient track list for the current part.
    ///
    /// Does not start playback. Resume memory is reset only if the track
    /// path sequence actually changed, so music that is still appropriate
    /// across a part switch is not disrupted.
    pub fn load_ambient(&self, tracks: Vec<AudioTrack>) {
        let mut state = self.state.write();
        if same_track_paths(&state.ambient_tracks, &tracks) {
            debug!("Ambient playlist unchanged; resume memory preserved");
            return;
        }
        state.ambient_tracks = tracks;
        state.ambient_slot = ResumeSlot::default();
    }

    /// Replaces the named event playlists for the current part.
    ///
    /// Resume memory is kept per playlist id as long as that playlist's
    /// track path sequence is unchanged; everything else is reset.
    pub fn load_event_playlists(&self, playlists: Vec<Playlist>) {
        let mut state = self.state.write();
        let mut slots = HashMap::new();
        for playlist in &playlists {
            let unchanged = state
                .event_playlists
                .iter()
                .find(|previous| previous.id == playlist.id)
                .is_some_and(|previous| same_track_paths(&previous.tracks, &playlist.tracks));
            if unchanged && let Some(slot) = state.event_slots.get(&playlist.id) {
                slots.insert(playlist.id.clone(), *slot);
            }
        }
        state.event_playlists = playlists;
        state.event_slots = slots;
    }

    /// Switches to ambient mode at its remembered track and position.
    ///
    /// An empty ambient playlist is a surfaced warning, not an error, and
    /// nothing further happens.
    pub fn play_ambient(&self) {
        let transition = {
            let mut state = self.state.write();
            if state.ambient_tracks.is_empty() {
                drop(state);
                self.report(PlaybackError::EmptyPlaylist {
                    playlist: "ambient".to_string(),
                });
                return;
            }
            self.save_outgoing_position(&mut state);
            state.mode = PlaybackMode::Ambient;
            state.active_event_playlist = None;
            self.prepare_transition(&mut state)
        };
        self.begin_transition(transition);
    }

    /// Switches to event mode, activating the named playlist at its own
    /// remembered track and position.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::PlaylistNotFound` when the id is unknown to
    /// the loaded set. An empty playlist is a warning no-op, not an error.
    pub fn start_event(&self, playlist_id: &str) -> Result<(), PlaybackError> {
        let transition = {
            let mut state = self.state.write();
            let track_count = state
                .event_playlists
                .iter()
                .find(|playlist| playlist.id == playlist_id)
                .map(|playlist| playlist.tracks.len());
            match track_count {
                None => {
                    drop(state);
                    let error = PlaybackError::PlaylistNotFound {
                        id: playlist_id.to_string(),
                    };
                    self.report(error.clone());
                    return Err(error);
                }
                Some(0) => {
                    drop(state);
                    self.report(PlaybackError::EmptyPlaylist {
                        playlist: playlist_id.to_string(),
                    });
                    return Ok(());
                }
                Some(_) => {}
            }
            self.save_outgoing_position(&mut state);
            state.mode = PlaybackMode::Event;
            state.active_event_playlist = Some(playlist_id.to_string());
            self.prepare_transition(&mut state)
        };
        self.begin_transition(transition);
        Ok(())
    }

    /// Clears the active event playlist and falls back to ambient music,
    /// or to silence when no ambient playlist is loaded.
    ///
    /// Only meaningful in event mode; otherwise a logged no-op.
    pub fn stop_event(&self) {
        let transition = {
            let mut state = self.state.write();
            if state.mode != PlaybackMode::Event {
                drop(state);
                warn!("stop_event called while not in event mode");
                return;
            }
            self.save_outgoing_position(&mut state);
            state.active_event_playlist = None;
            state.mode = PlaybackMode::Ambient;
            if state.ambient_tracks.is_empty() {
                None
            } else {
                Some(self.prepare_transition(&mut state))
            }
        };
        match transition {
            Some(transition) => self.begin_transition(transition),
            None => self.fade_to_silence(),
        }
    }

    /// Pauses immediately, with no fade, keeping the exact position.
    pub fn pause(&self) {
        self.cancel_fade();
        self.channel.pause();
        let stale = {
            let mut state = self.state.write();
            if matches!(state.phase, PlaybackPhase::Paused | PlaybackPhase::Idle) {
                return;
            }
            let current = state.current_track().map(|track| track.path.clone());
            let loaded_matches = state.loaded_path.is_some() && state.loaded_path == current;
            if loaded_matches {
                let mut slot = state.current_slot();
                slot.position = self.channel.position();
                state.set_current_slot(slot);
            } else {
                // An aborted transition can leave the previous track in the
                // channel; drop it so resume reloads the right one.
                state.loaded_path = None;
            }
            state.phase = PlaybackPhase::Paused;
            state.fade_scale = 1.0;
            !loaded_matches
        };
        if stale {
            self.channel.stop();
        }
        self.apply_volume();
        self.notify_phase(PlaybackPhase::Paused);
    }

    /// Continues from the exact paused position.
    pub fn resume(&self) {
        enum Action {
            Continue,
            Reload { path: String, position: Duration },
        }

        let action = {
            let mut state = self.state.write();
            if state.phase != PlaybackPhase::Paused {
                drop(state);
                warn!("resume called while not paused");
                return;
            }
            let Some(track) = state.current_track() else {
                return;
            };
            let path = track.path.clone();
            if state.loaded_path.as_deref() == Some(path.as_str()) {
                state.phase = PlaybackPhase::Playing;
                Action::Continue
            } else {
                let position = state.current_slot().position;
                Action::Reload { path, position }
            }
        };

        match action {
            Action::Continue => {
                self.channel.play();
                self.notify_phase(PlaybackPhase::Playing);
            }
            Action::Reload { path, position } => match self.channel.load(&path, position) {
                Ok(()) => {
                    {
                        let mut state = self.state.write();
                        state.loaded_path = Some(path);
                        state.phase = PlaybackPhase::Playing;
                    }
                    self.apply_volume();
                    self.channel.play();
                    self.notify_phase(PlaybackPhase::Playing);
                }
                Err(error) => {
                    warn!(path, %error, "Cannot resume paused track");
                    self.report(PlaybackError::TrackUnplayable { path });
                }
            },
        }
    }

    /// Advances to the next track in the current playlist, wrapping after
    /// the last.
    pub fn skip_next(&self) {
        self.skip_to(|index, length| (index + 1) % length);
    }

    /// Retreats to the previous track in the current playlist, wrapping
    /// before the first.
    pub fn skip_previous(&self) {
        self.skip_to(|index, length| (index + length - 1) % length);
    }

    /// Jumps to an explicit track index in the current playlist.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::IndexOutOfRange` when `index` is outside the
    /// playlist.
    pub fn play_track_at_index(&self, index: usize) -> Result<(), PlaybackError> {
        let transition = {
            let mut state = self.state.write();
            let length = state.active_tracks().len();
            if index >= length {
                drop(state);
                let error = PlaybackError::IndexOutOfRange { index, length };
                self.report(error.clone());
                return Err(error);
            }
            state.set_current_slot(ResumeSlot {
                track_index: index,
                position: Duration::ZERO,
            });
            self.prepare_transition(&mut state)
        };
        self.begin_transition(transition);
        Ok(())
    }

    /// Sets the master volume in `[0, 1]`.
    ///
    /// During a fade the ramp keeps ownership of the volume curve; the new
    /// master takes full effect when the ramp completes.
    pub fn set_volume(&self, volume: f32) {
        {
            self.state.write().master_volume = volume.clamp(0.0, 1.0);
        }
        self.apply_volume();
    }

    /// Stops playback and resets all runtime state, ending the session.
    pub fn reset(&self) {
        self.cancel_fade();
        self.channel.stop();
        {
            let mut state = self.state.write();
            state.phase = PlaybackPhase::Idle;
            state.mode = PlaybackMode::Ambient;
            state.active_event_playlist = None;
            state.ambient_slot = ResumeSlot::default();
            state.event_slots.clear();
            state.loaded_path = None;
            state.fade_scale = 1.0;
        }
        self.apply_volume();
        self.notify_phase(PlaybackPhase::Idle);
    }

    /// Current playback mode.
    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        self.state.read().mode
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.state.read().phase
    }

    /// Whether anything is audible (playing or mid-fade).
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.read().is_audible()
    }

    /// Display name of the current track, if the active playlist has one.
    #[must_use]
    pub fn current_track_name(&self) -> Option<String> {
        let state = self.state.read();
        state.current_track().map(|track| track.name.clone())
    }

    /// Id of the active event playlist, `None` in ambient mode.
    #[must_use]
    pub fn active_playlist_id(&self) -> Option<String> {
        self.state.read().active_event_playlist.clone()
    }

    /// Track index within the current mode's playlist.
    #[must_use]
    pub fn track_index(&self) -> usize {
        self.state.read().current_slot().track_index
    }

    /// Master volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.state.read().master_volume
    }

    /// Subscribes to audible-track changes.
    #[must_use]
    pub fn subscribe_to_track_changes(&self) -> Receiver<TrackChange> {
        let (tx, rx) = unbounded();
        self.track_subscribers.lock().push(tx);
        rx
    }

    /// Subscribes to phase changes; the current phase is delivered
    /// immediately.
    #[must_use]
    pub fn subscribe_to_state_changes(&self) -> Receiver<PlaybackPhase> {
        let (tx, rx) = unbounded();
        let _ = tx.try_send(self.state.read().phase);
        self.state_subscribers.lock().push(tx);
        rx
    }

    /// Subscribes to the lightweight warning channel carrying contract
    /// violations and skipped tracks.
    #[must_use]
    pub fn subscribe_to_warnings(&self) -> Receiver<PlaybackError> {
        let (tx, rx) = unbounded();
        self.warning_subscribers.lock().push(tx);
        rx
    }

    /// Natural end-of-track: advance within the current playlist with
    /// wraparound. No fade-out is needed since the channel just went
    /// silent on its own.
    fn handle_track_finished(&self) {
        let transition = {
            let mut state = self.state.write();
            if state.phase != PlaybackPhase::Playing {
                return;
            }
            let length = state.active_tracks().len();
            if length == 0 {
                return;
            }
            let next = (state.current_slot().track_index + 1) % length;
            state.set_current_slot(ResumeSlot {
                track_index: next,
                position: Duration::ZERO,
            });
            state.phase = PlaybackPhase::Loading;
            let slot = state.current_slot();
            Transition {
                fade_out: false,
                tracks: state.active_tracks().to_vec(),
                start_index: slot.track_index,
                start_position: slot.position,
                mode: state.mode,
                playlist_id: state.active_event_playlist.clone(),
            }
        };
        self.begin_transition(transition);
    }

    /// Captures everything the fade task needs and marks the phase. Must
    /// be called with the target mode, playlist, and slot already
    /// committed.
    fn prepare_transition(&self, state: &mut EngineState) -> Transition {
        let fade_out = state.is_audible();
        state.phase = if fade_out {
            PlaybackPhase::FadingOut
        } else {
            PlaybackPhase::Loading
        };
        let slot = state.current_slot();
        Transition {
            fade_out,
            tracks: state.active_tracks().to_vec(),
            start_index: slot.track_index,
            start_position: slot.position,
            mode: state.mode,
            playlist_id: state.active_event_playlist.clone(),
        }
    }

    /// Aborts any in-flight fade and spawns the new transition task. The
    /// latest request always wins; superseded transitions are never
    /// queued.
    fn begin_transition(&self, transition: Transition) {
        self.cancel_fade();
        self.notify_phase(self.state.read().phase);
        let engine = self.clone();
        let handle = spawn(async move {
            engine.run_transition(transition).await;
        });
        *self.fade_task.lock() = Some(handle);
    }

    /// Synchronously aborts the in-flight fade task, if any.
    fn cancel_fade(&self) {
        if let Some(handle) = self.fade_task.lock().take() {
            handle.abort();
        }
    }

    async fn run_transition(self, transition: Transition) {
        if transition.fade_out {
            let from = self.state.read().fade_scale;
            self.ramp(from, 0.0).await;
        }
        self.channel.stop();
        {
            self.state.write().loaded_path = None;
        }

        // Unplayable tracks are skipped in sequence, bounded by playlist
        // length so a fully-missing playlist cannot spin.
        let total = transition.tracks.len();
        let mut index = transition.start_index;
        let mut position = transition.start_position;
        let mut loaded = None;
        for _ in 0..total {
            let track = &transition.tracks[index];
            match self.channel.load(&track.path, position) {
                Ok(()) => {
                    loaded = Some(track.clone());
                    break;
                }
                Err(error) => {
                    warn!(path = track.path, %error, "Skipping unplayable track");
                    self.report(PlaybackError::TrackUnplayable {
                        path: track.path.clone(),
                    });
                    index = (index + 1) % total;
                    position = Duration::ZERO;
                }
            }
        }

        let Some(track) = loaded else {
            {
                let mut state = self.state.write();
                state.phase = PlaybackPhase::Idle;
                state.fade_scale = 1.0;
            }
            self.apply_volume();
            self.notify_phase(PlaybackPhase::Idle);
            return;
        };

        {
            let mut state = self.state.write();
            state.set_current_slot(ResumeSlot {
                track_index: index,
                position,
            });
            state.loaded_path = Some(track.path.clone());
            state.fade_scale = 0.0;
            state.phase = PlaybackPhase::FadingIn;
        }
        self.apply_volume();
        self.channel.play();
        self.notify_phase(PlaybackPhase::FadingIn);
        self.notify_track_change(TrackChange {
            mode: transition.mode,
            playlist_id: transition.playlist_id,
            track_index: index,
            track_name: track.name,
        });

        self.ramp(0.0, 1.0).await;
        {
            self.state.write().phase = PlaybackPhase::Playing;
        }
        self.notify_phase(PlaybackPhase::Playing);
    }

    /// Fades out whatever is audible and leaves the channel idle. Used
    /// when event mode ends with no ambient playlist to fall back to.
    fn fade_to_silence(&self) {
        self.cancel_fade();
        let audible = {
            let mut state = self.state.write();
            let audible = state.is_audible();
            state.phase = if audible {
                PlaybackPhase::FadingOut
            } else {
                PlaybackPhase::Idle
            };
            if !audible {
                state.loaded_path = None;
            }
            audible
        };
        if !audible {
            self.channel.stop();
            self.notify_phase(PlaybackPhase::Idle);
            return;
        }

        self.notify_phase(PlaybackPhase::FadingOut);
        let engine = self.clone();
        let handle = spawn(async move {
            let from = engine.state.read().fade_scale;
            engine.ramp(from, 0.0).await;
            engine.channel.stop();
            {
                let mut state = engine.state.write();
                state.loaded_path = None;
                state.phase = PlaybackPhase::Idle;
                state.fade_scale = 1.0;
            }
            engine.apply_volume();
            engine.notify_phase(PlaybackPhase::Idle);
        });
        *self.fade_task.lock() = Some(handle);
    }

    fn skip_to(&self, target: impl Fn(usize, usize) -> usize) {
        let transition = {
            let mut state = self.state.write();
            let length = state.active_tracks().len();
            if length == 0 {
                let label = state.playlist_label();
                drop(state);
                self.report(PlaybackError::EmptyPlaylist { playlist: label });
                return;
            }
            let index = target(state.current_slot().track_index, length);
            state.set_current_slot(ResumeSlot {
                track_index: index,
                position: Duration::ZERO,
            });
            self.prepare_transition(&mut state)
        };
        self.begin_transition(transition);
    }

    /// Records the channel position into the outgoing playlist's resume
    /// slot, but only when the channel actually holds that playlist's
    /// current track.
    fn save_outgoing_position(&self, state: &mut EngineState) {
        let current = state.current_track().map(|track| track.path.clone());
        if current.is_some() && state.loaded_path == current {
            let mut slot = state.current_slot();
            slot.position = self.channel.position();
            state.set_current_slot(slot);
        }
    }

    /// One linear volume ramp of the configured duration, driven by
    /// periodic steps on the fade scale.
    async fn ramp(&self, from: f32, to: f32) {
        let steps = self.config.fade_steps.max(1);
        let step_delay = self.config.fade_duration / steps;
        for step in 1..=steps {
            sleep(step_delay).await;
            let progress = step as f32 / steps as f32;
            {
                self.state.write().fade_scale = from + (to - from) * progress;
            }
            self.apply_volume();
        }
    }

    fn apply_volume(&self) {
        let (master, scale) = {
            let state = self.state.read();
            (state.master_volume, state.fade_scale)
        };
        self.channel.set_volume(master * scale);
    }

    fn notify_track_change(&self, change: TrackChange) {
        for tx in self.track_subscribers.lock().iter() {
            let _ = tx.try_send(change.clone());
        }
    }

    fn notify_phase(&self, phase: PlaybackPhase) {
        for tx in self.state_subscribers.lock().iter() {
            let _ = tx.try_send(phase);
        }
    }

    fn report(&self, error: PlaybackError) {
        warn!(%error, "Playback warning");
        for tx in self.warning_subscribers.lock().iter() {
            let _ = tx.try_send(error.clone());
        }
    }
}

fn same_track_paths(previous: &[AudioTrack], next: &[AudioTrack]) -> bool {
    previous.len() == next.len()
        && previous
            .iter()
            .zip(next)
            .all(|(a, b)| a.path == b.path)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use {
        async_channel::{Sender, unbounded},
        tokio::time::sleep,
    };

    use crate::{
        playback::{
            channel::mock::MockChannel,
            config::PlaybackConfig,
            engine::{PlaybackEngine, PlaybackError, PlaybackMode, PlaybackPhase},
        },
        session::{AudioTrack, FileKind, FileReference, Playlist},
    };

    fn track(path: &str) -> AudioTrack {
        FileReference::new(path, FileKind::Audio)
    }

    fn ambient() -> Vec<AudioTrack> {
        vec![
            track("music/act1/a.ogg"),
            track("music/act1/b.ogg"),
            track("music/act1/c.ogg"),
        ]
    }

    fn combat() -> Playlist {
        Playlist {
            id: "act-1/combat".to_string(),
            name: "combat".to_string(),
            tracks: vec![
                track("music/act1/combat/drums.ogg"),
                track("music/act1/combat/horns.ogg"),
            ],
        }
    }

    fn engine_over(
        channel: &Arc<MockChannel>,
    ) -> (PlaybackEngine<MockChannel>, Sender<()>) {
        let (finished_tx, finished_rx) = unbounded();
        let engine = PlaybackEngine::new(
            Arc::clone(channel),
            finished_rx,
            PlaybackConfig::default(),
        );
        (engine, finished_tx)
    }

    /// Lets any in-flight fade task run to completion on virtual time.
    async fn settle() {
        sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_ambient_fades_in_first_track() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_ambient();
        settle().await;

        assert_eq!(
            channel.loads(),
            vec![("music/act1/a.ogg".to_string(), Duration::ZERO)]
        );
        assert!(channel.is_playing());
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        assert_eq!(engine.current_track_name().as_deref(), Some("a.ogg"));
        assert_eq!(channel.volume_trace().last(), Some(&1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_ambient_is_a_warning_not_an_error() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        let warnings = engine.subscribe_to_warnings();

        engine.play_ambient();
        settle().await;

        assert!(channel.loads().is_empty());
        assert_eq!(engine.phase(), PlaybackPhase::Idle);
        assert_eq!(
            warnings.try_recv().unwrap(),
            PlaybackError::EmptyPlaylist {
                playlist: "ambient".to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_wraps_around_both_directions() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_track_at_index(2).unwrap();
        settle().await;
        assert_eq!(engine.track_index(), 2);

        engine.skip_next();
        settle().await;
        assert_eq!(engine.track_index(), 0);

        engine.skip_previous();
        settle().await;
        assert_eq!(engine.track_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_track_at_index_is_bounds_checked() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        let result = engine.play_track_at_index(3);
        assert_eq!(
            result,
            Err(PlaybackError::IndexOutOfRange {
                index: 3,
                length: 3,
            })
        );
        assert!(channel.loads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_event_playlist_is_an_error() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_event_playlists(vec![combat()]);

        let result = engine.start_event("act-1/tavern");
        assert_eq!(
            result,
            Err(PlaybackError::PlaylistNotFound {
                id: "act-1/tavern".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_event_playlist_is_a_warning_no_op() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_event_playlists(vec![Playlist {
            id: "act-1/silence".to_string(),
            name: "silence".to_string(),
            tracks: vec![],
        }]);
        let warnings = engine.subscribe_to_warnings();

        assert!(engine.start_event("act-1/silence").is_ok());
        settle().await;

        assert!(channel.loads().is_empty());
        assert!(matches!(
            warnings.try_recv(),
            Ok(PlaybackError::EmptyPlaylist { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_playlist_resume_memory() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());
        engine.load_event_playlists(vec![combat()]);

        engine.start_event("act-1/combat").unwrap();
        settle().await;
        engine.play_track_at_index(1).unwrap();
        settle().await;

        channel.set_position(Duration::from_secs(12));
        engine.play_ambient();
        settle().await;
        assert_eq!(engine.mode(), PlaybackMode::Ambient);

        engine.start_event("act-1/combat").unwrap();
        settle().await;
        assert_eq!(
            channel.loads().last().unwrap(),
            &(
                "music/act1/combat/horns.ogg".to_string(),
                Duration::from_secs(12)
            )
        );
        assert_eq!(engine.track_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_skips_produce_one_transition_to_second_target() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_ambient();
        settle().await;

        engine.skip_next();
        sleep(Duration::from_millis(300)).await;
        engine.skip_next();
        settle().await;

        // The first skip's fade was superseded mid-ramp; its target was
        // never loaded.
        let loaded: Vec<String> = channel
            .loads()
            .iter()
            .map(|(path, _)| path.rsplit('/').next().unwrap().to_string())
            .collect();
        assert_eq!(loaded, ["a.ogg", "c.ogg"]);
        assert_eq!(engine.track_index(), 2);

        // Volume trace after the initial fade-in is one ramp down followed
        // by one ramp up; two independent fades would interleave.
        let trace = channel.volume_trace();
        let first_peak = trace
            .iter()
            .skip(1)
            .position(|v| (*v - 1.0).abs() < f32::EPSILON)
            .map(|i| i + 1)
            .unwrap();
        let rest = &trace[first_peak + 1..];
        let valley = rest
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!(rest[..valley].windows(2).all(|w| w[1] <= w[0]));
        assert!(rest[valley..].windows(2).all(|w| w[1] >= w[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unplayable_track_is_skipped_not_fatal() {
        let channel = Arc::new(MockChannel::new());
        channel.fail_path("music/act1/b.ogg");
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());
        let warnings = engine.subscribe_to_warnings();

        engine.play_ambient();
        settle().await;
        engine.skip_next();
        settle().await;

        assert_eq!(channel.loaded().as_deref(), Some("music/act1/c.ogg"));
        assert_eq!(engine.track_index(), 2);
        assert!(matches!(
            warnings.try_recv(),
            Ok(PlaybackError::TrackUnplayable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fully_unplayable_playlist_goes_idle() {
        let channel = Arc::new(MockChannel::new());
        for path in ["music/act1/a.ogg", "music/act1/b.ogg", "music/act1/c.ogg"] {
            channel.fail_path(path);
        }
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_ambient();
        settle().await;

        assert_eq!(engine.phase(), PlaybackPhase::Idle);
        assert!(channel.loaded().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_keep_position() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_ambient();
        settle().await;
        channel.set_position(Duration::from_secs(7));

        engine.pause();
        assert!(!channel.is_playing());
        assert_eq!(engine.phase(), PlaybackPhase::Paused);
        let loads_before = channel.loads().len();

        engine.resume();
        assert!(channel.is_playing());
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        // Continuation, not a reload.
        assert_eq!(channel.loads().len(), loads_before);
        assert_eq!(channel.position(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_mid_transition_reloads_target_on_resume() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_ambient();
        settle().await;
        engine.skip_next();
        // Mid-fade-out: the channel still holds the outgoing track.
        sleep(Duration::from_millis(100)).await;
        engine.pause();
        assert_eq!(engine.phase(), PlaybackPhase::Paused);

        engine.resume();
        assert_eq!(channel.loaded().as_deref(), Some("music/act1/b.ogg"));
        assert!(channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_natural_end_advances_with_wraparound() {
        let channel = Arc::new(MockChannel::new());
        let (engine, finished_tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_track_at_index(2).unwrap();
        settle().await;

        finished_tx.send(()).await.unwrap();
        settle().await;

        assert_eq!(engine.track_index(), 0);
        assert_eq!(channel.loaded().as_deref(), Some("music/act1/a.ogg"));
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_ambient_identity_preserves_resume_memory() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());

        engine.play_track_at_index(1).unwrap();
        settle().await;
        assert_eq!(engine.track_index(), 1);

        // Same path sequence across a part switch: nothing resets.
        engine.load_ambient(ambient());
        assert_eq!(engine.track_index(), 1);

        // A different sequence resets the slot.
        engine.load_ambient(vec![track("music/act2/other.ogg")]);
        assert_eq!(engine.track_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_event_falls_back_to_ambient() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());
        engine.load_event_playlists(vec![combat()]);

        engine.start_event("act-1/combat").unwrap();
        settle().await;

        engine.stop_event();
        settle().await;

        assert_eq!(engine.mode(), PlaybackMode::Ambient);
        assert!(engine.active_playlist_id().is_none());
        assert_eq!(channel.loaded().as_deref(), Some("music/act1/a.ogg"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_event_without_ambient_fades_to_silence() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_event_playlists(vec![combat()]);

        engine.start_event("act-1/combat").unwrap();
        settle().await;

        engine.stop_event();
        settle().await;

        assert_eq!(engine.phase(), PlaybackPhase::Idle);
        assert!(channel.loaded().is_none());
        assert!(!channel.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_change_notifications() {
        let channel = Arc::new(MockChannel::new());
        let (engine, _tx) = engine_over(&channel);
        engine.load_ambient(ambient());
        let changes = engine.subscribe_to_track_changes();

        engine.play_ambient();
        settle().await;

        let change = changes.try_recv().unwrap();
        assert_eq!(change.track_name, "a.ogg");
        assert_eq!(change.mode, PlaybackMode::Ambient);
        assert_eq!(change.track_index, 0);
        assert!(change.playlist_id.is_none());
    }
}
