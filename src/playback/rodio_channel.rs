//! Real audio backend over rodio.
//!
//! One [`RodioChannel`] owns one `rodio::Sink` at a time. Resume offsets
//! are applied by skipping into the decoded source; the playback position
//! is tracked by the channel itself (load offset plus play-time
//! accounting) rather than by decoding state. Natural end-of-track is
//! detected by a watcher thread keyed to a generation counter, so a sink
//! that has been superseded can never signal completion.

use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering::SeqCst},
    },
    thread::{park, sleep, spawn},
    time::{Duration, Instant},
};

use {
    async_channel::Sender,
    parking_lot::Mutex,
    rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source},
    tracing::debug,
};

use crate::{
    playback::channel::{AudioChannel, ChannelError},
    store::FileStore,
};

const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Elapsed-time accounting for the loaded track: load offset plus
/// accumulated audible time.
#[derive(Debug, Default)]
struct PositionClock {
    offset: Duration,
    accumulated: Duration,
    playing_since: Option<Instant>,
}

impl PositionClock {
    fn reset(&mut self, offset: Duration) {
        *self = Self {
            offset,
            ..Self::default()
        };
    }

    fn start(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn halt(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn position(&self) -> Duration {
        let live = self
            .playing_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        self.offset + self.accumulated + live
    }
}

/// [`AudioChannel`] implementation backed by a rodio output device.
///
/// Track paths are session-relative and resolved through the store the
/// channel was constructed with, so nothing outside the session root is
/// ever opened.
pub struct RodioChannel<S: FileStore> {
    store: Arc<S>,
    handle: OutputStreamHandle,
    sink: Mutex<Option<Arc<Sink>>>,
    clock: Mutex<PositionClock>,
    volume: Mutex<f32>,
    generation: Arc<AtomicU64>,
    completion_tx: Sender<()>,
}

impl<S: FileStore> RodioChannel<S> {
    /// Opens the default audio output device.
    ///
    /// `completion_tx` receives one message per naturally finished track;
    /// hand the paired receiver to the engine.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::OutputUnavailable` when no output device can
    /// be opened.
    pub fn new(store: Arc<S>, completion_tx: Sender<()>) -> Result<Self, ChannelError> {
        // The cpal stream is not `Send`; a dedicated thread owns it for
        // the lifetime of the process and hands back the shareable handle.
        let (handle_tx, handle_rx) = std::sync::mpsc::channel();
        spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                if handle_tx.send(Ok(handle)).is_ok() {
                    let _stream = stream;
                    loop {
                        park();
                    }
                }
            }
            Err(error) => {
                let _ = handle_tx.send(Err(error.to_string()));
            }
        });

        let handle = handle_rx
            .recv()
            .unwrap_or_else(|_| Err("output thread exited".to_string()))
            .map_err(|reason| ChannelError::OutputUnavailable { reason })?;
        debug!("Opened default audio output device");

        Ok(Self {
            store,
            handle,
            sink: Mutex::new(None),
            clock: Mutex::new(PositionClock::default()),
            volume: Mutex::new(1.0),
            generation: Arc::new(AtomicU64::new(0)),
            completion_tx,
        })
    }

    /// Watches one sink for natural completion. Stale sinks never signal:
    /// the watcher exits as soon as its generation is superseded.
    fn spawn_completion_watch(&self, sink: Arc<Sink>, generation: u64) {
        let current = Arc::clone(&self.generation);
        let completion_tx = self.completion_tx.clone();
        spawn(move || {
            loop {
                sleep(COMPLETION_POLL_INTERVAL);
                if current.load(SeqCst) != generation {
                    return;
                }
                if sink.empty() {
                    if current.load(SeqCst) == generation {
                        let _ = completion_tx.send_blocking(());
                    }
                    return;
                }
            }
        });
    }
}

impl<S: FileStore + 'static> AudioChannel for RodioChannel<S> {
    fn load(&self, track_path: &str, start_at: Duration) -> Result<(), ChannelError> {
        let resolved = self
            .store
            .resolve(track_path)
            .map_err(|_| ChannelError::SourceNotFound {
                path: track_path.to_string(),
            })?;
        let file = File::open(&resolved).map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                ChannelError::SourceNotFound {
                    path: track_path.to_string(),
                }
            } else {
                ChannelError::Undecodable {
                    path: track_path.to_string(),
                    reason: error.to_string(),
                }
            }
        })?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|error| ChannelError::Undecodable {
                path: track_path.to_string(),
                reason: error.to_string(),
            })?;
        let source = decoder.skip_duration(start_at);

        let sink =
            Sink::try_new(&self.handle).map_err(|error| ChannelError::OutputUnavailable {
                reason: error.to_string(),
            })?;
        sink.set_volume(*self.volume.lock());
        sink.append(source);
        // The engine starts playback explicitly.
        sink.pause();
        let sink = Arc::new(sink);

        let generation = self.generation.fetch_add(1, SeqCst) + 1;
        if let Some(previous) = self.sink.lock().replace(Arc::clone(&sink)) {
            previous.stop();
        }
        self.clock.lock().reset(start_at);
        self.spawn_completion_watch(sink, generation);
        Ok(())
    }

    fn play(&self) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.play();
            self.clock.lock().start();
        }
    }

    fn pause(&self) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.pause();
            self.clock.lock().halt();
        }
    }

    fn stop(&self) {
        self.generation.fetch_add(1, SeqCst);
        if let Some(sink) = self.sink.lock().take() {
            sink.stop();
        }
        *self.clock.lock() = PositionClock::default();
    }

    fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        *self.volume.lock() = clamped;
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.set_volume(clamped);
        }
    }

    fn position(&self) -> Duration {
        self.clock.lock().position()
    }
}
