use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::catalog::{Track, TrackId};
use crate::config::Settings;
use crate::engine::{AudioEngine, EngineEvent};
use crate::error::SessionError;
use crate::progress::{EstimatorHandle, Progress, ProgressEstimator};

use super::types::{Generation, PlaybackState, Snapshot, SnapshotHandle, Volume};

/// The playback state machine.
///
/// Owns the playback state, load progress and volume, and is the only
/// thing that issues lifecycle commands to the engine. Every accepted change
/// publishes one `Snapshot` to subscribers, in acceptance order.
pub struct Session<E: AudioEngine> {
    engine: E,
    estimator: ProgressEstimator,
    state: PlaybackState,
    track: Option<TrackId>,
    /// Current load episode; engine events for any other generation are stale.
    episode: Option<EstimatorHandle>,
    last_generation: u64,
    volume: Volume,
    /// Volume changed while nothing was loaded; apply on next play.
    volume_pending: bool,
    error: Option<String>,
    revision: u64,
    subscribers: Vec<Sender<Snapshot>>,
    latest: SnapshotHandle,
}

impl<E: AudioEngine> Session<E> {
    pub fn new(engine: E, settings: &Settings) -> Self {
        let volume = Volume::new(settings.playback.initial_volume);
        let latest = Arc::new(Mutex::new(Snapshot {
            volume,
            ..Snapshot::default()
        }));
        Self {
            engine,
            estimator: ProgressEstimator::new(&settings.progress),
            state: PlaybackState::Idle,
            track: None,
            episode: None,
            last_generation: 0,
            volume,
            volume_pending: true,
            error: None,
            revision: 0,
            subscribers: Vec::new(),
            latest,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[cfg(test)]
    pub fn track_id(&self) -> Option<&TrackId> {
        self.track.as_ref()
    }

    #[cfg(test)]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Load progress as subscribers see it.
    ///
    /// `done` stays off until the engine confirms the load, even once every
    /// byte has been read; it turns on together with `Ready`.
    pub fn progress(&self) -> Progress {
        let progress = self.estimator.progress();
        if self.state == PlaybackState::Loading {
            Progress {
                done: false,
                ..progress
            }
        } else {
            progress
        }
    }

    /// Generation of the current load episode, if any.
    #[cfg(test)]
    pub fn generation(&self) -> Option<Generation> {
        self.episode.map(EstimatorHandle::generation)
    }

    #[cfg(test)]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            state: self.state,
            track_id: self.track.clone(),
            progress: self.progress(),
            volume: self.volume,
            error: self.error.clone(),
        }
    }

    pub fn latest_handle(&self) -> SnapshotHandle {
        self.latest.clone()
    }

    /// Register `tx` and immediately send it the current snapshot.
    pub fn add_subscriber(&mut self, tx: Sender<Snapshot>) {
        if tx.send(self.snapshot()).is_ok() {
            self.subscribers.push(tx);
        }
    }

    #[cfg(test)]
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<Snapshot> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.add_subscriber(tx);
        rx
    }

    /// Episode still relying on timer ticks for progress.
    pub fn simulating(&self) -> Option<Generation> {
        if self.state == PlaybackState::Loading {
            self.estimator.simulating()
        } else {
            None
        }
    }

    /// Select `track` and start loading it.
    ///
    /// Repeating the load of the track already loading, ready or playing
    /// returns the current snapshot untouched. Loading a different track
    /// while one is still loading is rejected; from any settled state the
    /// new track supersedes the old one.
    pub fn load(&mut self, track: &Track) -> Result<Snapshot, SessionError> {
        let same = self.track.as_ref() == Some(&track.id);
        match self.state {
            PlaybackState::Loading | PlaybackState::Ready | PlaybackState::Playing if same => {
                return Ok(self.snapshot());
            }
            PlaybackState::Loading => return Err(self.reject("load")),
            _ => {}
        }

        self.release();

        self.last_generation += 1;
        let generation = Generation::new(self.last_generation);
        let total = self.engine.content_length(&track.source);
        self.episode = Some(self.estimator.begin(generation, total));
        self.track = Some(track.id.clone());
        self.error = None;
        self.state = PlaybackState::Loading;

        self.engine.set_volume(self.volume);
        self.volume_pending = false;
        self.engine.load(generation, &track.source);

        log::debug!(
            "session: loading {} as {generation} ({})",
            track.id,
            if total.is_some() { "counted" } else { "simulated" }
        );
        Ok(self.publish())
    }

    pub fn cancel_load(&mut self) -> Result<Snapshot, SessionError> {
        if self.state != PlaybackState::Loading {
            return Err(self.reject("cancel load"));
        }
        self.release();
        self.enter_idle();
        Ok(self.publish())
    }

    pub fn play(&mut self) -> Result<Snapshot, SessionError> {
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Stopped => {
                if self.volume_pending {
                    self.engine.set_volume(self.volume);
                    self.volume_pending = false;
                }
                self.engine.play();
                self.state = PlaybackState::Playing;
                Ok(self.publish())
            }
            _ => Err(self.reject("play")),
        }
    }

    pub fn pause(&mut self) -> Result<Snapshot, SessionError> {
        if self.state != PlaybackState::Playing {
            return Err(self.reject("pause"));
        }
        self.engine.pause();
        self.state = PlaybackState::Paused;
        Ok(self.publish())
    }

    /// Halt playback and rewind to the start.
    pub fn stop(&mut self) -> Result<Snapshot, SessionError> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.engine.stop();
                self.state = PlaybackState::Stopped;
                Ok(self.publish())
            }
            _ => Err(self.reject("stop")),
        }
    }

    /// Drop the selection from any state but `Idle`.
    pub fn unload(&mut self) -> Result<Snapshot, SessionError> {
        if self.state == PlaybackState::Idle {
            return Err(self.reject("unload"));
        }
        self.release();
        self.enter_idle();
        Ok(self.publish())
    }

    /// Always accepted. Reaches the engine only while a track is loaded.
    pub fn set_volume(&mut self, raw: f32) -> Snapshot {
        let volume = Volume::new(raw);
        if volume == self.volume {
            return self.snapshot();
        }
        self.volume = volume;
        if self.state.is_loaded() {
            self.engine.set_volume(volume);
        } else {
            self.volume_pending = true;
        }
        self.publish()
    }

    /// The catalog dropped `id`; never leave it selected.
    pub fn track_removed(&mut self, id: &TrackId) -> Option<Snapshot> {
        if self.track.as_ref() != Some(id) {
            return None;
        }
        log::debug!("session: selected track {id} was removed");
        self.release();
        self.enter_idle();
        Some(self.publish())
    }

    /// Advance simulated progress for `generation`; stale ticks are dropped.
    pub fn tick(&mut self, generation: Generation) -> Option<Snapshot> {
        if self.state != PlaybackState::Loading {
            return None;
        }
        let handle = self.current_episode(Some(generation))?;
        self.estimator.tick(handle)?;
        Some(self.publish())
    }

    /// Apply an engine event; returns the snapshot if it changed anything.
    pub fn on_engine_event(&mut self, event: EngineEvent) -> Option<Snapshot> {
        match event {
            EngineEvent::BytesRead {
                generation,
                bytes_read,
            } => {
                let handle = self.current_episode(Some(generation))?;
                if self.state != PlaybackState::Loading {
                    return None;
                }
                self.estimator.record_bytes(handle, bytes_read)?;
                Some(self.publish())
            }

            EngineEvent::Loaded { generation } => {
                let handle = self.current_episode(generation)?;
                if self.state != PlaybackState::Loading {
                    log::debug!("session: ignoring loaded while {}", self.state);
                    return None;
                }
                self.estimator.complete(handle);
                self.state = PlaybackState::Ready;
                Some(self.publish())
            }

            EngineEvent::Ended { generation } => {
                self.current_episode(generation)?;
                if self.state != PlaybackState::Playing {
                    return None;
                }
                self.state = PlaybackState::Stopped;
                Some(self.publish())
            }

            EngineEvent::Error { generation, reason } => {
                let handle = self.current_episode(generation)?;
                if self.state == PlaybackState::Failed {
                    return None;
                }
                log::warn!("session: engine error on {}: {reason}", handle.generation());
                self.estimator.cancel(handle);
                self.state = PlaybackState::Failed;
                self.error = Some(reason);
                Some(self.publish())
            }
        }
    }

    /// Match an event's generation against the current episode.
    fn current_episode(&self, generation: Option<Generation>) -> Option<EstimatorHandle> {
        let Some(handle) = self.episode else {
            log::debug!("session: dropping engine event with no episode");
            return None;
        };
        match generation {
            Some(g) if g != handle.generation() => {
                log::debug!(
                    "session: dropping stale event for {g}, current is {}",
                    handle.generation()
                );
                None
            }
            _ => Some(handle),
        }
    }

    /// Tell the engine to let go of whatever the current episode holds.
    fn release(&mut self) {
        if let Some(handle) = self.episode.take() {
            self.estimator.cancel(handle);
            if self.state == PlaybackState::Loading {
                self.engine.abort_load(handle.generation());
            }
        }
        if self.state != PlaybackState::Idle {
            self.engine.unload();
        }
    }

    fn enter_idle(&mut self) {
        self.state = PlaybackState::Idle;
        self.track = None;
        self.error = None;
    }

    fn reject(&self, command: &'static str) -> SessionError {
        log::debug!("session: rejected {command} while {}", self.state);
        SessionError::InvalidTransition {
            command,
            state: self.state,
        }
    }

    fn publish(&mut self) -> Snapshot {
        self.revision += 1;
        let snap = self.snapshot();
        if let Ok(mut latest) = self.latest.lock() {
            *latest = snap.clone();
        }
        self.subscribers.retain(|tx| tx.send(snap.clone()).is_ok());
        snap
    }
}
