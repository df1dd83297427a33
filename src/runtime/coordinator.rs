//! The single owner of the session and catalog.
//!
//! UI commands, engine events and progress ticks all land in one inbox and
//! are applied one at a time on the coordinator thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::catalog::{CatalogStore, Locator, Track, TrackId};
use crate::config::Settings;
use crate::engine::{AudioEngine, EngineEvent, EventSender};
use crate::error::{EngineError, PlayerError};
use crate::session::{Generation, Session, Snapshot, SnapshotHandle};

use super::ticker::Ticker;

/// What the UI can ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(TrackId),
    Play,
    Pause,
    Stop,
    SetVolume(f32),
    CancelLoad,
    Unload,
    AddTrack { name: String, source: Locator },
    RemoveTrack(TrackId),
}

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Session(Snapshot),
    Added(Track),
    Removed(Track),
}

type Reply = Sender<Result<Outcome, PlayerError>>;

pub(super) enum Inbox {
    Command {
        command: Command,
        reply: Option<Reply>,
    },
    Engine(EngineEvent),
    Tick(Generation),
    Subscribe(Sender<Snapshot>),
    Shutdown,
}

pub type TracksHandle = Arc<Mutex<Vec<Track>>>;

/// Handle to the running coordinator thread.
pub struct Coordinator {
    tx: Sender<Inbox>,
    latest: SnapshotHandle,
    tracks: TracksHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Start the coordinator around `catalog` and the engine built by
    /// `make_engine`, which receives the sender its events must go through.
    pub fn spawn<E, F>(
        settings: &Settings,
        catalog: CatalogStore,
        make_engine: F,
    ) -> Result<Self, PlayerError>
    where
        E: AudioEngine + 'static,
        F: FnOnce(EventSender) -> Result<E, EngineError>,
    {
        let (tx, rx) = mpsc::channel::<Inbox>();

        let engine_tx = tx.clone();
        let events = EventSender::new(move |e| engine_tx.send(Inbox::Engine(e)).is_ok());
        let engine = make_engine(events)?;

        let session = Session::new(engine, settings);
        let latest = session.latest_handle();
        let tracks: TracksHandle = Arc::new(Mutex::new(catalog.list()));

        let ticker = Ticker::spawn(
            tx.clone(),
            Duration::from_millis(settings.progress.tick_ms.max(1)),
        )
        .map_err(EngineError::from)?;

        let tracks_for_actor = tracks.clone();
        let join = thread::Builder::new()
            .name("player95-session".into())
            .spawn(move || run(rx, session, catalog, tracks_for_actor, ticker))
            .map_err(EngineError::from)?;

        Ok(Self {
            tx,
            latest,
            tracks,
            join: Mutex::new(Some(join)),
        })
    }

    /// Submit `command` and wait for it to be accepted or rejected.
    ///
    /// Returns as soon as the session has applied it; engine completions
    /// arrive later as snapshots.
    pub fn submit(&self, command: Command) -> Result<Outcome, PlayerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Inbox::Command {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| PlayerError::Disconnected)?;
        reply_rx.recv().map_err(|_| PlayerError::Disconnected)?
    }

    /// Queue `command` without waiting for the outcome.
    pub fn send(&self, command: Command) -> Result<(), PlayerError> {
        self.tx
            .send(Inbox::Command {
                command,
                reply: None,
            })
            .map_err(|_| PlayerError::Disconnected)
    }

    /// Stream of snapshots, starting with the current one.
    pub fn subscribe(&self) -> Result<Receiver<Snapshot>, PlayerError> {
        let (tx, rx) = mpsc::channel();
        self.tx
            .send(Inbox::Subscribe(tx))
            .map_err(|_| PlayerError::Disconnected)?;
        Ok(rx)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.latest
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Catalog contents in insertion order.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks
            .lock()
            .map(|t| t.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Stop the coordinator thread and release the engine. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Inbox::Shutdown);
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<E: AudioEngine>(
    rx: Receiver<Inbox>,
    mut session: Session<E>,
    mut catalog: CatalogStore,
    tracks: TracksHandle,
    ticker: Ticker,
) {
    log::info!("session: coordinator running");
    while let Ok(msg) = rx.recv() {
        match msg {
            Inbox::Command { command, reply } => {
                let result = apply(&mut session, &mut catalog, &tracks, command);
                if let Err(ref e) = result {
                    log::debug!("session: command failed: {e}");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Inbox::Engine(event) => {
                session.on_engine_event(event);
            }
            Inbox::Tick(generation) => {
                session.tick(generation);
            }
            Inbox::Subscribe(tx) => session.add_subscriber(tx),
            Inbox::Shutdown => break,
        }
        ticker.follow(session.simulating());
    }
    log::info!("session: coordinator stopped");
}

fn apply<E: AudioEngine>(
    session: &mut Session<E>,
    catalog: &mut CatalogStore,
    tracks: &TracksHandle,
    command: Command,
) -> Result<Outcome, PlayerError> {
    let snapshot = match command {
        Command::Load(id) => {
            let track = catalog.get(&id).cloned().ok_or(PlayerError::NotFound(id))?;
            session.load(&track)?
        }
        Command::Play => session.play()?,
        Command::Pause => session.pause()?,
        Command::Stop => session.stop()?,
        Command::SetVolume(v) => session.set_volume(v),
        Command::CancelLoad => session.cancel_load()?,
        Command::Unload => session.unload()?,
        Command::AddTrack { name, source } => {
            let track = catalog.add(&name, source)?;
            publish_tracks(catalog, tracks);
            return Ok(Outcome::Added(track));
        }
        Command::RemoveTrack(id) => {
            let track = catalog.remove(&id)?;
            session.track_removed(&track.id);
            publish_tracks(catalog, tracks);
            return Ok(Outcome::Removed(track));
        }
    };
    Ok(Outcome::Session(snapshot))
}

fn publish_tracks(catalog: &CatalogStore, tracks: &TracksHandle) {
    if let Ok(mut t) = tracks.lock() {
        *t = catalog.list();
    }
}
