use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::catalog::Locator;
use crate::config::EngineSettings;
use crate::error::EngineError;
use crate::session::{Generation, Volume};

use super::loader::{LoadJob, spawn_loader};
use super::thread::{EngineCmd, spawn_engine_thread};
use super::types::{AudioEngine, EngineEvent, EventSender};

/// No load in flight.
const NO_GENERATION: u64 = 0;

/// `AudioEngine` backed by a rodio output stream on a dedicated thread.
///
/// Sources are read on short-lived loader threads so byte progress flows
/// back while the engine thread stays responsive.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    active: Arc<AtomicU64>,
    events: EventSender,
    chunk_bytes: usize,
    quit_fade_out_ms: u64,
    join: Option<JoinHandle<()>>,
}

impl RodioEngine {
    pub fn spawn(events: EventSender, settings: &EngineSettings) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let active = Arc::new(AtomicU64::new(NO_GENERATION));

        let join = spawn_engine_thread(
            rx,
            events.clone(),
            active.clone(),
            Duration::from_millis(settings.poll_ms.max(1)),
        )?;

        Ok(Self {
            tx,
            active,
            events,
            chunk_bytes: settings.read_chunk_bytes,
            quit_fade_out_ms: settings.quit_fade_out_ms,
            join: Some(join),
        })
    }

    fn send(&self, cmd: EngineCmd) {
        if self.tx.send(cmd).is_err() {
            log::warn!("engine: command dropped, engine thread is gone");
            self.events.emit(EngineEvent::Error {
                generation: None,
                reason: EngineError::Disconnected.to_string(),
            });
        }
    }
}

impl AudioEngine for RodioEngine {
    fn content_length(&self, locator: &Locator) -> Option<u64> {
        fs::metadata(locator.as_path())
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn load(&mut self, generation: Generation, locator: &Locator) {
        self.active.store(generation.get(), Ordering::SeqCst);

        let job = LoadJob {
            generation,
            path: locator.as_path().to_path_buf(),
            chunk_bytes: self.chunk_bytes,
            active: self.active.clone(),
            events: self.events.clone(),
        };
        if let Err(e) = spawn_loader(job, self.tx.clone()) {
            self.events.emit(EngineEvent::Error {
                generation: Some(generation),
                reason: format!("failed to start loader: {e}"),
            });
        }
    }

    fn abort_load(&mut self, generation: Generation) {
        let _ = self.active.compare_exchange(
            generation.get(),
            NO_GENERATION,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn play(&mut self) {
        self.send(EngineCmd::Play);
    }

    fn pause(&mut self) {
        self.send(EngineCmd::Pause);
    }

    fn stop(&mut self) {
        self.send(EngineCmd::Stop);
    }

    fn set_volume(&mut self, volume: Volume) {
        self.send(EngineCmd::SetVolume(volume));
    }

    fn unload(&mut self) {
        self.active.store(NO_GENERATION, Ordering::SeqCst);
        self.send(EngineCmd::Unload);
    }
}

impl Drop for RodioEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Quit {
            fade_out_ms: self.quit_fade_out_ms,
        });
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}
