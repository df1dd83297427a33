//! Reads a source off the engine thread, reporting byte counts as it goes.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::session::Generation;

use super::thread::EngineCmd;
use super::types::{EngineEvent, EventSender};

pub(super) struct LoadJob {
    pub generation: Generation,
    pub path: PathBuf,
    pub chunk_bytes: usize,
    /// Generation the engine currently wants; anything else means abort.
    pub active: Arc<AtomicU64>,
    pub events: EventSender,
}

impl LoadJob {
    fn aborted(&self) -> bool {
        self.active.load(Ordering::SeqCst) != self.generation.get()
    }
}

/// Read the whole source, emitting `BytesRead` after every chunk.
///
/// Returns `Ok(None)` if the job was superseded midway.
pub(super) fn read_source(job: &LoadJob) -> io::Result<Option<Vec<u8>>> {
    let mut file = File::open(&job.path)?;
    let mut bytes: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; job.chunk_bytes.max(1)];

    loop {
        if job.aborted() {
            return Ok(None);
        }
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&buf[..n]);
        job.events.emit(EngineEvent::BytesRead {
            generation: job.generation,
            bytes_read: bytes.len() as u64,
        });
    }

    Ok(Some(bytes))
}

/// Run `job` on its own thread and hand the bytes to the engine thread.
pub(super) fn spawn_loader(job: LoadJob, engine: Sender<EngineCmd>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("player95-load-{}", job.generation.get()))
        .spawn(move || match read_source(&job) {
            Ok(Some(bytes)) => {
                let _ = engine.send(EngineCmd::Install {
                    generation: job.generation,
                    bytes: bytes.into(),
                });
            }
            Ok(None) => {
                log::debug!("engine: load {} aborted", job.generation);
            }
            Err(e) => {
                job.events.emit(EngineEvent::Error {
                    generation: Some(job.generation),
                    reason: format!("failed to read {}: {e}", job.path.display()),
                });
            }
        })
}
