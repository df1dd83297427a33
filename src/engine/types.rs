//! The audio engine contract: commands the session issues and the events
//! the engine answers with.

use std::fmt;
use std::sync::Arc;

use crate::catalog::Locator;
use crate::session::{Generation, Volume};

/// Something that can actually play audio.
///
/// Every command is fire-and-forget: the engine starts the work and
/// reports completion later through its `EventSender`.
pub trait AudioEngine: Send {
    /// Size of the source in bytes, when it can be found cheaply.
    fn content_length(&self, _locator: &Locator) -> Option<u64> {
        None
    }

    /// Begin loading `locator`; answer with `Loaded` or `Error` tagged `generation`.
    fn load(&mut self, generation: Generation, locator: &Locator);

    /// Give up on an in-flight load, if the engine supports it.
    fn abort_load(&mut self, _generation: Generation) {}

    fn play(&mut self);
    fn pause(&mut self);
    /// Halt and rewind to the start.
    fn stop(&mut self);
    fn set_volume(&mut self, volume: Volume);
    /// Release the loaded track.
    fn unload(&mut self);
}

/// Events raised by an engine. Untagged events apply to the current episode.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    BytesRead {
        generation: Generation,
        bytes_read: u64,
    },
    Loaded {
        generation: Option<Generation>,
    },
    Ended {
        generation: Option<Generation>,
    },
    Error {
        generation: Option<Generation>,
        reason: String,
    },
}

/// Where an engine delivers its events. Cheap to clone into worker threads.
#[derive(Clone)]
pub struct EventSender {
    deliver: Arc<dyn Fn(EngineEvent) -> bool + Send + Sync>,
}

impl EventSender {
    pub fn new(deliver: impl Fn(EngineEvent) -> bool + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Deliver `event`; false once the receiving side is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        (self.deliver)(event)
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender").finish_non_exhaustive()
    }
}
