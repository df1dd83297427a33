//! Audio engine collaborator.
//!
//! `AudioEngine` is the seam the session drives; `RodioEngine` is the
//! implementation the binary uses. The engine thread owns the output stream
//! and reports back through an `EventSender`.

mod loader;
mod player;
mod sink;
mod thread;
mod types;

pub use player::RodioEngine;
pub use types::{AudioEngine, EngineEvent, EventSender};
