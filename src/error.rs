//! Error taxonomy shared by the catalog, the session and the coordinator.

use std::io;

use crate::catalog::TrackId;
use crate::session::PlaybackState;

/// A command that is not legal in the session's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {command} while {state}")]
    InvalidTransition {
        command: &'static str,
        state: PlaybackState,
    },
}

/// Failure of the persistence collaborator backing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("catalog io error: {0}")]
    Io(#[from] io::Error),
    #[error("catalog file is malformed: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("catalog could not be encoded: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("track {0} not found")]
    NotFound(TrackId),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors raised by the audio engine itself, outside any load episode.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no audio output device: {0}")]
    OutputDevice(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode: {0}")]
    Decode(String),
    #[error("engine thread is gone")]
    Disconnected,
}

/// Malformed byte-count report. Progress is advisory, so this is clamped
/// and logged rather than returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EstimatorError {
    #[error("read {read} bytes of a {total} byte source")]
    BytesExceedTotal { read: u64, total: u64 },
}

/// Everything a caller of the coordinator can get back.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    InvalidTransition(#[from] SessionError),
    #[error("track {0} not found")]
    NotFound(TrackId),
    #[error(transparent)]
    Persistence(PersistenceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("playback coordinator has shut down")]
    Disconnected,
}

impl From<CatalogError> for PlayerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(id) => Self::NotFound(id),
            CatalogError::Persistence(p) => Self::Persistence(p),
        }
    }
}
