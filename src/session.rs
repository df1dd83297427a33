//! Playback session: the state machine between user commands, engine
//! events and progress, plus the value types it publishes.

mod machine;
mod types;

pub use machine::Session;
pub use types::{Generation, PlaybackState, Snapshot, SnapshotHandle, Volume};
