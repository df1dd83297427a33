//! Value types the session publishes: playback state, volume, load
//! generations and the snapshot handed to subscribers.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::catalog::TrackId;
use crate::progress::Progress;

/// Identifies one load episode. Strictly increasing within a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub(crate) const fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing selected.
    #[default]
    Idle,
    /// A track is being fetched and decoded.
    Loading,
    /// Loaded and positioned at the start, never played.
    Ready,
    Playing,
    Paused,
    /// Halted and rewound to the start.
    Stopped,
    /// The engine reported an error; `load` retries.
    Failed,
}

impl PlaybackState {
    /// Whether the engine holds a decoded track for this state.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Paused | Self::Stopped)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Output gain in `[0.0, 1.0]`. Every constructor clamps.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const MAX: Volume = Volume(1.0);

    /// Clamp `raw` into range. NaN becomes silence.
    pub fn new(raw: f32) -> Self {
        if raw.is_nan() {
            Self(0.0)
        } else {
            Self(raw.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::MAX
    }
}

/// Immutable view of the session emitted after every accepted change.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Strictly increasing per session; gives subscribers a total order.
    pub revision: u64,
    pub state: PlaybackState,
    pub track_id: Option<TrackId>,
    pub progress: Progress,
    pub volume: Volume,
    /// Reason reported by the engine while `Failed`.
    pub error: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            revision: 0,
            state: PlaybackState::Idle,
            track_id: None,
            progress: Progress::default(),
            volume: Volume::default(),
            error: None,
        }
    }
}

/// Latest snapshot, shared with readers that poll instead of subscribing.
pub type SnapshotHandle = Arc<Mutex<Snapshot>>;
