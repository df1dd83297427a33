use crate::config::ProgressSettings;
use crate::error::EstimatorError;
use crate::session::Generation;

/// Load progress of one episode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub percent: u8,
    pub done: bool,
}

impl Progress {
    pub const COMPLETE: Progress = Progress {
        percent: 100,
        done: true,
    };
}

/// Ties progress reports to the episode that produced them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EstimatorHandle {
    generation: Generation,
}

impl EstimatorHandle {
    pub fn generation(self) -> Generation {
        self.generation
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Strategy {
    /// Real byte counts against a known size.
    Counted { total: u64 },
    /// Timer-driven fill while the size is unknown.
    Simulated,
}

#[derive(Debug)]
struct Episode {
    handle: EstimatorHandle,
    strategy: Strategy,
    progress: Progress,
}

/// Produces a non-decreasing 0..=100 sequence for the current load episode.
///
/// Only one episode is live at a time; `begin` replaces the previous one and
/// any report carrying an older handle is dropped.
#[derive(Debug)]
pub struct ProgressEstimator {
    step: u8,
    ceiling: u8,
    episode: Option<Episode>,
}

impl ProgressEstimator {
    pub fn new(settings: &ProgressSettings) -> Self {
        Self {
            step: settings.simulated_step.max(1),
            ceiling: settings.simulated_ceiling.min(100),
            episode: None,
        }
    }

    /// Start a new episode, implicitly cancelling the previous one.
    pub fn begin(&mut self, generation: Generation, total_bytes: Option<u64>) -> EstimatorHandle {
        let handle = EstimatorHandle { generation };
        let strategy = match total_bytes {
            Some(total) => Strategy::Counted { total },
            None => Strategy::Simulated,
        };
        self.episode = Some(Episode {
            handle,
            strategy,
            progress: Progress::default(),
        });
        handle
    }

    /// Stop the episode behind `handle`. Idempotent; other handles are ignored.
    pub fn cancel(&mut self, handle: EstimatorHandle) {
        if self.episode.as_ref().is_some_and(|e| e.handle == handle) {
            self.episode = None;
        }
    }

    /// Progress of the current episode, or zero when there is none.
    pub fn progress(&self) -> Progress {
        self.episode.as_ref().map(|e| e.progress).unwrap_or_default()
    }

    /// Generation of the episode still waiting on timer ticks, if any.
    pub fn simulating(&self) -> Option<Generation> {
        self.episode
            .as_ref()
            .filter(|e| e.strategy == Strategy::Simulated && !e.progress.done)
            .map(|e| e.handle.generation)
    }

    /// Feed a byte count reported by the loader.
    ///
    /// Returns the new progress when it moved. Counts past the total are
    /// clamped to 100.
    pub fn record_bytes(&mut self, handle: EstimatorHandle, bytes_read: u64) -> Option<Progress> {
        let episode = self.live(handle)?;
        let Strategy::Counted { total } = episode.strategy else {
            return None;
        };

        let percent = if total == 0 {
            100
        } else {
            if bytes_read > total {
                let e = EstimatorError::BytesExceedTotal {
                    read: bytes_read,
                    total,
                };
                log::warn!("progress: {e}; clamping to 100%");
            }
            let read = bytes_read.min(total) as u128;
            (read * 100 / total as u128) as u8
        };

        let next = Progress {
            percent: percent.max(episode.progress.percent),
            done: percent >= 100,
        };
        advance(episode, next)
    }

    /// Advance a simulated episode by one step, up to the ceiling.
    pub fn tick(&mut self, handle: EstimatorHandle) -> Option<Progress> {
        let (step, ceiling) = (self.step, self.ceiling);
        let episode = self.live(handle)?;
        if episode.strategy != Strategy::Simulated {
            return None;
        }

        let percent = episode.progress.percent.saturating_add(step).min(ceiling);
        let next = Progress {
            percent: percent.max(episode.progress.percent),
            done: false,
        };
        advance(episode, next)
    }

    /// The load really finished: jump to 100% and report done, once.
    pub fn complete(&mut self, handle: EstimatorHandle) -> Option<Progress> {
        let episode = self.live(handle)?;
        advance(episode, Progress::COMPLETE)
    }

    /// The current episode if it matches `handle` and has not finished.
    fn live(&mut self, handle: EstimatorHandle) -> Option<&mut Episode> {
        self.episode
            .as_mut()
            .filter(|e| e.handle == handle && !e.progress.done)
    }
}

fn advance(episode: &mut Episode, next: Progress) -> Option<Progress> {
    if next == episode.progress {
        return None;
    }
    episode.progress = next;
    Some(next)
}
