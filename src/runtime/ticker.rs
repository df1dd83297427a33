use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::session::Generation;

use super::coordinator::Inbox;

const NOT_TICKING: u64 = 0;

/// Periodic timer behind simulated load progress.
///
/// Ticks are tagged with the generation being followed at send time and go
/// through the same inbox as everything else; the session drops stale ones.
pub(super) struct Ticker {
    target: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
}

impl Ticker {
    pub(super) fn spawn(tx: Sender<Inbox>, interval: Duration) -> std::io::Result<Self> {
        let target = Arc::new(AtomicU64::new(NOT_TICKING));
        let stop = Arc::new(AtomicBool::new(false));

        let (t, s) = (target.clone(), stop.clone());
        thread::Builder::new()
            .name("player95-ticker".into())
            .spawn(move || {
                loop {
                    thread::sleep(interval);
                    if s.load(Ordering::SeqCst) {
                        break;
                    }
                    let g = t.load(Ordering::SeqCst);
                    if g != NOT_TICKING && tx.send(Inbox::Tick(Generation::new(g))).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { target, stop })
    }

    /// Tick for `generation`, or go quiet on `None`.
    pub(super) fn follow(&self, generation: Option<Generation>) {
        let g = generation.map_or(NOT_TICKING, Generation::get);
        self.target.store(g, Ordering::SeqCst);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
