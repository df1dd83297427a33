use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::error::EngineError;
use crate::session::{Generation, Volume};

use super::sink::{create_sink, fade_out_sink};
use super::types::{EngineEvent, EventSender};

#[derive(Debug)]
pub(super) enum EngineCmd {
    /// Bytes for `generation` finished reading; decode and hold them paused.
    Install {
        generation: Generation,
        bytes: Arc<[u8]>,
    },
    Play,
    Pause,
    /// Halt and rewind to the start.
    Stop,
    SetVolume(Volume),
    Unload,
    /// Quit the engine thread, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

struct Loaded {
    generation: Generation,
    bytes: Arc<[u8]>,
    sink: Sink,
}

/// Spawn the thread that owns the output stream.
///
/// Blocks until the output device is open so a missing device surfaces here
/// instead of as a later event.
pub(super) fn spawn_engine_thread(
    rx: Receiver<EngineCmd>,
    events: EventSender,
    active: Arc<AtomicU64>,
    poll: Duration,
) -> Result<JoinHandle<()>, EngineError> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), EngineError>>(1);

    let handle = thread::Builder::new()
        .name("player95-engine".into())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(EngineError::OutputDevice(e.to_string())));
                    return;
                }
            };
            // rodio logs to stderr when OutputStream is dropped; we log ourselves.
            stream.log_on_drop(false);
            let _ = ready_tx.send(Ok(()));

            log::info!("engine: output stream open");
            run(&stream, rx, &events, &active, poll);
            log::info!("engine: thread exiting");
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => Err(EngineError::Disconnected),
    }
}

fn run(
    stream: &OutputStream,
    rx: Receiver<EngineCmd>,
    events: &EventSender,
    active: &AtomicU64,
    poll: Duration,
) {
    let mut loaded: Option<Loaded> = None;
    let mut playing = false;
    let mut volume = Volume::default();

    loop {
        match rx.recv_timeout(poll) {
            Ok(cmd) => match cmd {
                EngineCmd::Install { generation, bytes } => {
                    if active.load(Ordering::SeqCst) != generation.get() {
                        log::debug!("engine: dropping bytes for superseded load {generation}");
                        continue;
                    }
                    if let Some(old) = loaded.take() {
                        old.sink.stop();
                    }
                    playing = false;

                    match create_sink(stream, &bytes, volume) {
                        Ok(sink) => {
                            loaded = Some(Loaded {
                                generation,
                                bytes,
                                sink,
                            });
                            events.emit(EngineEvent::Loaded {
                                generation: Some(generation),
                            });
                        }
                        Err(e) => {
                            events.emit(EngineEvent::Error {
                                generation: Some(generation),
                                reason: e.to_string(),
                            });
                        }
                    }
                }

                EngineCmd::Play => {
                    if let Some(ref l) = loaded {
                        l.sink.play();
                        playing = true;
                    }
                }

                EngineCmd::Pause => {
                    if let Some(ref l) = loaded {
                        l.sink.pause();
                        playing = false;
                    }
                }

                EngineCmd::Stop => {
                    // Rewind by decoding the retained bytes again.
                    playing = false;
                    let Some(l) = loaded.as_mut() else {
                        continue;
                    };
                    l.sink.stop();
                    match create_sink(stream, &l.bytes, volume) {
                        Ok(sink) => l.sink = sink,
                        Err(e) => {
                            let generation = l.generation;
                            loaded = None;
                            events.emit(EngineEvent::Error {
                                generation: Some(generation),
                                reason: e.to_string(),
                            });
                        }
                    }
                }

                EngineCmd::SetVolume(v) => {
                    volume = v;
                    if let Some(ref l) = loaded {
                        l.sink.set_volume(v.get());
                    }
                }

                EngineCmd::Unload => {
                    if let Some(l) = loaded.take() {
                        l.sink.stop();
                    }
                    playing = false;
                }

                EngineCmd::Quit { fade_out_ms } => {
                    if let Some(ref l) = loaded {
                        if playing {
                            fade_out_sink(&l.sink, fade_out_ms);
                        }
                        l.sink.stop();
                    }
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                // periodic check for end of track
                if let Some(l) = loaded.as_mut() {
                    if playing && l.sink.empty() {
                        playing = false;
                        events.emit(EngineEvent::Ended {
                            generation: Some(l.generation),
                        });
                        // A later play starts over from the top.
                        match create_sink(stream, &l.bytes, volume) {
                            Ok(sink) => l.sink = sink,
                            Err(e) => log::warn!("engine: could not rewind finished track: {e}"),
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
