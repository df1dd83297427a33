//! Utilities for building `rodio` sinks from loaded bytes.

use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink};

use crate::error::EngineError;
use crate::session::Volume;

/// Decode `bytes` into a paused `Sink` positioned at the start.
pub(super) fn create_sink(
    stream: &OutputStream,
    bytes: &Arc<[u8]>,
    volume: Volume,
) -> Result<Sink, EngineError> {
    let source = Decoder::new(Cursor::new(Arc::clone(bytes)))
        .map_err(|e| EngineError::Decode(e.to_string()))?;

    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume.get());
    sink.append(source);
    sink.pause();
    Ok(sink)
}

/// Ramp the sink down to silence over `fade_out_ms`.
pub(super) fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let start = sink.volume();
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
