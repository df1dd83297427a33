use super::console::{Action, format_snapshot, handle, parse_line};
use super::*;
use crate::catalog::TrackId;
use crate::engine::{AudioEngine, EngineEvent, EventSender};
use crate::error::{PlayerError, SessionError};
use crate::progress::Progress;
use crate::session::{Generation, PlaybackState, Snapshot, Volume};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

/// Engine that answers through the real event queue.
///
/// Locators containing `slow` have no known size and never finish on their
/// own; `broken` fails; everything else reads 1000 bytes and loads.
struct ScriptedEngine {
    events: EventSender,
    calls: Arc<Mutex<Vec<String>>>,
}

impl AudioEngine for ScriptedEngine {
    fn content_length(&self, locator: &Locator) -> Option<u64> {
        if locator.as_str().contains("slow") {
            None
        } else {
            Some(1000)
        }
    }

    fn load(&mut self, generation: Generation, locator: &Locator) {
        self.record(format!("load {locator}"));
        let src = locator.as_str();
        if src.contains("slow") {
            return;
        }
        if src.contains("broken") {
            self.events.emit(EngineEvent::Error {
                generation: Some(generation),
                reason: "unsupported format".into(),
            });
            return;
        }
        for bytes_read in [400, 1000] {
            self.events.emit(EngineEvent::BytesRead {
                generation,
                bytes_read,
            });
        }
        self.events.emit(EngineEvent::Loaded {
            generation: Some(generation),
        });
    }

    fn abort_load(&mut self, generation: Generation) {
        self.record(format!("abort {}", generation.get()));
    }

    fn play(&mut self) {
        self.record("play".into());
    }

    fn pause(&mut self) {
        self.record("pause".into());
    }

    fn stop(&mut self) {
        self.record("stop".into());
    }

    fn set_volume(&mut self, volume: Volume) {
        self.record(format!("volume {:.2}", volume.get()));
    }

    fn unload(&mut self) {
        self.record("unload".into());
    }
}

impl ScriptedEngine {
    fn record(&self, call: String) {
        if let Ok(mut c) = self.calls.lock() {
            c.push(call);
        }
    }
}

struct Harness {
    coordinator: Coordinator,
    snapshots: Receiver<Snapshot>,
    calls: Arc<Mutex<Vec<String>>>,
    /// The engine's own sender, for injecting events by hand.
    events: EventSender,
}

fn harness() -> Harness {
    let mut settings = Settings::default();
    settings.progress.tick_ms = 5;

    let calls = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<Mutex<Option<EventSender>>> = Arc::new(Mutex::new(None));

    let (c, s) = (calls.clone(), slot.clone());
    let catalog = CatalogStore::open(Box::new(MemoryCatalog::new())).unwrap();
    let coordinator = Coordinator::spawn(&settings, catalog, move |events| {
        *s.lock().unwrap() = Some(events.clone());
        Ok(ScriptedEngine { events, calls: c })
    })
    .unwrap();

    let snapshots = coordinator.subscribe().unwrap();
    let events = slot.lock().unwrap().take().unwrap();
    Harness {
        coordinator,
        snapshots,
        calls,
        events,
    }
}

impl Harness {
    fn add(&self, name: &str, source: &str) -> TrackId {
        match self
            .coordinator
            .submit(Command::AddTrack {
                name: name.into(),
                source: Locator::new(source),
            })
            .unwrap()
        {
            Outcome::Added(t) => t.id,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn wait_for(&self, what: impl Fn(&Snapshot) -> bool) -> Snapshot {
        let deadline = Instant::now() + WAIT;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.snapshots.recv_timeout(left) {
                Ok(s) if what(&s) => return s,
                Ok(_) => continue,
                Err(e) => panic!("no matching snapshot: {e}"),
            }
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[test]
fn load_of_unknown_id_is_not_found() {
    let h = harness();
    let err = h
        .coordinator
        .submit(Command::Load(TrackId::new("trk-42")))
        .unwrap_err();
    assert!(matches!(err, PlayerError::NotFound(id) if id.as_str() == "trk-42"));
    assert_eq!(h.coordinator.snapshot().state, PlaybackState::Idle);
}

#[test]
fn load_reaches_ready_through_byte_progress() {
    let h = harness();
    let id = h.add("Song", "/music/song.mp3");

    h.coordinator.submit(Command::Load(id.clone())).unwrap();
    let partial = h.wait_for(|s| s.progress.percent == 40);
    assert_eq!(partial.state, PlaybackState::Loading);

    let ready = h.wait_for(|s| s.state == PlaybackState::Ready);
    assert_eq!(ready.track_id, Some(id));
    assert_eq!(ready.progress, Progress::COMPLETE);
}

#[test]
fn transport_commands_follow_the_state_machine() {
    let h = harness();
    let id = h.add("Song", "/music/song.mp3");

    let err = h.coordinator.submit(Command::Play).unwrap_err();
    assert!(matches!(
        err,
        PlayerError::InvalidTransition(SessionError::InvalidTransition {
            state: PlaybackState::Idle,
            ..
        })
    ));

    h.coordinator.submit(Command::Load(id)).unwrap();
    h.wait_for(|s| s.state == PlaybackState::Ready);

    for (cmd, want) in [
        (Command::Play, PlaybackState::Playing),
        (Command::Pause, PlaybackState::Paused),
        (Command::Stop, PlaybackState::Stopped),
        (Command::Play, PlaybackState::Playing),
    ] {
        match h.coordinator.submit(cmd).unwrap() {
            Outcome::Session(s) => assert_eq!(s.state, want),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    let calls = h.calls();
    assert_eq!(
        calls.iter().filter(|c| c.as_str() == "play").count(),
        2,
        "{calls:?}"
    );
    assert!(calls.contains(&"stop".to_string()));
}

#[test]
fn removing_the_selected_track_returns_to_idle() {
    let h = harness();
    let keep = h.add("Keep", "/music/keep.mp3");
    let gone = h.add("Gone", "/music/gone.mp3");

    h.coordinator.submit(Command::Load(gone.clone())).unwrap();
    h.wait_for(|s| s.state == PlaybackState::Ready);

    match h.coordinator.submit(Command::RemoveTrack(gone)).unwrap() {
        Outcome::Removed(t) => assert_eq!(t.name, "Gone"),
        other => panic!("unexpected outcome {other:?}"),
    }
    let idle = h.wait_for(|s| s.state == PlaybackState::Idle);
    assert_eq!(idle.track_id, None);

    let ids: Vec<TrackId> = h.coordinator.tracks().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![keep]);
    assert_eq!(h.calls().last().map(String::as_str), Some("unload"));
}

#[test]
fn removing_an_unknown_track_is_not_found() {
    let h = harness();
    h.add("Only", "/music/only.mp3");
    let err = h
        .coordinator
        .submit(Command::RemoveTrack(TrackId::new("trk-9")))
        .unwrap_err();
    assert!(matches!(err, PlayerError::NotFound(_)));
    assert_eq!(h.coordinator.tracks().len(), 1);
}

#[test]
fn ticks_advance_progress_of_unsized_sources() {
    let h = harness();
    let id = h.add("Stream", "http://radio/slow");

    h.coordinator.submit(Command::Load(id)).unwrap();
    let moving = h.wait_for(|s| s.progress.percent >= 3);
    assert_eq!(moving.state, PlaybackState::Loading);
    assert!(!moving.progress.done);

    h.coordinator.submit(Command::CancelLoad).unwrap();
    let idle = h.wait_for(|s| s.state == PlaybackState::Idle);
    assert_eq!(idle.progress.percent, 0);
    assert!(h.calls().iter().any(|c| c.starts_with("abort")));

    // The ticker goes quiet once nothing is loading.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(h.coordinator.snapshot().revision, idle.revision);
}

#[test]
fn untagged_loaded_completes_a_simulated_load() {
    let h = harness();
    let id = h.add("Stream", "http://radio/slow");
    h.coordinator.submit(Command::Load(id)).unwrap();
    h.wait_for(|s| s.state == PlaybackState::Loading);

    h.events.emit(EngineEvent::Loaded { generation: None });
    let ready = h.wait_for(|s| s.state == PlaybackState::Ready);
    assert!(ready.progress.done);
}

#[test]
fn stale_engine_events_are_dropped() {
    let h = harness();
    let id = h.add("Stream", "http://radio/slow");
    h.coordinator.submit(Command::Load(id)).unwrap();
    let loading = h.wait_for(|s| s.state == PlaybackState::Loading);

    h.events.emit(EngineEvent::Error {
        generation: Some(Generation::new(99)),
        reason: "old episode".into(),
    });
    // A round trip through the queue guarantees the event was processed.
    h.coordinator.submit(Command::SetVolume(0.25)).unwrap();

    let now = h.coordinator.snapshot();
    assert_eq!(now.state, PlaybackState::Loading);
    assert_eq!(now.track_id, loading.track_id);
    assert_eq!(now.error, None);
}

#[test]
fn engine_failure_is_reported_and_retryable() {
    let h = harness();
    let id = h.add("Bad", "/music/broken.flac");

    h.coordinator.submit(Command::Load(id.clone())).unwrap();
    let failed = h.wait_for(|s| s.state == PlaybackState::Failed);
    assert_eq!(failed.error.as_deref(), Some("unsupported format"));

    assert!(h.coordinator.submit(Command::Play).is_err());
    h.coordinator.submit(Command::Load(id)).unwrap();
    h.wait_for(|s| s.state == PlaybackState::Loading);
}

#[test]
fn subscribers_see_strictly_increasing_revisions() {
    let h = harness();
    let id = h.add("Song", "/music/song.mp3");
    h.coordinator.submit(Command::Load(id)).unwrap();
    h.coordinator.submit(Command::SetVolume(0.1)).unwrap();
    h.coordinator.send(Command::SetVolume(0.2)).unwrap();
    h.coordinator.submit(Command::Unload).unwrap();

    let mut last = None;
    let deadline = Instant::now() + WAIT;
    loop {
        let s = h
            .snapshots
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
            .unwrap();
        if let Some(prev) = last {
            assert!(s.revision > prev, "{} after {prev}", s.revision);
        }
        last = Some(s.revision);
        if s.state == PlaybackState::Idle && s.revision > 1 {
            assert_eq!(s.volume, Volume::new(0.2));
            break;
        }
    }
}

#[test]
fn commands_after_shutdown_are_disconnected() {
    let h = harness();
    h.coordinator.shutdown();
    assert!(matches!(
        h.coordinator.submit(Command::Play),
        Err(PlayerError::Disconnected)
    ));
    assert!(h.coordinator.subscribe().is_err());
}

#[test]
fn parse_line_maps_words_to_commands() {
    assert_eq!(parse_line("  play ").unwrap(), Action::Submit(Command::Play));
    assert_eq!(
        parse_line("load trk-3").unwrap(),
        Action::Submit(Command::Load(TrackId::new("trk-3")))
    );
    assert_eq!(
        parse_line("vol 0.75").unwrap(),
        Action::Submit(Command::SetVolume(0.75))
    );
    assert_eq!(
        parse_line("add /tmp/a b.mp3 -- My Song").unwrap(),
        Action::Submit(Command::AddTrack {
            name: "My Song".into(),
            source: Locator::new("/tmp/a b.mp3"),
        })
    );
    assert_eq!(parse_line("").unwrap(), Action::Nothing);
    assert_eq!(parse_line("q").unwrap(), Action::Quit);
}

#[test]
fn parse_line_names_tracks_from_the_file_when_no_name_is_given() {
    let action = parse_line("add /nowhere/Blue Monday.ogg").unwrap();
    match action {
        Action::Submit(Command::AddTrack { name, .. }) => assert_eq!(name, "Blue Monday"),
        other => panic!("unexpected action {other:?}"),
    }
}

#[test]
fn parse_line_rejects_bad_input() {
    assert!(parse_line("load").is_err());
    assert!(parse_line("vol loud").is_err());
    assert!(parse_line("add").is_err());
    assert!(parse_line("dance").is_err());
}

#[test]
fn format_snapshot_shows_state_and_error() {
    let s = Snapshot {
        revision: 7,
        state: PlaybackState::Failed,
        track_id: Some(TrackId::new("trk-2")),
        progress: Progress {
            percent: 40,
            done: false,
        },
        volume: Volume::new(0.5),
        error: Some("boom".into()),
    };
    assert_eq!(
        format_snapshot(&s),
        "[7] failed track=trk-2 progress=40% volume=0.50 error=boom"
    );
}

#[test]
fn handle_prints_outcomes_and_errors() {
    let h = harness();
    let mut out = Vec::new();

    let add = parse_line("add /music/x.mp3 -- X").unwrap();
    assert!(handle(&h.coordinator, add, &mut out).unwrap());
    assert!(handle(&h.coordinator, Action::List, &mut out).unwrap());
    assert!(handle(&h.coordinator, Action::Submit(Command::Pause), &mut out).unwrap());
    assert!(!handle(&h.coordinator, Action::Quit, &mut out).unwrap());

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("added trk-1 X"), "{text}");
    assert!(text.contains("trk-1  X  (/music/x.mp3)"), "{text}");
    assert!(text.contains("error: cannot pause while idle"), "{text}");
}

fn settings_with_catalog_at(path: std::path::PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.catalog.path = Some(path);
    settings
}

#[test]
fn unreadable_catalog_file_falls_back_to_memory_and_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(&path, "not [valid toml").unwrap();

    let mut store = open_catalog(&settings_with_catalog_at(path.clone()));
    assert!(store.list().is_empty());

    store.add("Song", Locator::new("/music/song.mp3")).unwrap();
    assert_eq!(store.list().len(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "not [valid toml");
}

#[test]
fn readable_catalog_file_is_hydrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "[[tracks]]\nid = \"trk-4\"\nname = \"Four\"\nsource = \"/music/four.mp3\"\n",
    )
    .unwrap();

    let mut store = open_catalog(&settings_with_catalog_at(path.clone()));
    let names: Vec<String> = store.list().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Four".to_string()]);

    let t = store.add("Five", Locator::new("/music/five.mp3")).unwrap();
    assert_eq!(t.id, TrackId::new("trk-5"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("Five"));
}
