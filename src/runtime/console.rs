use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::thread;

use crate::catalog::{Locator, TrackId, display_name};
use crate::session::Snapshot;

use super::coordinator::{Command, Coordinator, Outcome};

const HELP: &str = "\
commands:
  add <path> [-- name]   add a track (name defaults to its tags or file name)
  rm <id>                remove a track
  ls                     list the catalog
  load <id>              select a track and start loading it
  play | pause | stop    transport
  vol <0.0-1.0>          set the volume
  cancel                 cancel the load in progress
  unload                 drop the selection
  status                 print the latest snapshot
  quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Submit(Command),
    List,
    Status,
    Help,
    Quit,
    Nothing,
}

pub fn parse_line(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let action = match word {
        "" => Action::Nothing,
        "add" => {
            if rest.is_empty() {
                return Err("usage: add <path> [-- name]".into());
            }
            let (path, name) = match rest.split_once(" -- ") {
                Some((p, n)) => (p.trim(), Some(n.trim().to_string())),
                None => (rest, None),
            };
            let name = name.unwrap_or_else(|| display_name(Path::new(path)));
            Action::Submit(Command::AddTrack {
                name,
                source: Locator::new(path),
            })
        }
        "rm" => Action::Submit(Command::RemoveTrack(required_id(rest, "rm")?)),
        "load" => Action::Submit(Command::Load(required_id(rest, "load")?)),
        "play" => Action::Submit(Command::Play),
        "pause" => Action::Submit(Command::Pause),
        "stop" => Action::Submit(Command::Stop),
        "cancel" => Action::Submit(Command::CancelLoad),
        "unload" => Action::Submit(Command::Unload),
        "vol" => {
            let v = rest
                .parse::<f32>()
                .map_err(|_| format!("not a volume: {rest:?}"))?;
            Action::Submit(Command::SetVolume(v))
        }
        "ls" => Action::List,
        "status" => Action::Status,
        "help" | "?" => Action::Help,
        "quit" | "q" | "exit" => Action::Quit,
        other => return Err(format!("unknown command {other:?}, try help")),
    };
    Ok(action)
}

fn required_id(rest: &str, command: &str) -> Result<TrackId, String> {
    if rest.is_empty() {
        Err(format!("usage: {command} <id>"))
    } else {
        Ok(TrackId::new(rest))
    }
}

pub fn format_snapshot(s: &Snapshot) -> String {
    let track = s
        .track_id
        .as_ref()
        .map_or_else(|| "-".to_string(), TrackId::to_string);
    let mut line = format!(
        "[{}] {} track={} progress={}%{} volume={:.2}",
        s.revision,
        s.state,
        track,
        s.progress.percent,
        if s.progress.done { " (done)" } else { "" },
        s.volume.get(),
    );
    if let Some(ref e) = s.error {
        line.push_str(&format!(" error={e}"));
    }
    line
}

/// Apply one action. Returns false when the console should exit.
pub fn handle(coordinator: &Coordinator, action: Action, out: &mut impl Write) -> io::Result<bool> {
    match action {
        Action::Nothing => {}
        Action::Quit => return Ok(false),
        Action::Help => writeln!(out, "{HELP}")?,
        Action::Status => writeln!(out, "{}", format_snapshot(&coordinator.snapshot()))?,
        Action::List => {
            let tracks = coordinator.tracks();
            if tracks.is_empty() {
                writeln!(out, "catalog is empty")?;
            }
            for t in tracks {
                writeln!(out, "{}  {}  ({})", t.id, t.name, t.source)?;
            }
        }
        Action::Submit(command) => match coordinator.submit(command) {
            Ok(Outcome::Added(t)) => writeln!(out, "added {} {}", t.id, t.name)?,
            Ok(Outcome::Removed(t)) => writeln!(out, "removed {} {}", t.id, t.name)?,
            // The subscription printer shows session changes.
            Ok(Outcome::Session(_)) => {}
            Err(e) => writeln!(out, "error: {e}")?,
        },
    }
    Ok(true)
}

/// Print every published snapshot until the coordinator goes away.
pub fn spawn_printer(snapshots: Receiver<Snapshot>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("player95-printer".into())
        .spawn(move || {
            for s in snapshots {
                println!("{}", format_snapshot(&s));
            }
        })
}

/// Read commands from stdin until `quit` or end of input.
pub fn run(coordinator: &Coordinator) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "player95: type help for commands")?;

    for line in stdin.lock().lines() {
        let line = line?;
        let keep_going = match parse_line(&line) {
            Ok(action) => handle(coordinator, action, &mut stdout)?,
            Err(msg) => {
                writeln!(stdout, "{msg}")?;
                true
            }
        };
        stdout.flush()?;
        if !keep_going {
            break;
        }
    }
    Ok(())
}
