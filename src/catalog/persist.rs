//! Persistence collaborators for the catalog.
//!
//! The store only talks to the `CatalogPersistence` trait; the binary picks
//! the TOML file backend or the in-memory one from settings.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

use super::model::{Track, TrackId};

pub trait CatalogPersistence: Send {
    /// Every stored track in insertion order. Called once at startup.
    fn load_all(&self) -> Result<Vec<Track>, PersistenceError>;
    fn persist_add(&mut self, track: &Track) -> Result<(), PersistenceError>;
    fn persist_remove(&mut self, id: &TrackId) -> Result<(), PersistenceError>;
}

/// Catalog that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tracks: Vec<Track>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }
}

impl CatalogPersistence for MemoryCatalog {
    fn load_all(&self) -> Result<Vec<Track>, PersistenceError> {
        Ok(self.tracks.clone())
    }

    fn persist_add(&mut self, track: &Track) -> Result<(), PersistenceError> {
        self.tracks.push(track.clone());
        Ok(())
    }

    fn persist_remove(&mut self, id: &TrackId) -> Result<(), PersistenceError> {
        self.tracks.retain(|t| &t.id != id);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Catalog stored as `[[tracks]]` entries in a TOML file.
///
/// Every mutation rewrites a temporary sibling and renames it over the
/// original, so a crash mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct TomlCatalogFile {
    path: PathBuf,
    tracks: Vec<Track>,
}

impl TomlCatalogFile {
    /// Open `path`, treating a missing file as an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let tracks = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            toml::from_str::<CatalogDocument>(&raw)?.tracks
        } else {
            Vec::new()
        };
        Ok(Self { path, tracks })
    }

    fn write(&self, tracks: &[Track]) -> Result<(), PersistenceError> {
        let doc = CatalogDocument {
            tracks: tracks.to_vec(),
        };
        let body = toml::to_string(&doc)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp = self.path.with_extension("toml.tmp");
        {
            let mut f = File::create(&tmp)?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CatalogPersistence for TomlCatalogFile {
    fn load_all(&self) -> Result<Vec<Track>, PersistenceError> {
        Ok(self.tracks.clone())
    }

    fn persist_add(&mut self, track: &Track) -> Result<(), PersistenceError> {
        let mut next = self.tracks.clone();
        next.push(track.clone());
        self.write(&next)?;
        self.tracks = next;
        Ok(())
    }

    fn persist_remove(&mut self, id: &TrackId) -> Result<(), PersistenceError> {
        let next: Vec<Track> = self.tracks.iter().filter(|t| &t.id != id).cloned().collect();
        self.write(&next)?;
        self.tracks = next;
        Ok(())
    }
}
