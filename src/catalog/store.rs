use crate::error::{CatalogError, PersistenceError};

use super::model::{Locator, Track, TrackId};
use super::persist::{CatalogPersistence, MemoryCatalog};

/// In-memory view of the catalog, kept in step with its persistence
/// collaborator. Mutations write through first and only then touch memory.
pub struct CatalogStore {
    persistence: Box<dyn CatalogPersistence>,
    tracks: Vec<Track>,
    next_seq: u64,
}

impl CatalogStore {
    /// Hydrate the store from `persistence`.
    pub fn open(persistence: Box<dyn CatalogPersistence>) -> Result<Self, PersistenceError> {
        let mut tracks: Vec<Track> = Vec::new();
        for t in persistence.load_all()? {
            if tracks.iter().any(|k| k.id == t.id) {
                log::warn!("catalog: duplicate id {} in stored catalog, keeping the first", t.id);
                continue;
            }
            tracks.push(t);
        }

        let next_seq = tracks
            .iter()
            .filter_map(|t| t.id.sequence())
            .max()
            .map_or(1, |n| n.saturating_add(1));

        log::info!("catalog: hydrated {} track(s)", tracks.len());
        Ok(Self {
            persistence,
            tracks,
            next_seq,
        })
    }

    /// Empty store backed by a `MemoryCatalog`.
    pub fn in_memory() -> Self {
        Self {
            persistence: Box::new(MemoryCatalog::new()),
            tracks: Vec::new(),
            next_seq: 1,
        }
    }

    /// Snapshot of every track in insertion order.
    pub fn list(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Register a new track under a fresh id.
    ///
    /// A blank `name` is replaced by the locator text. The id counter only
    /// advances once the write succeeded.
    pub fn add(&mut self, name: &str, source: Locator) -> Result<Track, CatalogError> {
        let name = match name.trim() {
            "" => source.as_str().to_string(),
            n => n.to_string(),
        };
        let track = Track {
            id: TrackId::from_sequence(self.next_seq),
            name,
            source,
        };
        if self.get(&track.id).is_some() {
            return Err(PersistenceError::Unavailable("track ids exhausted".into()).into());
        }

        if let Err(e) = self.persistence.persist_add(&track) {
            log::warn!("catalog: failed to persist {}: {e}", track.id);
            return Err(e.into());
        }

        self.next_seq = self.next_seq.saturating_add(1);
        self.tracks.push(track.clone());
        Ok(track)
    }

    /// Remove `id` from persistence, then from memory.
    pub fn remove(&mut self, id: &TrackId) -> Result<Track, CatalogError> {
        let Some(pos) = self.tracks.iter().position(|t| &t.id == id) else {
            return Err(CatalogError::NotFound(id.clone()));
        };

        if let Err(e) = self.persistence.persist_remove(id) {
            log::warn!("catalog: failed to remove {id}: {e}");
            return Err(e.into());
        }

        Ok(self.tracks.remove(pos))
    }
}
