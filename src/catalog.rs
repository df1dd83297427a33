//! Track catalog: the durable list of tracks the player knows about.
//!
//! `CatalogStore` owns the entries and writes every mutation through a
//! `CatalogPersistence` collaborator before committing it in memory.

mod model;
mod name;
mod persist;
mod store;

pub use model::{Locator, Track, TrackId};
pub use name::display_name;
pub use persist::{CatalogPersistence, MemoryCatalog, TomlCatalogFile};
pub use store::CatalogStore;
