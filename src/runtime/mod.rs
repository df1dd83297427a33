use std::env;
use std::path::Path;

use crate::catalog::{
    CatalogPersistence, CatalogStore, Locator, MemoryCatalog, TomlCatalogFile, display_name,
};
use crate::config::Settings;
use crate::engine::RodioEngine;
use crate::error::PersistenceError;

mod console;
mod coordinator;
mod settings;
mod ticker;

pub use coordinator::{Command, Coordinator, Outcome};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    let catalog = open_catalog(&settings);
    let engine_settings = settings.engine.clone();
    let coordinator = Coordinator::spawn(&settings, catalog, move |events| {
        RodioEngine::spawn(events, &engine_settings)
    })?;

    let printer = console::spawn_printer(coordinator.subscribe()?)?;

    // Files on the command line are added and the first one is loaded.
    let mut first = None;
    for arg in env::args().skip(1) {
        let command = Command::AddTrack {
            name: display_name(Path::new(&arg)),
            source: Locator::new(arg),
        };
        match coordinator.submit(command) {
            Ok(Outcome::Added(t)) => {
                first.get_or_insert(t.id);
            }
            Ok(_) => {}
            Err(e) => log::warn!("could not add track: {e}"),
        }
    }
    if let Some(id) = first {
        if let Err(e) = coordinator.submit(Command::Load(id)) {
            log::warn!("could not load track: {e}");
        }
    }

    let result = console::run(&coordinator);

    coordinator.shutdown();
    drop(coordinator);
    let _ = printer.join();

    result.map_err(Into::into)
}

/// Open the configured catalog. A catalog that cannot be read is left
/// untouched on disk and the session runs on an in-memory one instead.
fn open_catalog(settings: &Settings) -> CatalogStore {
    match open_persistence(settings).and_then(CatalogStore::open) {
        Ok(store) => store,
        Err(e) => {
            let path = settings
                .catalog_path()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string());
            log::warn!("catalog: cannot open {path}: {e}; keeping the catalog in memory");
            CatalogStore::in_memory()
        }
    }
}

fn open_persistence(settings: &Settings) -> Result<Box<dyn CatalogPersistence>, PersistenceError> {
    if settings.catalog.ephemeral {
        return Ok(Box::new(MemoryCatalog::new()));
    }
    match settings.catalog_path() {
        Some(path) => Ok(Box::new(TomlCatalogFile::open(path)?)),
        None => {
            log::warn!("no catalog path could be resolved, keeping the catalog in memory");
            Ok(Box::new(MemoryCatalog::new()))
        }
    }
}

#[cfg(test)]
mod tests;
