use crate::config::Settings;

/// Settings for this run. A missing, unreadable or invalid config never
/// stops the player; it falls back to defaults with a warning.
pub fn load_settings() -> Settings {
    let loaded = Settings::load()
        .map_err(|e| format!("failed to load config: {e}"))
        .and_then(|s| {
            s.validate()
                .map(|()| s)
                .map_err(|msg| format!("invalid config: {msg}"))
        });

    match loaded {
        Ok(settings) => {
            log::debug!(
                "config: tick {}ms, catalog {}",
                settings.progress.tick_ms,
                if settings.catalog.ephemeral {
                    "in memory".to_string()
                } else {
                    settings
                        .catalog_path()
                        .map_or_else(|| "in memory".to_string(), |p| p.display().to_string())
                }
            );
            settings
        }
        Err(msg) => {
            log::warn!("{msg}, using defaults");
            Settings::default()
        }
    }
}
