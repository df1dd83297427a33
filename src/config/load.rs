use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `PLAYER95__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("PLAYER95")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress.tick_ms == 0 {
            return Err("progress.tick_ms must be >= 1".to_string());
        }
        if self.progress.simulated_step == 0 {
            return Err("progress.simulated_step must be >= 1".to_string());
        }
        if self.progress.simulated_ceiling > 100 {
            return Err("progress.simulated_ceiling must be <= 100".to_string());
        }
        if self.engine.read_chunk_bytes == 0 {
            return Err("engine.read_chunk_bytes must be >= 1".to_string());
        }
        Ok(())
    }

    /// The catalog file to use, honoring an explicit `catalog.path`.
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.path.clone().or_else(default_catalog_path)
    }
}

/// Resolve the config path from `PLAYER95_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os("PLAYER95_CONFIG_PATH")
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/player95/config.toml`, or `~/.config/player95/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_home("XDG_CONFIG_HOME", &[".config"]).map(|d| d.join("player95").join("config.toml"))
}

/// `$XDG_DATA_HOME/player95/catalog.toml`, or `~/.local/share/player95/catalog.toml`.
pub fn default_catalog_path() -> Option<PathBuf> {
    xdg_home("XDG_DATA_HOME", &[".local", "share"])
        .map(|d| d.join("player95").join("catalog.toml"))
}

/// The XDG base directory named by `var`, else `$HOME` joined with `fallback`.
fn xdg_home(var: &str, fallback: &[&str]) -> Option<PathBuf> {
    match env::var_os(var).filter(|v| !v.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => env::var_os("HOME")
            .map(|home| fallback.iter().fold(PathBuf::from(home), |p, c| p.join(c))),
    }
}
