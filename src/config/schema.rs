use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/player95/config.toml` or `~/.config/player95/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PLAYER95__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub progress: ProgressSettings,
    pub playback: PlaybackSettings,
    pub engine: EngineSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
    /// Interval between simulated progress ticks (milliseconds).
    pub tick_ms: u64,
    /// Percent added per simulated tick.
    pub simulated_step: u8,
    /// Highest percent simulated ticks may reach before the load completes.
    pub simulated_ceiling: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            simulated_step: 1,
            simulated_ceiling: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Volume the session starts with, in `[0.0, 1.0]`.
    pub initial_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Chunk size used when reading a source; one progress report per chunk.
    pub read_chunk_bytes: usize,
    /// How often the engine thread checks for end-of-track (milliseconds).
    pub poll_ms: u64,
    /// Fade-out duration when shutting down (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            read_chunk_bytes: 64 * 1024,
            poll_ms: 200,
            quit_fade_out_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Where the catalog is stored. Defaults to the XDG data directory.
    pub path: Option<PathBuf>,
    /// Keep the catalog in memory only.
    pub ephemeral: bool,
}
