use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::WorkArea;
use crate::theme::ThemeMode;

pub(crate) const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Which chat transport the renderer's backend client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Reply locally with the submitted text; no HTTP round trip.
    #[default]
    Echo,
    /// POST `{text}` to `/chat` and read `{response}`.
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Upper bound on every backend call. Must be finite.
    pub timeout_secs: u64,
    /// Command line used to start the backend when it is not already running.
    pub command: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub chat: ChatMode,
    pub health_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
            command: None,
            working_dir: None,
            chat: ChatMode::Echo,
            health_interval_secs: 10,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub margin_x: u32,
    pub margin_y: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 450,
            height: 750,
            margin_x: 20,
            margin_y: 20,
        }
    }
}

/// Top-level configuration, read from `config.json`.
///
/// Every field has a default so a partial (or missing) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub backend: BackendConfig,
    pub window: WindowConfig,
    /// Explicit work area; skips compositor probing when set.
    pub work_area: Option<WorkArea>,
    /// Output name to open the surface on.
    pub screen: Option<String>,
    pub reaction_secs: u64,
    pub idle_poll_secs: u64,
    pub idle_away_secs: u64,
    pub theme: ThemeMode,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            window: WindowConfig::default(),
            work_area: None,
            screen: None,
            reaction_secs: 6,
            idle_poll_secs: 30,
            idle_away_secs: 300,
            theme: ThemeMode::Dark,
        }
    }
}

impl CompanionConfig {
    pub fn reaction_duration(&self) -> Duration {
        Duration::from_secs(self.reaction_secs.max(1))
    }
}

/// Return the config file path: `$RIN_HUD_CONFIG`, else
/// `~/.config/rin-hud/config.json`.
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os("RIN_HUD_CONFIG").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("rin-hud/config.json")
}

/// Parse a config file. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<CompanionConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CompanionConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `RIN_HUD_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(
    config: &mut CompanionConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(url) = lookup("RIN_HUD_BACKEND_URL").filter(|s| !s.is_empty()) {
        config.backend.base_url = url;
    }
    if let Some(screen) = lookup("RIN_HUD_SCREEN").filter(|s| !s.is_empty()) {
        config.screen = Some(screen);
    }
}

/// Load the effective config. Unreadable or invalid files fall back to the
/// defaults so the overlay still comes up.
pub fn load() -> CompanionConfig {
    let path = config_file_path();
    let mut config = match load_from(&path) {
        Ok(c) => {
            tracing::info!(path = %path.display(), "config loaded");
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "using default config");
            CompanionConfig::default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}
