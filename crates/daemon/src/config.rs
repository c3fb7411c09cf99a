// Global configuration: `~/.githerd/config.toml`.
//
// Paths in the file use the portable `~/` form; repository entries may be
// shell globs, expanded at load time. An invalid pattern is a startup
// fault, not something to skip.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use githerd_common::paths;

/// Root directory for githerd state: `~/.githerd/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".githerd"))
}

/// Path to the config file: `~/.githerd/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Continuous sync engine settings.
    pub sync: SyncConfig,
    /// Fleet drift settings.
    pub fleet: FleetConfig,
}

impl Config {
    /// Load from `~/.githerd/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|path| Self::load_from(&path).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Absolute watched directory for the continuous sync engine.
    pub fn sync_dir(&self, home: &Path) -> PathBuf {
        paths::to_absolute(&self.sync.dir, home)
    }

    /// Absolute shared state directory for snapshot tables.
    pub fn state_dir(&self, home: &Path) -> PathBuf {
        paths::to_absolute(&self.fleet.state_dir, home)
    }

    /// Absolute SSH key path, if configured.
    pub fn ssh_key(&self, home: &Path) -> Option<PathBuf> {
        self.sync.ssh_key.as_deref().map(|key| paths::to_absolute(key, home))
    }

    /// Cooldown between sync cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_sec)
    }

    /// Expand repository path patterns into concrete directories.
    pub fn expand_repos(&self, home: &Path) -> Result<Vec<PathBuf>, ConfigError> {
        let mut repos = Vec::new();

        for pattern in &self.fleet.repos {
            let absolute = paths::to_absolute(pattern, home);
            let absolute = absolute.to_string_lossy();

            let matches = glob::glob(&absolute).map_err(|error| ConfigError::Pattern {
                pattern: pattern.clone(),
                message: error.to_string(),
            })?;

            for entry in matches {
                let path = entry.map_err(|error| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    message: error.to_string(),
                })?;
                repos.push(path);
            }
        }

        Ok(repos)
    }
}

/// Continuous sync engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory kept in sync, `~/` form allowed.
    pub dir: String,
    /// Seconds between sync cycles; 0 disables the cooldown.
    pub interval_sec: u64,
    /// SSH key injected into git's environment for authentication.
    pub ssh_key: Option<String>,
    /// Git remote name.
    pub remote: String,
    /// Branch to synchronize.
    pub branch: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dir: "~/.githerd/sync".into(),
            interval_sec: 30,
            ssh_key: None,
            remote: "origin".into(),
            branch: "master".into(),
        }
    }
}

/// Fleet drift settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    /// Shared directory holding one snapshot table per host.
    pub state_dir: String,
    /// Repository path patterns, `~/` form, shell globs allowed.
    pub repos: Vec<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self { state_dir: "~/.githerd/state".into(), repos: Vec::new() }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Pattern { pattern: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::Pattern { pattern, message } => {
                write!(f, "bad repository pattern {pattern:?}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
