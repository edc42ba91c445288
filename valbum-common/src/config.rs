//! Configuration loading and data directory resolution
//!
//! Every value resolves through the same three tiers:
//! 1. Environment variable (highest priority)
//! 2. TOML config file (`<config_dir>/valbum/config.toml`)
//! 3. OS-dependent compiled default (fallback)
//!
//! The resolved [`AppConfig`] is built once at startup and handed to each
//! component explicitly. Nothing reads process-wide state after that.

use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the valbum data directory.
pub const ENV_DATA_DIR: &str = "VALBUM_DATA_DIR";
/// Environment variable overriding the VRChat log file directory.
pub const ENV_VRCHAT_LOG_DIR: &str = "VALBUM_VRCHAT_LOG_DIR";
/// Environment variable overriding the HTTP port.
pub const ENV_PORT: &str = "VALBUM_PORT";

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 5730;

/// Configuration file contents
///
/// All fields are optional; anything absent falls back to the compiled
/// default for that value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the log store, database, and backups
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Directory the VRChat client writes `output_log_*.txt` files into
    #[serde(default)]
    pub vrchat_log_dir: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root folder holding the log store, database, and backups
    pub data_dir: PathBuf,

    /// Directory the VRChat client writes raw log files into
    pub vrchat_log_dir: PathBuf,

    /// HTTP server port
    pub port: u16,

    /// Logging configuration carried through from the TOML file
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Resolve configuration from environment, TOML file, and defaults.
    ///
    /// Never fails: a missing or unparseable TOML file logs a warning and the
    /// remaining tiers take over.
    pub fn resolve() -> Self {
        let toml_config = load_toml_config().unwrap_or_default();

        let data_dir = resolve_path(ENV_DATA_DIR, toml_config.data_dir.clone())
            .unwrap_or_else(default_data_dir);
        let vrchat_log_dir = resolve_path(ENV_VRCHAT_LOG_DIR, toml_config.vrchat_log_dir.clone())
            .unwrap_or_else(default_vrchat_log_dir);
        let port = resolve_port(toml_config.port);

        Self {
            data_dir,
            vrchat_log_dir,
            port,
            logging: toml_config.logging,
        }
    }

    /// Month-partitioned filtered log archive.
    pub fn log_store_dir(&self) -> PathBuf {
        self.data_dir.join("logStore")
    }

    /// SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("valbum.db")
    }

    /// Import backup snapshots.
    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    /// Create the data directory tree if it does not exist yet.
    pub fn ensure_data_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.log_store_dir())?;
        std::fs::create_dir_all(self.backups_dir())?;
        Ok(())
    }
}

/// Resolve a path value through the ENV > TOML tiers.
fn resolve_path(env_var: &str, toml_value: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(path) = std::env::var(env_var) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    toml_value
}

/// Resolve the HTTP port through the ENV > TOML > default tiers.
fn resolve_port(toml_value: Option<u16>) -> u16 {
    if let Ok(raw) = std::env::var(ENV_PORT) {
        match raw.parse::<u16>() {
            Ok(port) => return port,
            Err(_) => warn!("Ignoring unparseable {}={:?}", ENV_PORT, raw),
        }
    }
    toml_value.unwrap_or(DEFAULT_PORT)
}

/// Load and parse the TOML config file, if one exists.
fn load_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => parse_toml_config(&content, &path),
        Err(e) => {
            warn!("Cannot read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Parse TOML config content, warning (not failing) on malformed input.
fn parse_toml_config(content: &str, path: &Path) -> Option<TomlConfig> {
    match toml::from_str::<TomlConfig>(content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Ignoring malformed config file {:?}: {}", path, e);
            None
        }
    }
}

/// Default configuration file path for the platform
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("valbum").join("config.toml"))
}

/// Get OS-dependent default data directory path
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/valbum
        dirs::data_local_dir()
            .map(|d| d.join("valbum"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/valbum"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/valbum
        dirs::data_dir()
            .map(|d| d.join("valbum"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/valbum"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\valbum
        dirs::data_local_dir()
            .map(|d| d.join("valbum"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\valbum"))
    } else {
        PathBuf::from("./valbum_data")
    }
}

/// Get OS-dependent default VRChat log directory path
///
/// Only Windows has a canonical location (`AppData\LocalLow\VRChat\VRChat`).
/// Elsewhere (Proton prefixes, network mounts) users are expected to point
/// `VALBUM_VRCHAT_LOG_DIR` or the TOML file at the right place.
fn default_vrchat_log_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::home_dir()
            .map(|d| {
                d.join("AppData")
                    .join("LocalLow")
                    .join("VRChat")
                    .join("VRChat")
            })
            .unwrap_or_else(|| PathBuf::from("C:\\VRChat"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("VRChat").join("VRChat"))
            .unwrap_or_else(|| PathBuf::from("./VRChat"))
    }
}
