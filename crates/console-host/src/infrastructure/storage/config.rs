//! TOML-based configuration for the console host.
//!
//! Reads and writes `HostConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DevConsole\config.toml`
//! - Linux:    `~/.config/devconsole/config.toml`
//! - macOS:    `~/Library/Application Support/DevConsole/config.toml`
//!
//! Example:
//!
//! ```toml
//! [console]
//! identity = "Arena Prototype"
//! tick_rate_hz = 60
//! startup_commands = ["bind f1 cmdlist"]
//! history_size = 128
//!
//! [network]
//! port = 24810
//! session_timeout_secs = 10
//!
//! [preferences]
//! autosave_delay_secs = 1.0
//! ```
//!
//! Every field has a `#[serde(default = "...")]` helper, so a partial file
//! (or no file at all on first run) still yields a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use console_core::protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// Frame loop and shell settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    /// Name announced to remote tools in discovery responses.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Frame loop rate of the demo host.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Command lines executed once after startup.
    #[serde(default)]
    pub startup_commands: Vec<String>,
    /// Lines kept in the local terminal history.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Console server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Whether to start the UDP console server at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// UDP port for discovery and sessions.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Datagrams the network thread may queue for the frame loop before
    /// further ones are dropped.
    #[serde(default = "default_pump_queue_capacity")]
    pub pump_queue_capacity: usize,
    /// A session that sends nothing for this long is dropped.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Receive buffer size and the largest datagram the host will send.
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
}

/// Preferences store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferencesConfig {
    /// File name inside the config directory.
    #[serde(default = "default_preferences_file")]
    pub file_name: String,
    /// Seconds between the first unsaved change and the automatic save.
    #[serde(default = "default_autosave_delay")]
    pub autosave_delay_secs: f64,
}

impl NetworkConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_identity() -> String {
    "DevConsole Host".to_string()
}
fn default_tick_rate() -> u32 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_history_size() -> usize {
    console_core::shell::history::DEFAULT_HISTORY_CAPACITY
}
fn default_true() -> bool {
    true
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_pump_queue_capacity() -> usize {
    256
}
fn default_session_timeout_secs() -> u64 {
    10
}
fn default_max_datagram_size() -> usize {
    65_507
}
fn default_preferences_file() -> String {
    "preferences.toml".to_string()
}
fn default_autosave_delay() -> f64 {
    1.0
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            tick_rate_hz: default_tick_rate(),
            log_level: default_log_level(),
            startup_commands: Vec::new(),
            history_size: default_history_size(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_address: default_bind_address(),
            port: default_port(),
            pump_queue_capacity: default_pump_queue_capacity(),
            session_timeout_secs: default_session_timeout_secs(),
            max_datagram_size: default_max_datagram_size(),
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            file_name: default_preferences_file(),
            autosave_delay_secs: default_autosave_delay(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the host's files.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `HostConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<HostConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `HostConfig` from `path`, returning defaults if the file does not
/// exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &HostConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &HostConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `DevConsole`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DevConsole"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("devconsole"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DevConsole")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
