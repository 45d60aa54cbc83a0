//! Application configuration for contextpairs.
//!
//! User config lives at `~/.contextpairs/contextpairs.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ContextPairsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contextpairs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contextpairs";

// ---------------------------------------------------------------------------
// Config structs (matching contextpairs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Archive service settings.
    #[serde(default)]
    pub archive: ArchiveSection,

    /// Assembly and resume settings.
    #[serde(default)]
    pub assembly: AssemblySection,
}

/// `[archive]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSection {
    /// Base URL of the archive API (no trailing slash needed).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum ms between consecutive archive requests. 0 disables pacing.
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,

    /// Extra attempts after a transport failure before giving up on a lookup.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before the first retry; doubles on every further attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.pullpush.io/reddit".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_min_interval() -> u64 {
    100
}
fn default_retries() -> u32 {
    2
}
fn default_retry_backoff() -> u64 {
    500
}

/// `[assembly]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySection {
    /// Records buffered before each flush + checkpoint.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// File holding the id of the last flushed reply.
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Maximum ancestors fetched per reply.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for AssemblySection {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            checkpoint_file: default_checkpoint_file(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_buffer_size() -> usize {
    10
}
fn default_checkpoint_file() -> String {
    "last_processed_id.txt".into()
}
fn default_max_depth() -> usize {
    500
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.assembly.buffer_size == 0 {
            return Err(ContextPairsError::config("assembly.buffer_size must be at least 1"));
        }
        if self.assembly.max_depth == 0 {
            return Err(ContextPairsError::config("assembly.max_depth must be at least 1"));
        }
        if self.archive.timeout_secs == 0 {
            return Err(ContextPairsError::config("archive.timeout_secs must be at least 1"));
        }
        if self.assembly.checkpoint_file.trim().is_empty() {
            return Err(ContextPairsError::config("assembly.checkpoint_file must not be empty"));
        }
        let url = Url::parse(&self.archive.base_url).map_err(|e| {
            ContextPairsError::config(format!(
                "archive.base_url '{}' is not a valid URL: {e}",
                self.archive.base_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ContextPairsError::config(format!(
                "archive.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime settings for the HTTP archive client.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
}

impl From<&AppConfig> for ArchiveConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.archive.base_url.clone(),
            timeout_secs: config.archive.timeout_secs,
            min_interval_ms: config.archive.min_interval_ms,
        }
    }
}

/// Runtime settings for the ancestor-chain walk.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Extra attempts after a transport failure.
    pub retries: u32,
    /// Initial retry delay in ms.
    pub retry_backoff_ms: u64,
    /// Maximum ancestors fetched per reply.
    pub max_depth: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for WalkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            retries: config.archive.retries,
            retry_backoff_ms: config.archive.retry_backoff_ms,
            max_depth: config.assembly.max_depth,
        }
    }
}

/// Runtime settings for checkpointed assembly.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Records buffered before each flush.
    pub buffer_size: usize,
    /// Path of the checkpoint file.
    pub checkpoint_path: PathBuf,
}

impl From<&AppConfig> for AssemblyConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            buffer_size: config.assembly.buffer_size,
            checkpoint_path: PathBuf::from(&config.assembly.checkpoint_file),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contextpairs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContextPairsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contextpairs/contextpairs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContextPairsError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ContextPairsError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContextPairsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContextPairsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContextPairsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
