//! Application configuration for ReadWatch.
//!
//! User config lives at `~/.readwatch/readwatch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReadWatchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "readwatch.toml";

/// Persisted local store file name (token, user, settings).
const LOCAL_STORE_FILE_NAME: &str = "local.json";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".readwatch";

// ---------------------------------------------------------------------------
// Config structs (matching readwatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Local inference engine settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Background coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST API (routes are joined onto it).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:5000/api".into()
}
fn default_backend_timeout() -> u64 {
    10
}

/// `[inference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of an OpenAI-compatible local server.
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    /// Model identifier the server must expose.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding an API key, if the server wants one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Generation timeout in seconds.
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            model: default_model(),
            api_key_env: None,
            timeout_secs: default_inference_timeout(),
        }
    }
}

impl InferenceConfig {
    /// Resolve the API key from the configured env var (never stored in the file).
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}

fn default_inference_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_model() -> String {
    "gemma3:1b".into()
}
fn default_inference_timeout() -> u64 {
    60
}

/// `[coordinator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Seconds between periodic drain attempts.
    #[serde(default = "default_drain_interval")]
    pub drain_interval_secs: u64,

    /// Upper bound on a single page-probe exchange, in ms.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            drain_interval_secs: default_drain_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl CoordinatorConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_drain_interval() -> u64 {
    5 * 60
}
fn default_probe_timeout() -> u64 {
    5000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.readwatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ReadWatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.readwatch/readwatch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path to the persisted local store (`~/.readwatch/local.json`).
pub fn local_store_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(LOCAL_STORE_FILE_NAME))
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
    let content = std::fs::read_to_string(path).map_err(|e| ReadWatchError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ReadWatchError::config(format!("failed to parse {}: {e}", path.display())))?;

    url::Url::parse(&config.backend.api_url)
        .map_err(|e| ReadWatchError::config(format!("invalid backend.api_url: {e}")))?;
    url::Url::parse(&config.inference.base_url)
        .map_err(|e| ReadWatchError::config(format!("invalid inference.base_url: {e}")))?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReadWatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReadWatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReadWatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
