//! Application configuration for ManyBodyLab.
//!
//! User config lives at `~/.manybodylab/manybodylab.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ManyBodyLabError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "manybodylab.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".manybodylab";

// ---------------------------------------------------------------------------
// Config structs (matching manybodylab.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory service settings.
    #[serde(default)]
    pub directory: DirectorySection,
}

/// `[directory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySection {
    /// Base URL of the directory API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Organization whose members are listed.
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Name of the env var holding an API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent detail requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Page size requested from the membership listing.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            organization: default_organization(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            per_page: default_per_page(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".into()
}
fn default_organization() -> String {
    "ManyBodyLab".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_concurrency() -> u32 {
    8
}
fn default_per_page() -> u32 {
    100
}

// ---------------------------------------------------------------------------
// Directory config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime directory configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Base URL of the directory API.
    pub base_url: String,
    /// Bearer token, resolved from the configured env var.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent detail requests.
    pub concurrency: u32,
    /// Page size requested from the membership listing.
    pub per_page: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            per_page: default_per_page(),
        }
    }
}

impl From<&AppConfig> for DirectoryConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.directory;
        Self {
            base_url: section.base_url.clone(),
            token: resolve_token(&section.token_env),
            timeout_secs: section.timeout_secs,
            concurrency: section.concurrency,
            per_page: section.per_page,
        }
    }
}

/// Read a token from the named env var, treating empty values as unset.
fn resolve_token(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.manybodylab/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ManyBodyLabError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.manybodylab/manybodylab.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ManyBodyLabError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ManyBodyLabError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ManyBodyLabError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ManyBodyLabError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ManyBodyLabError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
