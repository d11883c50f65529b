//! Application configuration for Postforge.
//!
//! User config lives at `~/.postforge/postforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PostforgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "postforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".postforge";

// ---------------------------------------------------------------------------
// Config structs (matching postforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Target site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Local storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Web search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// OpenRouter settings for the rewrite step.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Blog listing base URL where pagination discovery starts.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path fragment an article link must contain to be harvested.
    #[serde(default = "default_content_path")]
    pub content_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            content_path: default_content_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://beyondchats.com/blogs/".into()
}
fn default_content_path() -> String {
    "/blogs/".into()
}

impl SiteConfig {
    /// Host of the configured site, used to keep the enhancement loop from
    /// researching its own articles.
    pub fn host(&self) -> Result<String> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| PostforgeError::config(format!("invalid site.base_url: {e}")))?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| PostforgeError::config("site.base_url has no host"))
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the local article database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.postforge/articles.db".into()
}

impl StorageConfig {
    /// Database path with a leading `~/` expanded to the user's home.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        resolve_home(&self.db_path)
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search engine id.
    #[serde(default = "default_search_cx_env")]
    pub engine_id_env: String,

    /// Number of ranked results to request per query.
    #[serde(default = "default_result_count")]
    pub result_count: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_search_cx_env(),
            result_count: default_result_count(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_SEARCH_API_KEY".into()
}
fn default_search_cx_env() -> String {
    "GOOGLE_SEARCH_ENGINE_ID".into()
}
fn default_result_count() -> u32 {
    10
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Default model to use for rewriting.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.postforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PostforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.postforge/postforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PostforgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PostforgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PostforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PostforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PostforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API credential through the env var named in the config.
pub fn read_env_credential(var_name: &str, hint: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(PostforgeError::config(format!(
            "{hint} not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
fn resolve_home(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| PostforgeError::config("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(path))
    }
}
