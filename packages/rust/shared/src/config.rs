//! Application configuration for BookForge.
//!
//! User config lives at `~/.bookforge/bookforge.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file — only the env var names are.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bookforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bookforge";

// ---------------------------------------------------------------------------
// Config structs (matching bookforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search API settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for generated books.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Whether to generate cover/chapter artwork by default.
    #[serde(default)]
    pub generate_images: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            generate_images: false,
        }
    }
}

fn default_output_dir() -> String {
    "~/bookforge-books".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key (never the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Search API endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".into()
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the OpenAI API key.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Chat model used for TOC, chapters, and summaries.
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Image model used for cover and chapter artwork.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Max tokens per chat completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for chat completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_text_model() -> String {
    "gpt-4o".into()
}
fn default_image_model() -> String {
    "dall-e-3".into()
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_temperature() -> f32 {
    0.7
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bookforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BookForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bookforge/bookforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| BookForgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BookForgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BookForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BookForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BookForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that both API key env vars are set and non-empty.
///
/// Missing credentials are a fatal startup condition, not a runtime error.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    require_env(&config.search.api_key_env, "search API")?;
    require_env(&config.openai.api_key_env, "OpenAI API")?;
    Ok(())
}

fn require_env(var_name: &str, label: &str) -> Result<()> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(BookForgeError::config(format!(
            "{label} key not found. Set the {var_name} environment variable."
        ))),
    }
}
