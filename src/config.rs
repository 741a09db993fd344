//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// API key configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Model selection.
    #[serde(default)]
    pub models: ModelsConfig,
}

/// API key configuration.
#[derive(Debug, Default, Deserialize)]
pub struct KeysConfig {
    /// Gemini API key.
    pub gemini: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Directory generated images are written to.
    pub image_dir: PathBuf,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            image_dir: PathBuf::from("image"),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Model names (aliases or exact identifiers).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model used for summaries, grounding and document extraction.
    pub text: String,
    /// Model used for image generation and editing.
    pub image: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self { text: "flash".to_string(), image: "nano-banana".to_string() }
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Get the Gemini API key, preferring the environment variable.
    ///
    /// Blank values count as absent.
    #[must_use]
    pub fn gemini_key(&self) -> Option<String> {
        let present = |key: &String| !key.trim().is_empty();
        std::env::var(GEMINI_KEY_ENV)
            .ok()
            .filter(present)
            .or_else(|| self.keys.gemini.clone().filter(present))
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `RELAY_CONFIG` environment variable
/// 3. `~/.config/gemini-relay/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("RELAY_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/gemini-relay/config.toml")
    } else {
        PathBuf::from("gemini-relay.toml")
    }
}
