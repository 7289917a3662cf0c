//! Bootstrap configuration for AutoCheck services
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (handled by each binary via clap)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants below)
//!
//! The TOML file is read once at startup. Changes require a restart.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variables consulted for the assessment backend key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["AUTOCHECK_API_KEY", "GEMINI_API_KEY"];

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Spanish";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted request body (bytes), applies to image uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Assessment backend settings
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            logging: LoggingConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Multimodal inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API key (lowest priority source, see [`resolve_api_key`])
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Language the narrative fields (summary, issues, tips) are written in
    #[serde(default = "default_response_language")]
    pub response_language: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            response_language: default_response_language(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_log_level() -> String {
    "autocheck_inspector=info,tower_http=info".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_response_language() -> String {
    DEFAULT_RESPONSE_LANGUAGE.to_string()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate the platform config file
///
/// Linux checks `~/.config/autocheck/config.toml` then `/etc/autocheck/config.toml`;
/// other platforms only check the user config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("autocheck").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/autocheck/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load bootstrap configuration
///
/// An explicit path must exist and parse. Without one, the discovered
/// platform file is used, and a missing file yields built-in defaults.
pub fn load_bootstrap_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::NotFound(format!("Config file {}", path.display())));
        }
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    match find_config_file() {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the backend API key from the process environment and TOML
pub fn resolve_api_key(backend: &BackendConfig) -> Result<String> {
    resolve_api_key_with(backend, |name| std::env::var(name).ok())
}

/// Resolve the backend API key using a caller-supplied environment lookup
///
/// **Priority:** `AUTOCHECK_API_KEY` → `GEMINI_API_KEY` → `backend.api_key`
pub fn resolve_api_key_with<F>(backend: &BackendConfig, env: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sources: Vec<(&str, String)> = API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| env(name).map(|v| (*name, v)))
        .filter(|(_, v)| is_valid_key(v))
        .collect();

    if let Some(key) = backend.api_key.as_ref().filter(|k| is_valid_key(k)) {
        sources.push(("TOML", key.clone()));
    }

    if sources.len() > 1 {
        let names: Vec<&str> = sources.iter().map(|(name, _)| *name).collect();
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            names.join(", "),
            names[0]
        );
    }

    match sources.into_iter().next() {
        Some((source, key)) => {
            info!("Assessment API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::Config(
            "Assessment API key not configured. Please configure using one of:\n\
             1. Environment: AUTOCHECK_API_KEY=your-key-here\n\
             2. Environment: GEMINI_API_KEY=your-key-here\n\
             3. TOML config: ~/.config/autocheck/config.toml ([backend] api_key = \"your-key\")"
                .to_string(),
        )),
    }
}
