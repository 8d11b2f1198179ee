//! Configuration loading, validation, and management for AskMyCar.
//!
//! Loads configuration from `~/.askmycar/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard upper bound on completion rounds per chat exchange.
pub const MAX_ROUNDS_LIMIT: u32 = 5;

/// The root configuration structure.
///
/// Maps directly to `~/.askmycar/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model used for every completion round
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Completion rounds per chat exchange (1..=5)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Sampling temperature; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub vehicle_db: VehicleDbConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub nhtsa: NhtsaConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-6".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_rounds() -> u32 {
    MAX_ROUNDS_LIMIT
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_rounds", &self.max_rounds)
            .field("temperature", &self.temperature)
            .field("anthropic", &self.anthropic)
            .field("vehicle_db", &self.vehicle_db)
            .field("search", &self.search)
            .field("nhtsa", &self.nhtsa)
            .field("images", &self.images)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Anthropic Messages API access.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for proxies and tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Vehicle-manual registry (vehicledatabases.com).
#[derive(Clone, Serialize, Deserialize)]
pub struct VehicleDbConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_vehicle_db_url")]
    pub base_url: String,

    #[serde(default = "default_vehicle_db_timeout")]
    pub timeout_secs: u64,
}

fn default_vehicle_db_url() -> String {
    "https://api.vehicledatabases.com".into()
}
fn default_vehicle_db_timeout() -> u64 {
    8
}

impl Default for VehicleDbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_vehicle_db_url(),
            timeout_secs: default_vehicle_db_timeout(),
        }
    }
}

impl std::fmt::Debug for VehicleDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleDbConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Brave Search API, used for web search and image fallback.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_url")]
    pub base_url: String,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Results formatted into a web_search tool result
    #[serde(default = "default_search_results")]
    pub max_results: usize,
}

fn default_search_url() -> String {
    "https://api.search.brave.com".into()
}
fn default_search_timeout() -> u64 {
    4
}
fn default_search_results() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_url(),
            timeout_secs: default_search_timeout(),
            max_results: default_search_results(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// NHTSA vPIC VIN decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhtsaConfig {
    #[serde(default = "default_nhtsa_url")]
    pub base_url: String,

    #[serde(default = "default_nhtsa_timeout")]
    pub timeout_secs: u64,
}

fn default_nhtsa_url() -> String {
    "https://vpic.nhtsa.dot.gov/api/vehicles".into()
}
fn default_nhtsa_timeout() -> u64 {
    10
}

impl Default for NhtsaConfig {
    fn default() -> Self {
        Self {
            base_url: default_nhtsa_url(),
            timeout_secs: default_nhtsa_timeout(),
        }
    }
}

/// Vehicle image lookup and its cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,

    /// Sent to Wikipedia, which requires an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,

    /// Maximum cached lookups
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Seconds a cached lookup stays valid
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}
fn default_user_agent() -> String {
    "AskMyCar/1.0 (automotive assistant; contact@askmycar.app)".into()
}
fn default_image_timeout() -> u64 {
    4
}
fn default_cache_capacity() -> usize {
    512
}
fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            wikipedia_url: default_wikipedia_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_image_timeout(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed by CORS. Empty = same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    256 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.askmycar/config.toml).
    ///
    /// Environment variables fill in credentials the file leaves unset:
    /// - `ANTHROPIC_API_KEY`
    /// - `VEHICLE_DB_API_KEY`
    /// - `BRAVE_SEARCH_API_KEY`
    ///
    /// and `ASKMYCAR_MODEL` / `ASKMYCAR_PORT` override the file.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.anthropic.api_key.is_none() {
            self.anthropic.api_key = non_empty("ANTHROPIC_API_KEY");
        }
        if self.vehicle_db.api_key.is_none() {
            self.vehicle_db.api_key = non_empty("VEHICLE_DB_API_KEY");
        }
        if self.search.api_key.is_none() {
            self.search.api_key = non_empty("BRAVE_SEARCH_API_KEY");
        }
        if let Some(model) = non_empty("ASKMYCAR_MODEL") {
            self.model = model;
        }
        if let Some(port) = non_empty("ASKMYCAR_PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("ASKMYCAR_PORT is not a port: {port}")))?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".askmycar")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 || self.max_rounds > MAX_ROUNDS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_rounds must be between 1 and {MAX_ROUNDS_LIMIT}"
            )));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if let Some(t) = self.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 1.0".into(),
                ));
            }
        }

        if self.images.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "images.cache_capacity must be > 0".into(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if the model provider has a key.
    pub fn has_api_key(&self) -> bool {
        self.anthropic.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_rounds: default_max_rounds(),
            temperature: None,
            anthropic: AnthropicConfig::default(),
            vehicle_db: VehicleDbConfig::default(),
            search: SearchConfig::default(),
            nhtsa: NhtsaConfig::default(),
            images: ImageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
