//! Configuration Module
//!
//! Handles loading, validation, and saving of wizard configuration.

pub mod secrets;

pub use secrets::SecretString;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Catalog and valuation service access
    #[serde(default)]
    pub services: ServicesConfig,

    /// Sink and redirect destinations
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// HTTP client tuning
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vehicle data service configuration (catalog + valuation share a host and key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL for catalog and valuation endpoints
    #[serde(default = "default_services_base_url")]
    pub base_url: String,

    /// Value of the `x-AuthKey` header
    #[serde(default)]
    pub auth_key: SecretString,
}

fn default_services_base_url() -> String {
    "https://api.vehicledatabases.com".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_services_base_url(),
            auth_key: SecretString::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Downstream automation endpoint receiving the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_url: Option<String>,

    /// Where the host navigates after a successful submission
    #[serde(default = "default_redirect_base_url")]
    pub redirect_base_url: String,
}

fn default_redirect_base_url() -> String {
    "https://trade-in.airparkdodgechryslerjeeps.com/".to_string()
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            sink_url: None,
            redirect_base_url: default_redirect_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl HttpConfig {
    /// Build the shared HTTP client from these settings
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for the rolling debug log (defaults to .tradein/logs)
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

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/tradein/config.toml
    /// 3. Local config: ./tradein.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(config, &system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(config, &local_config_path)?;
        }

        config = Self::apply_env_overrides(config);

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(Self::default(), path)?;

        Ok(Self::apply_env_overrides(config))
    }

    /// Get the system config path: ~/.config/tradein/config.toml
    fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tradein").join("config.toml"))
    }

    /// Get the local config path: ./tradein.toml
    fn local_config_path() -> PathBuf {
        PathBuf::from("./tradein.toml")
    }

    fn merge_from_file(base: Self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let file_config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(Self::merge(base, file_config))
    }

    /// Overlay merge: a later file replaces earlier sections, but an auth
    /// key or sink URL set earlier survives a file that leaves it out.
    fn merge(base: Self, overlay: Self) -> Self {
        let mut merged = overlay;
        if merged.services.auth_key.is_empty() {
            merged.services.auth_key = base.services.auth_key.clone();
        }
        if merged.submission.sink_url.is_none() {
            merged.submission.sink_url = base.submission.sink_url.clone();
        }
        merged
    }

    fn apply_env_overrides(mut config: Self) -> Self {
        if let Some(key) = SecretString::from_env_optional("TRADEIN_AUTH_KEY") {
            config.services.auth_key = key;
        }

        if let Ok(base_url) = std::env::var("TRADEIN_CATALOG_URL") {
            config.services.base_url = base_url;
        }

        if let Ok(sink_url) = std::env::var("TRADEIN_WEBHOOK_URL") {
            config.submission.sink_url = Some(sink_url);
        }

        if let Ok(end_url) = std::env::var("TRADEIN_END_URL") {
            config.submission.redirect_base_url = end_url;
        }

        if let Ok(log_level) = std::env::var("TRADEIN_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(log_file) = std::env::var("TRADEIN_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Url::parse(&self.services.base_url)
            .with_context(|| format!("Invalid services base_url: {}", self.services.base_url))?;

        Url::parse(&self.submission.redirect_base_url).with_context(|| {
            format!(
                "Invalid redirect_base_url: {}",
                self.submission.redirect_base_url
            )
        })?;

        match &self.submission.sink_url {
            Some(url) => {
                Url::parse(url).with_context(|| format!("Invalid sink_url: {}", url))?;
            }
            None => anyhow::bail!("submission.sink_url is not set (or TRADEIN_WEBHOOK_URL)"),
        }

        if self.services.auth_key.is_empty() {
            tracing::warn!("No services auth key configured; catalog requests will likely fail");
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}
