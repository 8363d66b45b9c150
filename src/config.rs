// Configuration File Support
//
// TOML configuration for the gateway with environment variable overrides.
// The default location is the XDG config directory: ~/.config/sms-gateway/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::admission::CountingStrategy;

/// Accepted `[logging] level` values
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted `[logging] format` values
pub const LOG_FORMATS: &[&str] = &["json", "pretty", "compact"];

/// Default lifetime recipient limit for newly registered applications
pub const DEFAULT_APPLICATION_LIMIT: u64 = 200_000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Quota policy
    pub quota: QuotaConfig,

    /// Bootstrap admin account
    pub admin: AdminConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,

    /// Upper bound on the lifetime of a single request
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

/// Quota policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuotaConfig {
    /// Limit given to applications created through the admin API
    pub default_limit: u64,

    /// How admitted recipients are charged to the counter
    pub strategy: CountingStrategy,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_APPLICATION_LIMIT,
            strategy: CountingStrategy::default(),
        }
    }
}

/// Admin account created at startup
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

/// Placeholder password shipped in the defaults
pub const DEFAULT_ADMIN_PASSWORD: &str = "changeme";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to register and expose Prometheus metrics
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// If the config file does not exist, returns the default configuration
    /// with environment overrides applied.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/sms-gateway/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "smsgateway", "sms-gateway") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("sms-gateway")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - SMS_GATEWAY_LOG_LEVEL
    /// - SMS_GATEWAY_LOG_FORMAT
    /// - SMS_GATEWAY_BIND_ADDRESS
    /// - SMS_GATEWAY_PORT
    /// - SMS_GATEWAY_DEFAULT_LIMIT
    /// - SMS_GATEWAY_QUOTA_STRATEGY
    /// - SMS_GATEWAY_ADMIN_USERNAME
    /// - SMS_GATEWAY_ADMIN_PASSWORD
    /// - SMS_GATEWAY_METRICS_ENABLED
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("SMS_GATEWAY_LOG_LEVEL") {
            if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                self.logging.level = level;
            }
        }
        if let Ok(format) = std::env::var("SMS_GATEWAY_LOG_FORMAT") {
            if LOG_FORMATS.contains(&format.to_lowercase().as_str()) {
                self.logging.format = format;
            }
        }

        if let Ok(address) = std::env::var("SMS_GATEWAY_BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        if let Ok(port) = std::env::var("SMS_GATEWAY_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                if port > 0 {
                    self.server.port = port;
                }
            }
        }

        if let Ok(limit) = std::env::var("SMS_GATEWAY_DEFAULT_LIMIT") {
            if let Ok(limit) = limit.parse::<u64>() {
                self.quota.default_limit = limit;
            }
        }
        if let Ok(strategy) = std::env::var("SMS_GATEWAY_QUOTA_STRATEGY") {
            if let Ok(strategy) = strategy.parse::<CountingStrategy>() {
                self.quota.strategy = strategy;
            }
        }

        if let Ok(username) = std::env::var("SMS_GATEWAY_ADMIN_USERNAME") {
            if !username.trim().is_empty() {
                self.admin.username = username;
            }
        }
        if let Ok(password) = std::env::var("SMS_GATEWAY_ADMIN_PASSWORD") {
            if !password.is_empty() {
                self.admin.password = password;
            }
        }

        if let Ok(enabled) = std::env::var("SMS_GATEWAY_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(self.metrics.enabled);
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            );
        }

        if !LOG_FORMATS.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log format: {}. Must be one of: {}",
                self.logging.format,
                LOG_FORMATS.join(", ")
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least 1 second");
        }

        if self.admin.username.trim().is_empty() {
            anyhow::bail!("Admin username must not be empty");
        }
        if self.admin.password.is_empty() {
            anyhow::bail!("Admin password must not be empty");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Render as TOML with the admin password masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.admin.password = "<redacted>".to_string();
        toml::to_string_pretty(&shown).context("Failed to serialize configuration")
    }
}
