//! Configuration management for certbridge.
//!
//! This module provides the configuration system used to construct the
//! certificate services:
//! - Loading from YAML files
//! - Environment variable overrides (`CERTBRIDGE__SECTION__FIELD`)
//! - Validation of required settings
//!
//! Nothing in the certificate engine reads configuration directly; the
//! values are handed to constructors.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use certbridge_core::config::AppConfig;
///
/// let config = AppConfig::from_file("certbridge.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Certificate protection and storage settings
    #[serde(default)]
    pub certificates: CertificatesConfig,

    /// Certificate authority API settings
    #[serde(default)]
    pub dnsimple: DnsimpleConfig,

    /// Application management API settings
    #[serde(default)]
    pub app_service: AppServiceConfig,

    /// Blob storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Binding reconciliation settings
    #[serde(default)]
    pub binder: BinderConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering
    /// `CERTBRIDGE__*` environment variables over the file.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("CERTBRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.certificates.password.is_empty() {
            return Err(ConfigError::missing_field("certificates.password").into());
        }

        if self.certificates.container.is_empty() {
            return Err(ConfigError::missing_field("certificates.container").into());
        }

        if self.dnsimple.token.is_empty() {
            return Err(ConfigError::missing_field("dnsimple.token").into());
        }

        if self.app_service.subscription_id.is_empty() {
            return Err(ConfigError::missing_field("app_service.subscription_id").into());
        }

        if self.binder.max_concurrent_applications == 0 {
            return Err(ConfigError::invalid_value(
                "binder.max_concurrent_applications",
                "must be at least 1",
            )
            .into());
        }

        self.logging.parse_level()?;

        Ok(())
    }
}

/// Certificate protection and storage settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct CertificatesConfig {
    /// Password protecting exported PFX archives
    #[serde(default)]
    pub password: String,

    /// Blob container certificates are uploaded to
    #[serde(default = "default_container")]
    pub container: String,
}

fn default_container() -> String {
    "certificates".to_string()
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            container: default_container(),
        }
    }
}

impl fmt::Debug for CertificatesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificatesConfig")
            .field("password", &"[REDACTED]")
            .field("container", &self.container)
            .finish()
    }
}

/// Certificate authority API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DnsimpleConfig {
    /// API base URL
    #[serde(default = "default_dnsimple_url")]
    pub url: String,

    /// API access token
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_dnsimple_url() -> String {
    "https://api.dnsimple.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DnsimpleConfig {
    fn default() -> Self {
        Self {
            url: default_dnsimple_url(),
            token: String::new(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl DnsimpleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for DnsimpleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsimpleConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Application management API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppServiceConfig {
    /// Subscription that owns the web applications
    #[serde(default)]
    pub subscription_id: String,

    /// Resource manager endpoint
    #[serde(default = "default_management_url")]
    pub management_url: String,

    /// Bearer token for the resource manager, acquired by the host
    #[serde(default)]
    pub access_token: String,

    /// Resource manager API version for `Microsoft.Web` resources
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_management_url() -> String {
    "https://management.azure.com".to_string()
}

fn default_api_version() -> String {
    "2022-03-01".to_string()
}

impl Default for AppServiceConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            management_url: default_management_url(),
            access_token: String::new(),
            api_version: default_api_version(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl AppServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for AppServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppServiceConfig")
            .field("subscription_id", &self.subscription_id)
            .field("management_url", &self.management_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the file system blob store
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Binding reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Number of applications reconciled concurrently (1 = sequential)
    #[serde(default = "default_max_concurrent_applications")]
    pub max_concurrent_applications: usize,
}

fn default_max_concurrent_applications() -> usize {
    1
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_applications: default_max_concurrent_applications(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Whether to include file/line info
    #[serde(default)]
    pub file_line: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            file_line: false,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}
