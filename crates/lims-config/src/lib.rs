//! LIMS Console Configuration
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin relative endpoints are resolved against
    pub origin: String,
    /// Name of the cookie holding the CSRF token
    pub csrf_cookie_name: String,
    /// Optional request timeout in milliseconds; requests never time out when unset
    pub timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8000".to_string(),
            csrf_cookie_name: "csrftoken".to_string(),
            timeout_ms: None,
            user_agent: format!("lims-console/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secure token endpoint used to exchange refresh tokens
    pub token_url: String,
    /// Web API key appended to token requests as `key`
    pub api_key: String,
    /// Long-lived refresh token of the signed-in principal
    pub refresh_token: Option<String>,
    /// Pre-minted identity token, used as-is when no refresh token is set
    pub id_token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: "https://securetoken.googleapis.com/v1/token".to_string(),
            api_key: String::new(),
            refresh_token: None,
            id_token: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    /// Filter used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Check the settings the request bridge cannot work without
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = Url::parse(&self.api.origin).map_err(|e| {
            ConfigError::ValidationError(format!(
                "api.origin is not a valid URL ({e}): {:?}",
                self.api.origin
            ))
        })?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "api.origin must be an http(s) URL with a host, got {:?}",
                self.api.origin
            )));
        }

        if self.api.csrf_cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.csrf_cookie_name must not be empty".to_string(),
            ));
        }

        if self.api.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "api.timeout_ms must be greater than zero when set".to_string(),
            ));
        }

        if self.auth.refresh_token.is_some() && self.auth.token_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.token_url is required when a refresh token is configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# LIMS Console Configuration
# Environment variables override these settings

[api]
origin = "http://localhost:8000"
csrf_cookie_name = "csrftoken"
# timeout_ms = 30000  # unset: no timeout
user_agent = "lims-console"

[auth]
token_url = "https://securetoken.googleapis.com/v1/token"
api_key = ""
# refresh_token = ""
# id_token = ""

[logging]
format = "text"  # text or json
filter = "info"
"#
        .to_string()
    }
}
