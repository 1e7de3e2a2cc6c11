//! Bridge configuration

use crate::error::{Error, Result};
use reqwest::Url;
use std::time::Duration;

/// Default name of the cookie carrying the CSRF token
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Configuration for the request bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Origin that relative endpoints are resolved against
    pub origin: Url,

    /// Cookie holding the CSRF token
    pub csrf_cookie_name: String,

    /// Request timeout; `None` lets a request wait indefinitely
    pub timeout: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl BridgeConfig {
    /// Create a new configuration for the given origin
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| Error::Config(format!("invalid origin {:?}: {}", origin, e)))?;

        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(Error::Config(format!(
                "origin must be an http(s) URL with a host, got {}",
                origin
            )));
        }

        Ok(Self {
            origin,
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            timeout: None,
            user_agent: format!("lims-bridge/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Set the CSRF cookie name
    pub fn with_csrf_cookie(mut self, name: impl Into<String>) -> Self {
        self.csrf_cookie_name = name.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set custom user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::new("https://lims.example.com").unwrap();
        assert_eq!(config.origin.as_str(), "https://lims.example.com/");
        assert_eq!(config.csrf_cookie_name, "csrftoken");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::new("http://localhost:8000")
            .unwrap()
            .with_csrf_cookie("lims_csrf")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("console-test");

        assert_eq!(config.csrf_cookie_name, "lims_csrf");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent, "console-test");
    }

    #[test]
    fn test_rejects_non_http_origin() {
        assert!(matches!(
            BridgeConfig::new("ftp://files.example.com"),
            Err(Error::Config(_))
        ));
        assert!(BridgeConfig::new("not a url").is_err());
    }
}
