//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "lims.toml",
    "config.toml",
    "./config/lims.toml",
    "/etc/lims/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) but reads overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup)? {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        } else {
            debug!("No configuration file found, using defaults");
        }

        apply_overrides(&mut config, &lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    ///
    /// An explicit path that does not exist is an error; the search paths are optional.
    fn find_config_file<F>(&self, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::ValidationError(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        if let Some(path) = lookup("LIMS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // API
    if let Some(val) = lookup("LIMS_API_ORIGIN") {
        config.api.origin = val;
    }
    if let Some(val) = lookup("LIMS_CSRF_COOKIE_NAME") {
        config.api.csrf_cookie_name = val;
    }
    if let Some(val) = lookup("LIMS_API_TIMEOUT_MS") {
        let timeout = val.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("LIMS_API_TIMEOUT_MS is not a number: {val:?}"))
        })?;
        config.api.timeout_ms = Some(timeout);
    }
    if let Some(val) = lookup("LIMS_USER_AGENT") {
        config.api.user_agent = val;
    }

    // Auth
    if let Some(val) = lookup("LIMS_AUTH_TOKEN_URL") {
        config.auth.token_url = val;
    }
    if let Some(val) = lookup("LIMS_AUTH_API_KEY") {
        config.auth.api_key = val;
    }
    if let Some(val) = lookup("LIMS_AUTH_REFRESH_TOKEN").filter(|v| !v.is_empty()) {
        config.auth.refresh_token = Some(val);
    }
    if let Some(val) = lookup("LIMS_ID_TOKEN").filter(|v| !v.is_empty()) {
        config.auth.id_token = Some(val);
    }

    // Logging
    if let Some(val) = lookup("LOG_FORMAT") {
        config.logging.format = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\norigin = \"https://file.example.com\"").unwrap();

        let env = vars(&[
            ("LIMS_API_ORIGIN", "https://env.example.com"),
            ("LIMS_API_TIMEOUT_MS", "2500"),
            ("LIMS_AUTH_REFRESH_TOKEN", "refresh-xyz"),
            ("LOG_FORMAT", "json"),
        ]);

        let config = ConfigLoader::with_path(file.path())
            .load_with(|key| env.get(key).cloned())
            .unwrap();

        assert_eq!(config.api.origin, "https://env.example.com");
        assert_eq!(config.api.timeout_ms, Some(2500));
        assert_eq!(config.auth.refresh_token.as_deref(), Some("refresh-xyz"));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_config_env_var_selects_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\ncsrf_cookie_name = \"lims_csrf\"").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let env = vars(&[("LIMS_CONFIG", &path)]);
        let config = ConfigLoader::new()
            .load_with(|key| env.get(key).cloned())
            .unwrap();

        assert_eq!(config.api.csrf_cookie_name, "lims_csrf");
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = ConfigLoader::with_path("/nonexistent/lims.toml").load_with(|_| None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let env = vars(&[("LIMS_API_TIMEOUT_MS", "soon")]);
        let result = ConfigLoader::with_path(file.path()).load_with(|key| env.get(key).cloned());
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_token_overrides_are_ignored() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let env = vars(&[("LIMS_ID_TOKEN", ""), ("LIMS_AUTH_REFRESH_TOKEN", "")]);
        let config = ConfigLoader::with_path(file.path())
            .load_with(|key| env.get(key).cloned())
            .unwrap();

        assert!(config.auth.id_token.is_none());
        assert!(config.auth.refresh_token.is_none());
    }
}
