//! Error types for the request bridge

use lims_common::{EnvelopeFailure, GENERIC_FAILURE_NOTICE};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the request bridge
#[derive(Error, Debug)]
pub enum Error {
    /// The CSRF cookie could not be read; no request was sent
    #[error("CSRF cookie '{cookie}' is not set")]
    MissingCsrfToken { cookie: String },

    /// The identity provider failed to produce a token; no request was sent
    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint could not be turned into a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The backend answered with `success: false`
    #[error("Request rejected: {message}")]
    Application { message: String },

    /// Authentication failed (401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization failed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (422)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Server error (5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from an HTTP status code and message
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 => Error::Authentication(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            422 => Error::Validation(message),
            429 => Error::RateLimited { retry_after: None },
            500..=599 => Error::Server(message),
            _ => Error::Other(format!("HTTP {}: {}", status, message)),
        }
    }

    /// True when the request may never have reached the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_))
    }

    /// True when the bridge refused to send the request at all
    pub fn is_not_sent(&self) -> bool {
        matches!(
            self,
            Error::MissingCsrfToken { .. }
                | Error::TokenAcquisition(_)
                | Error::InvalidUrl(_)
                | Error::Config(_)
        )
    }

    /// Text suitable for a user-facing notification.
    ///
    /// Application failures carry the backend's own message; everything else
    /// gets the generic support notice.
    pub fn user_message(&self) -> String {
        match self {
            Error::Application { message } => message.clone(),
            _ => GENERIC_FAILURE_NOTICE.to_string(),
        }
    }
}

impl From<EnvelopeFailure> for Error {
    fn from(failure: EnvelopeFailure) -> Self {
        Error::Application {
            message: failure.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            Error::from_status(StatusCode::UNAUTHORIZED, "expired".into()),
            Error::Authentication(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::FORBIDDEN, String::new()),
            Error::Forbidden(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::NOT_FOUND, String::new()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            Error::Validation(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            Error::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            Error::from_status(StatusCode::BAD_GATEWAY, String::new()),
            Error::Server(_)
        ));
        assert!(matches!(
            Error::from_status(StatusCode::IM_A_TEAPOT, String::new()),
            Error::Other(_)
        ));
    }

    #[test]
    fn test_user_message() {
        let app = Error::Application {
            message: "Batch B1 is locked.".into(),
        };
        assert_eq!(app.user_message(), "Batch B1 is locked.");

        let missing = Error::MissingCsrfToken {
            cookie: "csrftoken".into(),
        };
        assert_eq!(missing.user_message(), GENERIC_FAILURE_NOTICE);
        assert!(missing.is_not_sent());
        assert!(!missing.is_transport());
    }

    #[test]
    fn test_envelope_failure_conversion() {
        let error: Error = EnvelopeFailure {
            message: "nope".into(),
        }
        .into();
        assert!(matches!(error, Error::Application { ref message } if message == "nope"));
    }
}
