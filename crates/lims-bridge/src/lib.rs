//! # LIMS Console Request Bridge
//!
//! Credentialed access from the LIMS console to its backend API.
//!
//! Every call:
//! - obtains the current identity token from an injected [`IdentityProvider`]
//! - reads the CSRF token from the session's [`CookieStore`]
//! - sends `Authorization: Bearer <token>`, `X-CSRFToken` and a JSON content type
//! - picks GET, POST (payload present) or DELETE (forced)
//! - returns the parsed JSON envelope, or the raw response for files and
//!   bodies that are not JSON
//!
//! Failures are always returned as [`Error`]; a missing CSRF cookie or an
//! unavailable identity token means no request was sent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lims_bridge::{Bridge, BridgeConfig, CookieJar, Session, StaticIdentity};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(
//!         Arc::new(StaticIdentity::new("id-token")),
//!         Arc::new(CookieJar::from_header("csrftoken=abc123")),
//!     );
//!     let bridge = Bridge::new(BridgeConfig::new("https://console.example.com")?, session)?;
//!
//!     let response = bridge
//!         .post("/api/samples", &json!({"sample_id": "S1", "batch_id": "B1"}))
//!         .await?;
//!     println!("{:?}", response.as_json());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod loading;
pub mod refresh;
pub mod request;
pub mod response;
pub mod session;

pub use client::{Bridge, CSRF_HEADER};
pub use config::{BridgeConfig, DEFAULT_CSRF_COOKIE};
pub use csrf::{parse_cookie_header, read_csrf_token, CookieJar, CookieStore};
pub use error::{Error, Result};
pub use lims_common::{Envelope, EnvelopeFailure, GENERIC_FAILURE_NOTICE};
pub use loading::{LoadingGuard, LoadingTracker};
pub use refresh::RefreshTokenIdentity;
pub use request::{RequestDescriptor, RequestOptions};
pub use response::{BridgeResponse, RawResponse};
pub use session::{
    auth_state_channel, AuthState, AuthStateListener, AuthStatePublisher, IdentityProvider,
    Session, StaticIdentity,
};
