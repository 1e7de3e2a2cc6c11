//! Refresh-token identity provider
//!
//! Exchanges a long-lived refresh token for short-lived identity tokens at a
//! secure-token endpoint and caches the result until shortly before expiry.

use crate::error::{Error, Result};
use crate::session::IdentityProvider;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Lifetime assumed when the endpoint does not report one
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Tokens this close to expiry are refreshed
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Response of the secure-token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "idToken")]
    pub id_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    /// Seconds; the endpoint may send this as a string
    #[serde(default, alias = "expiresIn", deserialize_with = "lenient_seconds")]
    pub expires_in: Option<u64>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

fn lenient_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Clone)]
struct CachedToken {
    id_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Instant::now() + EXPIRY_BUFFER
    }
}

struct TokenState {
    refresh_token: String,
    cached: Option<CachedToken>,
}

/// Identity provider backed by a refresh token
pub struct RefreshTokenIdentity {
    token_url: Url,
    http_client: reqwest::Client,
    state: RwLock<TokenState>,
}

impl RefreshTokenIdentity {
    /// `api_key`, when non-empty, is sent as the `key` query parameter.
    pub fn new(
        token_url: &str,
        api_key: &str,
        refresh_token: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let mut token_url = Url::parse(token_url)
            .map_err(|e| Error::Config(format!("invalid token URL {:?}: {}", token_url, e)))?;
        if !api_key.is_empty() {
            token_url.query_pairs_mut().append_pair("key", api_key);
        }

        Ok(Self {
            token_url,
            http_client,
            state: RwLock::new(TokenState {
                refresh_token: refresh_token.into(),
                cached: None,
            }),
        })
    }

    /// Drop the cached identity token so the next call mints a new one
    pub async fn invalidate(&self) {
        self.state.write().await.cached = None;
    }

    async fn fetch_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let request = TokenRequest {
            grant_type: "refresh_token",
            refresh_token,
        };

        let response = self
            .http_client
            .post(self.token_url.clone())
            .form(&request)
            .send()
            .await
            .map_err(|e| Error::TokenAcquisition(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Token refresh rejected");
            return Err(Error::TokenAcquisition(format!(
                "token request failed with status {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::TokenAcquisition(format!("malformed token response: {}", e)))
    }
}

impl fmt::Debug for RefreshTokenIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenIdentity")
            .field("token_url", &self.token_url.path())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for RefreshTokenIdentity {
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>> {
        if !force_refresh {
            let state = self.state.read().await;
            if let Some(token) = state.cached.as_ref().filter(|t| t.is_valid()) {
                return Ok(Some(token.id_token.clone()));
            }
        }

        let mut state = self.state.write().await;

        // Another task may have refreshed while we waited for the lock
        if !force_refresh {
            if let Some(token) = state.cached.as_ref().filter(|t| t.is_valid()) {
                return Ok(Some(token.id_token.clone()));
            }
        }

        let response = self.fetch_token(&state.refresh_token).await?;
        let lifetime = response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        debug!(
            lifetime_secs = lifetime,
            rotated = response.refresh_token.is_some(),
            "Minted identity token"
        );

        if let Some(rotated) = response.refresh_token.filter(|t| !t.is_empty()) {
            state.refresh_token = rotated;
        }
        state.cached = Some(CachedToken {
            id_token: response.id_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(Some(response.id_token))
    }
}
