//! Identity providers and the injected session context
//!
//! The console used to read the signed-in user from the auth provider's global
//! singleton. Here the session is a value handed to the bridge: an
//! [`IdentityProvider`] that mints identity tokens and a [`CookieStore`] that
//! exposes the CSRF cookie.

use crate::csrf::{CookieJar, CookieStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Source of identity tokens for the signed-in principal
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current identity token, `None` when nobody is signed in.
    ///
    /// `force_refresh` asks the provider to mint a new token even if a
    /// cached one is still valid.
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>>;
}

/// Provider that always returns the same token (or none)
#[derive(Clone, Default)]
pub struct StaticIdentity {
    token: Option<String>,
}

impl StaticIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider for a signed-out console
    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticIdentity")
            .field("signed_in", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn id_token(&self, _force_refresh: bool) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

// ============================================================================
// Auth state
// ============================================================================

/// Sign-in state as reported by the auth provider
#[derive(Clone, Default)]
pub enum AuthState {
    /// No auth-state callback has fired yet
    #[default]
    Unresolved,
    SignedOut,
    SignedIn(Arc<dyn IdentityProvider>),
}

impl AuthState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AuthState::Unresolved)
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Unresolved => f.write_str("Unresolved"),
            AuthState::SignedOut => f.write_str("SignedOut"),
            AuthState::SignedIn(_) => f.write_str("SignedIn"),
        }
    }
}

/// Create a connected publisher/listener pair starting in [`AuthState::Unresolved`]
pub fn auth_state_channel() -> (AuthStatePublisher, AuthStateListener) {
    let (tx, rx) = watch::channel(AuthState::Unresolved);
    (AuthStatePublisher { tx }, AuthStateListener { rx })
}

/// Side of the channel driven by the auth provider's state callback
#[derive(Debug)]
pub struct AuthStatePublisher {
    tx: watch::Sender<AuthState>,
}

impl AuthStatePublisher {
    pub fn publish(&self, state: AuthState) {
        debug!(?state, "Auth state changed");
        self.tx.send_replace(state);
    }

    pub fn sign_in(&self, provider: Arc<dyn IdentityProvider>) {
        self.publish(AuthState::SignedIn(provider));
    }

    pub fn sign_out(&self) {
        self.publish(AuthState::SignedOut);
    }

    pub fn listener(&self) -> AuthStateListener {
        AuthStateListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Identity provider that follows the published auth state.
///
/// Until the first state is published, token requests wait for it.
#[derive(Debug, Clone)]
pub struct AuthStateListener {
    rx: watch::Receiver<AuthState>,
}

impl AuthStateListener {
    /// Latest published state without waiting
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Wait until the sign-in state is known
    pub async fn resolved(&self) -> Result<AuthState> {
        let mut rx = self.rx.clone();
        let guard = rx.wait_for(AuthState::is_resolved).await.map_err(|_| {
            Error::TokenAcquisition(
                "auth state publisher closed before the sign-in state was known".to_string(),
            )
        })?;
        let state = (*guard).clone();
        drop(guard);
        Ok(state)
    }
}

#[async_trait]
impl IdentityProvider for AuthStateListener {
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>> {
        match self.resolved().await? {
            AuthState::SignedIn(provider) => provider.id_token(force_refresh).await,
            AuthState::SignedOut | AuthState::Unresolved => Ok(None),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything the bridge reads per request
#[derive(Clone)]
pub struct Session {
    identity: Arc<dyn IdentityProvider>,
    cookies: Arc<dyn CookieStore>,
}

impl Session {
    pub fn new(identity: Arc<dyn IdentityProvider>, cookies: Arc<dyn CookieStore>) -> Self {
        Self { identity, cookies }
    }

    /// Signed-out session over the given cookies
    pub fn anonymous(cookies: Arc<dyn CookieStore>) -> Self {
        Self::new(Arc::new(StaticIdentity::anonymous()), cookies)
    }

    /// Session with a fixed token and a single CSRF cookie
    pub fn with_token(token: impl Into<String>, csrf_cookie: &str, csrf_token: &str) -> Self {
        let jar = CookieJar::new();
        jar.set(csrf_cookie, csrf_token);
        Self::new(Arc::new(StaticIdentity::new(token)), Arc::new(jar))
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub fn cookies(&self) -> &Arc<dyn CookieStore> {
        &self.cookies
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
