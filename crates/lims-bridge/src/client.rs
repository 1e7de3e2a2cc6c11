//! Authenticated request bridge

use crate::config::BridgeConfig;
use crate::csrf::read_csrf_token;
use crate::error::{Error, Result};
use crate::request::{RequestDescriptor, RequestOptions};
use crate::response::{BridgeResponse, RawResponse};
use crate::session::Session;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Header carrying the CSRF token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Credentialed access to the console backend.
///
/// Every call re-reads the identity token and the CSRF cookie from the
/// session and performs exactly one HTTP attempt.
#[derive(Debug, Clone)]
pub struct Bridge {
    config: Arc<BridgeConfig>,
    session: Session,
    http_client: reqwest::Client,
}

impl Bridge {
    pub fn new(config: BridgeConfig, session: Session) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self::with_http_client(config, session, http_client))
    }

    /// Use an existing HTTP client (shared connection pool)
    pub fn with_http_client(
        config: BridgeConfig,
        session: Session,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config: Arc::new(config),
            session,
            http_client,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Acquire the current identity token and perform the request.
    ///
    /// A provider failure is returned as [`Error::TokenAcquisition`] and no
    /// request is sent. A signed-out session sends an empty bearer token.
    pub async fn auth_request(&self, descriptor: RequestDescriptor) -> Result<BridgeResponse> {
        let token = self
            .session
            .identity()
            .id_token(false)
            .await
            .map_err(|e| match e {
                Error::TokenAcquisition(_) => e,
                other => Error::TokenAcquisition(other.to_string()),
            })
            .inspect_err(|e| {
                warn!(endpoint = %descriptor.endpoint, error = %e, "Identity token unavailable");
            })?;

        self.api_request(descriptor, token.as_deref()).await
    }

    /// Perform the request with an explicit token.
    pub async fn api_request(
        &self,
        descriptor: RequestDescriptor,
        token: Option<&str>,
    ) -> Result<BridgeResponse> {
        let request = self.build_request(&descriptor, token)?;
        let want_raw = descriptor.options.file;

        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            url = %request.url(),
        );

        async move {
            debug!("Sending request");
            let response = self.http_client.execute(request).await.inspect_err(|e| {
                warn!(error = %e, "Request failed before a response arrived");
            })?;

            let raw = RawResponse::read(response).await?;
            debug!(status = %raw.status, bytes = raw.body.len(), "Response received");

            let response = BridgeResponse::from_raw(raw, want_raw);
            if !want_raw && !response.is_json() {
                debug!("Response body is not JSON, returning it raw");
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    /// Build the HTTP request without sending it.
    ///
    /// Fails with [`Error::MissingCsrfToken`] when the CSRF cookie is not set.
    pub fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<reqwest::Request> {
        let csrf = read_csrf_token(&**self.session.cookies(), &self.config.csrf_cookie_name)
            .inspect_err(|_| {
                warn!(
                    endpoint = %descriptor.endpoint,
                    cookie = %self.config.csrf_cookie_name,
                    "CSRF cookie missing, request not sent"
                );
            })?;

        let url = descriptor.resolve_url(&self.config.origin)?;
        let method = descriptor.method();

        let bearer = format!("Bearer {}", token.unwrap_or_default());
        let authorization = HeaderValue::from_str(&bearer).map_err(|_| {
            Error::TokenAcquisition("identity token is not a valid header value".into())
        })?;
        let csrf = HeaderValue::from_str(&csrf)
            .map_err(|_| Error::Config("CSRF cookie is not a valid header value".into()))?;

        let mut builder = self
            .http_client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, authorization)
            .header(CSRF_HEADER, csrf);

        if let Some(body) = descriptor.body()? {
            builder = builder.body(body);
        }

        Ok(builder.build()?)
    }

    // ------------------------------------------------------------------------
    // Convenience wrappers
    // ------------------------------------------------------------------------

    pub async fn get(&self, endpoint: &str) -> Result<BridgeResponse> {
        self.auth_request(RequestDescriptor::new(endpoint)).await
    }

    pub async fn post<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<BridgeResponse> {
        self.auth_request(RequestDescriptor::new(endpoint).with_json(payload)?)
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<BridgeResponse> {
        self.auth_request(
            RequestDescriptor::new(endpoint).with_options(RequestOptions::new().delete()),
        )
        .await
    }

    /// Download a file; non-2xx statuses become errors
    pub async fn download(&self, endpoint: &str) -> Result<RawResponse> {
        let descriptor =
            RequestDescriptor::new(endpoint).with_options(RequestOptions::new().file());
        match self.auth_request(descriptor).await? {
            BridgeResponse::Raw(raw) => raw.error_for_status(),
            BridgeResponse::Json(_) => Err(Error::Other(
                "file request unexpectedly returned parsed JSON".into(),
            )),
        }
    }

    /// Perform the request and unwrap the envelope's `data`.
    ///
    /// `success: false` becomes [`Error::Application`] with the server message.
    pub async fn call<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<Option<T>> {
        let envelope = self.auth_request(descriptor).await?.into_envelope::<T>()?;
        Ok(envelope.into_data()?)
    }
}
