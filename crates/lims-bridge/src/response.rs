//! Response normalization

use crate::error::{Error, Result};
use bytes::Bytes;
use lims_common::Envelope;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Un-parsed response, returned for file downloads and non-JSON bodies
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub body: Bytes,
}

impl RawResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Map a non-2xx status onto the error taxonomy
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }

        if self.status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = self
                .headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Error::RateLimited { retry_after });
        }

        Err(Error::from_status(self.status, self.text()))
    }
}

/// What a bridged call resolves to
#[derive(Debug, Clone)]
pub enum BridgeResponse {
    /// Body parsed as JSON, normally the `{success, data, message}` envelope
    Json(Value),
    /// File download or a body that is not JSON
    Raw(RawResponse),
}

impl BridgeResponse {
    /// Parse `raw` as JSON unless the caller asked for the raw response.
    ///
    /// A body that fails to parse is returned raw instead of raising.
    pub(crate) fn from_raw(raw: RawResponse, want_raw: bool) -> Self {
        if want_raw {
            return BridgeResponse::Raw(raw);
        }
        match serde_json::from_slice(&raw.body) {
            Ok(value) => BridgeResponse::Json(value),
            Err(_) => BridgeResponse::Raw(raw),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, BridgeResponse::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BridgeResponse::Json(value) => Some(value),
            BridgeResponse::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            BridgeResponse::Json(value) => Some(value),
            BridgeResponse::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<RawResponse> {
        match self {
            BridgeResponse::Raw(raw) => Some(raw),
            BridgeResponse::Json(_) => None,
        }
    }

    /// Decode the body as an envelope with typed `data`.
    ///
    /// A raw response becomes an error built from its status, since there is
    /// no envelope to read.
    pub fn into_envelope<T: DeserializeOwned>(self) -> Result<Envelope<T>> {
        match self {
            BridgeResponse::Json(value) => Ok(serde_json::from_value(value)?),
            BridgeResponse::Raw(raw) => {
                let status = raw.status;
                let raw = raw.error_for_status()?;
                Err(Error::Other(format!(
                    "expected a JSON envelope, got {} ({})",
                    status,
                    raw.content_type().unwrap_or("no content type")
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            url: Url::parse("https://console.example.com/api/x").unwrap(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_json_body_is_parsed() {
        let response = BridgeResponse::from_raw(raw(200, r#"{"success":true,"data":1}"#), false);
        assert_eq!(response.as_json(), Some(&json!({"success": true, "data": 1})));
    }

    #[test]
    fn test_file_mode_skips_parsing() {
        let response = BridgeResponse::from_raw(raw(200, r#"{"success":true}"#), true);
        let raw = response.into_raw().unwrap();
        assert_eq!(raw.text(), r#"{"success":true}"#);
    }

    #[test]
    fn test_invalid_json_falls_back_to_raw() {
        let response = BridgeResponse::from_raw(raw(502, "<html>Bad gateway</html>"), false);
        assert!(!response.is_json());
        assert_eq!(response.into_raw().unwrap().status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_empty_body_is_raw() {
        let response = BridgeResponse::from_raw(raw(204, ""), false);
        assert!(response.into_raw().is_some());
    }

    #[test]
    fn test_error_for_status() {
        assert!(raw(200, "").error_for_status().is_ok());
        assert!(matches!(
            raw(404, "missing").error_for_status(),
            Err(Error::NotFound(ref m)) if m == "missing"
        ));

        let mut limited = raw(429, "");
        limited
            .headers
            .insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert!(matches!(
            limited.error_for_status(),
            Err(Error::RateLimited { retry_after: Some(d) }) if d == Duration::from_secs(12)
        ));
    }

    #[test]
    fn test_into_envelope() {
        let response = BridgeResponse::Json(json!({"success": true, "data": ["S1", "S2"]}));
        let envelope: Envelope<Vec<String>> = response.into_envelope().unwrap();
        assert_eq!(envelope.data.unwrap(), vec!["S1", "S2"]);

        let server_error = BridgeResponse::Raw(raw(500, "boom"));
        assert!(matches!(
            server_error.into_envelope::<Value>(),
            Err(Error::Server(_))
        ));

        let html = BridgeResponse::Raw(raw(200, "<html></html>"));
        assert!(matches!(html.into_envelope::<Value>(), Err(Error::Other(_))));
    }
}
