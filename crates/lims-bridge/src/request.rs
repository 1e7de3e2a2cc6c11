//! Request descriptors: endpoint, payload and options of a single bridged call

use crate::error::{Error, Result};
use indexmap::IndexMap;
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

/// Per-call options recognized by the bridge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Force HTTP DELETE regardless of payload
    pub delete: bool,

    /// Query parameters; when present they replace the endpoint's query string
    pub params: Option<IndexMap<String, String>>,

    /// Return the raw response instead of parsing JSON
    pub file: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    pub fn file(mut self) -> Self {
        self.file = true;
        self
    }

    /// Append one query parameter, keeping insertion order
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.to_string());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let map = self.params.get_or_insert_with(IndexMap::new);
        for (key, value) in params {
            map.insert(key.into(), value.to_string());
        }
        self
    }
}

/// Everything a call site supplies for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub payload: Option<Value>,
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: None,
            options: RequestOptions::default(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Serialize any value as the payload
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        Ok(self.with_payload(serde_json::to_value(payload)?))
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// The payload, treating JSON `null` as absent
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref().filter(|value| !value.is_null())
    }

    /// GET by default, POST with a payload, DELETE when forced
    pub fn method(&self) -> Method {
        select_method(self.payload().is_some(), self.options.delete)
    }

    /// Serialized request body, kept for DELETE requests that carry a payload
    pub fn body(&self) -> Result<Option<Vec<u8>>> {
        self.payload()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(Error::from)
    }

    /// Resolve the endpoint against `origin` and apply query parameters.
    ///
    /// Relative endpoints must stay on `origin`; scheme-relative forms such as
    /// `//host/path` are rejected with [`Error::InvalidUrl`].
    pub fn resolve_url(&self, origin: &Url) -> Result<Url> {
        let endpoint = self.endpoint.trim();
        let invalid = |reason: String| Error::InvalidUrl(format!("{}: {}", endpoint, reason));

        let mut url = if is_absolute(endpoint) {
            Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?
        } else {
            let joined = origin.join(endpoint).map_err(|e| invalid(e.to_string()))?;
            if joined.origin() != origin.origin() {
                return Err(invalid(format!(
                    "relative endpoint leaves origin {}",
                    origin.origin().ascii_serialization()
                )));
            }
            joined
        };

        if let Some(params) = &self.options.params {
            url.set_query(None);
            if !params.is_empty() {
                url.query_pairs_mut().extend_pairs(params.iter());
            }
        }

        Ok(url)
    }
}

pub fn select_method(has_payload: bool, delete: bool) -> Method {
    if delete {
        Method::DELETE
    } else if has_payload {
        Method::POST
    } else {
        Method::GET
    }
}

fn is_absolute(endpoint: &str) -> bool {
    let lower = endpoint.get(..8).unwrap_or(endpoint).to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}
