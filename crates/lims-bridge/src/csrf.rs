//! CSRF cookie access
//!
//! The backend session framework sets the CSRF token as a cookie on page load.
//! The bridge only ever reads it; [`CookieStore`] abstracts where cookies live
//! so the bridge can be driven without a browser.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;

/// Read-only view of the cookies visible to the console page
pub trait CookieStore: Send + Sync {
    /// Value of the named cookie, if set
    fn cookie(&self, name: &str) -> Option<String>;
}

/// In-memory cookie store seeded from a `document.cookie`-style string
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<IndexMap<String, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from a header such as `"sessionid=x; csrftoken=abc"`
    pub fn from_header(header: &str) -> Self {
        Self {
            cookies: RwLock::new(parse_cookie_header(header)),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.write().insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.cookies.write().shift_remove(name)
    }

    /// Merge every cookie of `header` into the jar, overwriting existing names
    pub fn extend_from_header(&self, header: &str) {
        self.cookies.write().extend(parse_cookie_header(header));
    }

    pub fn len(&self) -> usize {
        self.cookies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.read().is_empty()
    }
}

impl CookieStore for CookieJar {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }
}

/// Parse a cookie header into name/value pairs.
///
/// Pairs without `=` or with an empty name are skipped. Values are
/// percent-decoded; a value that does not decode is kept as written.
/// When a name repeats the first occurrence wins, matching how browsers
/// order the more specific path first.
pub fn parse_cookie_header(header: &str) -> IndexMap<String, String> {
    let mut cookies = IndexMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || cookies.contains_key(name) {
            continue;
        }

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        let decoded = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());

        cookies.insert(name.to_string(), decoded);
    }

    cookies
}

/// Read the CSRF token, failing when the cookie is absent or empty
pub fn read_csrf_token(store: &dyn CookieStore, name: &str) -> Result<String> {
    store
        .cookie(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::MissingCsrfToken {
            cookie: name.to_string(),
        })
}
