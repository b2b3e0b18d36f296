//! Response type returned by transports and recorded by replay storage.

use crate::Method;
use crate::serde_helpers::{base64_bytes, duration_secs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A completed HTTP exchange as seen by the engine.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
///
/// # Examples
///
/// ```
/// use bulwark_core::{Method, Response};
///
/// let response = Response::new(404, Method::Get, "https://example.com/missing")
///     .with_header("Retry-After", "2");
///
/// assert!(!response.is_success());
/// assert_eq!(response.header("retry-after"), Some("2"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Response {
    /// Numeric status code
    status: u16,
    /// Method of the request that produced this response
    method: Method,
    /// Final URL of the request
    url: String,
    /// Lower-cased header map
    #[serde(default)]
    headers: BTreeMap<String, String>,
    /// Raw body bytes
    #[serde(default, with = "base64_bytes")]
    body: Vec<u8>,
    /// Time spent waiting on the transport
    #[serde(default, with = "duration_secs")]
    elapsed: Duration,
    /// Whether this response was served from a recording
    #[serde(default)]
    replayed: bool,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: u16, method: Method, url: impl Into<String>) -> Self {
        Self {
            status,
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
            elapsed: Duration::ZERO,
            replayed: false,
        }
    }

    /// Adds a header, lower-casing the name.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Records how long the transport took.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Marks the response as coming from a recording.
    pub fn with_replayed(mut self, replayed: bool) -> Self {
        self.replayed = replayed;
        self
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        crate::is_success(self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = Response::new(200, Method::Get, "http://x").with_header("Content-Type", "a");
        assert_eq!(response.header("content-type"), Some("a"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("a"));
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_serialized_body_survives_binary() {
        let response = Response::new(200, Method::Post, "http://x")
            .with_body(vec![0u8, 159, 146, 150])
            .with_elapsed(Duration::from_millis(250));
        let json = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back.body(), &vec![0u8, 159, 146, 150]);
        assert_eq!(*back.elapsed(), Duration::from_millis(250));
        assert!(!*back.replayed());
    }
}
