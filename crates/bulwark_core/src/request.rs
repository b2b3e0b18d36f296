//! Caller-facing request description and the wire request handed to transports.

use crate::Method;
use std::collections::BTreeMap;
use std::time::Duration;

/// One logical call as described by the caller.
///
/// # Examples
///
/// ```
/// use bulwark_core::{Method, RequestSpecBuilder};
///
/// let spec = RequestSpecBuilder::default()
///     .method(Method::Get)
///     .endpoint("/pokemon/{NAME}")
///     .arg("NAME", "pikachu")
///     .build()
///     .unwrap();
///
/// assert_eq!(spec.args().get("NAME").map(String::as_str), Some("pikachu"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct RequestSpec {
    /// HTTP method
    #[builder(default)]
    method: Method,
    /// Endpoint template relative to the base URL
    endpoint: String,
    /// Placeholder values
    #[builder(default, setter(custom))]
    args: BTreeMap<String, String>,
    /// Extra request headers
    #[builder(default, setter(custom))]
    headers: BTreeMap<String, String>,
    /// Request body
    #[builder(default, setter(strip_option))]
    body: Option<Vec<u8>>,
}

impl RequestSpecBuilder {
    /// Adds one placeholder value.
    pub fn arg(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.args
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Adds one header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Builds the spec.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is missing.
    pub fn build(&self) -> Result<RequestSpec, String> {
        self.build_internal().map_err(|e| e.to_string())
    }
}

impl RequestSpec {
    /// Shorthand for a body-less call with no arguments.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            args: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Copy with one placeholder value set.
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// Concrete request handed to a transport for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct TransportRequest {
    /// HTTP method
    method: Method,
    /// Fully formatted URL
    url: String,
    /// Request headers
    headers: BTreeMap<String, String>,
    /// Optional body
    body: Option<Vec<u8>>,
    /// Per-attempt timeout, when configured
    timeout: Option<Duration>,
}

impl TransportRequest {
    /// Creates a wire request.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        body: Option<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
            body,
            timeout,
        }
    }
}
