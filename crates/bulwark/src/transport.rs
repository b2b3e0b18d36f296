//! `reqwest`-backed transport.

use async_trait::async_trait;
use bulwark_core::{Response, TransportRequest};
use bulwark_error::{TransportError, TransportErrorKind};
use bulwark_interface::Transport;
use tracing::{debug, instrument};

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client, keeping its pool and TLS settings.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(err: &reqwest::Error, request: &TransportRequest) -> TransportError {
    let kind = if err.is_timeout() {
        let millis = request
            .timeout()
            .map_or(0, |timeout| timeout.as_millis() as u64);
        TransportErrorKind::Timeout(millis)
    } else if err.is_connect() {
        TransportErrorKind::Connect(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Io(err.to_string())
    } else {
        TransportErrorKind::Other(err.to_string())
    };
    TransportError::new(kind)
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    async fn dispatch(&self, request: &TransportRequest) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| TransportError::new(TransportErrorKind::Other(e.to_string())))?;

        let mut builder = self.client.request(method, request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(*timeout);
        }

        let reply = builder.send().await.map_err(|e| classify(&e, request))?;
        let status = reply.status().as_u16();
        let url = reply.url().to_string();
        let headers: Vec<(String, String)> = reply
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = reply.bytes().await.map_err(|e| classify(&e, request))?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(headers.into_iter().fold(
            Response::new(status, *request.method(), url).with_body(body.to_vec()),
            |response, (name, value)| response.with_header(name, value),
        ))
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}
