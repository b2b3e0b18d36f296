//! Record/replay storage boundary.

use async_trait::async_trait;
use bulwark_core::{Method, Response, TransportRequest};
use bulwark_error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What identifies a request for replay purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct RequestSignature {
    /// HTTP method
    method: Method,
    /// Fully formatted URL
    url: String,
    /// Request body, if any
    #[serde(default, with = "optional_body")]
    body: Option<Vec<u8>>,
}

impl RequestSignature {
    /// Creates a signature.
    pub fn new(method: Method, url: impl Into<String>, body: Option<Vec<u8>>) -> Self {
        Self {
            method,
            url: url.into(),
            body,
        }
    }
}

impl From<&TransportRequest> for RequestSignature {
    fn from(request: &TransportRequest) -> Self {
        Self::new(*request.method(), request.url().clone(), request.body().clone())
    }
}

/// A stored response along with the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Recording {
    /// Request identity
    signature: RequestSignature,
    /// The recorded response
    response: Response,
    /// When the response was stored
    recorded_at: DateTime<Utc>,
}

impl Recording {
    /// Creates a recording stamped with the current time.
    pub fn new(signature: RequestSignature, response: Response) -> Self {
        Self::at(signature, response, Utc::now())
    }

    /// Creates a recording with an explicit timestamp.
    pub fn at(signature: RequestSignature, response: Response, recorded_at: DateTime<Utc>) -> Self {
        Self {
            signature,
            response,
            recorded_at,
        }
    }

    /// Consumes the recording, yielding the response.
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Opaque reference to a stored recording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingHandle(pub String);

impl std::fmt::Display for RecordingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persists responses and serves them back by request signature.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Stores a recording, replacing any earlier one for the same signature.
    async fn record(&self, recording: &Recording) -> Result<RecordingHandle, StorageError>;

    /// Finds the newest recording for `signature`.
    ///
    /// Recordings older than `discard_before` are ignored.
    async fn find(
        &self,
        signature: &RequestSignature,
        discard_before: Option<DateTime<Utc>>,
    ) -> Result<Option<RecordingHandle>, StorageError>;

    /// Loads a recording by handle.
    async fn load(&self, handle: &RecordingHandle) -> Result<Recording, StorageError>;

    /// Store name for logging.
    fn name(&self) -> &str {
        "recording-store"
    }
}

mod optional_body {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
