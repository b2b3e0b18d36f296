//! Caller-facing client bound to a base URL.

use crate::config::{ClientConfig, FileConfig, ResolvedConfig};
use crate::engine::Engine;
use bulwark_core::{Method, RequestSpec, RequestSpecBuilder, Response};
use bulwark_error::{BulwarkResult, ConfigError, ConfigErrorKind};
use bulwark_interface::ResultMapper;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A base URL plus a base configuration layer, sharing an [`Engine`].
///
/// Per-call overrides are merged over the base layer and resolved before
/// anything is dispatched. Sub-clients made with [`Client::namespace`] share
/// the same engine, so their calls count toward the same throttle rules and
/// concurrency groups.
///
/// # Examples
///
/// ```no_run
/// use bulwark::{Client, ClientConfig, Engine, EngineSettings, ReqwestTransport};
/// use bulwark_core::RetryPolicy;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Arc::new(Engine::new(
///     Arc::new(ReqwestTransport::new()),
///     EngineSettings::default(),
/// ));
/// let config = ClientConfig::default().with_retry(RetryPolicy::new(Duration::from_secs(1), 3));
/// let client = Client::new(engine, "https://pokeapi.co/api/v2", config)?;
///
/// let pokemon = client.namespace("/pokemon", ClientConfig::default())?;
/// if let Some(response) = pokemon.get("/ditto").await? {
///     println!("{}", response.text());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    engine: Arc<Engine>,
    base_url: String,
    base: ClientConfig,
    resolved: Arc<ResolvedConfig>,
}

impl Client {
    /// Creates a client, resolving `base` eagerly.
    ///
    /// # Errors
    ///
    /// Returns error if `base` does not resolve.
    #[instrument(skip(engine, base_url, base), fields(base_url = %base_url.as_ref()))]
    pub fn new(
        engine: Arc<Engine>,
        base_url: impl AsRef<str>,
        base: ClientConfig,
    ) -> Result<Self, ConfigError> {
        let resolved = Arc::new(base.resolve()?);
        debug!(config = ?resolved, "Created client");
        Ok(Self {
            engine,
            base_url: base_url.as_ref().to_string(),
            base,
            resolved,
        })
    }

    /// Creates a client from a file layer, which must name a base URL.
    ///
    /// # Errors
    ///
    /// Returns error if the file has no `base_url` or an invalid setting.
    pub fn from_file_config(engine: Arc<Engine>, file: &FileConfig) -> Result<Self, ConfigError> {
        let base_url = file.base_url.as_deref().ok_or_else(|| {
            ConfigError::new(ConfigErrorKind::Invalid(
                "configuration file has no base_url".to_string(),
            ))
        })?;
        Self::new(engine, base_url, file.to_client_config()?)
    }

    /// A client for `{base_url}{prefix}` sharing this client's engine.
    ///
    /// The sub-client's base layer is this client's base layer merged with
    /// `over`.
    ///
    /// # Errors
    ///
    /// Returns error if the merged layer does not resolve.
    pub fn namespace(&self, prefix: &str, over: ClientConfig) -> Result<Self, ConfigError> {
        Self::new(
            self.engine.clone(),
            format!("{}{}", self.base_url, prefix),
            ClientConfig::merge(&self.base, &over),
        )
    }

    /// Shared engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Base URL, including any namespace prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base configuration layer.
    pub fn config(&self) -> &ClientConfig {
        &self.base
    }

    fn resolve(&self, over: Option<&ClientConfig>) -> Result<Arc<ResolvedConfig>, ConfigError> {
        match over {
            Some(over) => Ok(Arc::new(ClientConfig::merge(&self.base, over).resolve()?)),
            None => Ok(self.resolved.clone()),
        }
    }

    /// Runs `spec` with the base configuration.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn request(&self, spec: &RequestSpec) -> BulwarkResult<Option<Response>> {
        self.engine
            .execute(&self.base_url, spec, &self.resolved)
            .await
    }

    /// Runs `spec` with `over` merged over the base configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before dispatching when the merged
    /// layer is invalid; otherwise see [`Engine::execute`].
    pub async fn request_with(
        &self,
        spec: &RequestSpec,
        over: &ClientConfig,
    ) -> BulwarkResult<Option<Response>> {
        let config = self.resolve(Some(over))?;
        self.engine.execute(&self.base_url, spec, &config).await
    }

    /// Runs `spec` and maps the accepted response.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute_mapped`].
    pub async fn request_mapped<T>(
        &self,
        spec: &RequestSpec,
        over: Option<&ClientConfig>,
        mapper: &dyn ResultMapper<T>,
    ) -> BulwarkResult<Option<T>> {
        let config = self.resolve(over)?;
        self.engine
            .execute_mapped(&self.base_url, spec, &config, mapper)
            .await
    }

    /// `GET` an endpoint without arguments.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn get(&self, endpoint: &str) -> BulwarkResult<Option<Response>> {
        self.request(&RequestSpec::new(Method::Get, endpoint)).await
    }

    /// `DELETE` an endpoint without arguments.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn delete(&self, endpoint: &str) -> BulwarkResult<Option<Response>> {
        self.request(&RequestSpec::new(Method::Delete, endpoint)).await
    }

    /// `POST` a body.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn post(
        &self,
        endpoint: &str,
        body: impl Into<Vec<u8>>,
    ) -> BulwarkResult<Option<Response>> {
        self.send_body(Method::Post, endpoint, body.into()).await
    }

    /// `PUT` a body.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn put(
        &self,
        endpoint: &str,
        body: impl Into<Vec<u8>>,
    ) -> BulwarkResult<Option<Response>> {
        self.send_body(Method::Put, endpoint, body.into()).await
    }

    /// `PATCH` a body.
    ///
    /// # Errors
    ///
    /// See [`Engine::execute`].
    pub async fn patch(
        &self,
        endpoint: &str,
        body: impl Into<Vec<u8>>,
    ) -> BulwarkResult<Option<Response>> {
        self.send_body(Method::Patch, endpoint, body.into()).await
    }

    async fn send_body(
        &self,
        method: Method,
        endpoint: &str,
        body: Vec<u8>,
    ) -> BulwarkResult<Option<Response>> {
        let spec = RequestSpecBuilder::default()
            .method(method)
            .endpoint(endpoint)
            .body(body)
            .build()
            .map_err(bulwark_error::BuilderError::from)?;
        self.request(&spec).await
    }
}
