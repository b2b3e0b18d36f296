//! The request orchestrator.
//!
//! An [`Engine`] owns the state shared by every call site: the rate tracker,
//! the throttle waiters, the concurrency groups, the sinks and the hooks.
//! Each logical call runs through the same sequence:
//!
//! 1. build the [`EndpointContext`] and acquire a concurrency slot
//! 2. run before-hooks, throttle, dispatch (or replay), run after-hooks
//! 3. emit a dispatch event and validate the response
//! 4. on rejection, drive the retry loop, repeating step 2 and 3
//! 5. settle the final failure according to the retry behavior

use crate::config::ResolvedConfig;
use crate::replay::ReplaySettings;
use crate::retry::{RetryState, should_retry};
use bulwark_core::{
    Behavior, EndpointContext, RequestSpec, Response, RetryPolicy, TransportRequest,
    anchored_regex,
};
use bulwark_error::{
    BuilderError, BuilderErrorKind, BulwarkError, BulwarkResult, ConfigError, ConfigErrorKind,
    MappingErrorKind, RejectionError, RetryExhaustedError, StorageError, TransportError,
    TransportErrorKind,
};
use bulwark_interface::{
    AttemptOutcome, DispatchEvent, FanoutSink, Hook, Recording, RequestSignature, ResultMapper,
    RetryEvent, RetryPhase, RetrySnapshot, Sink, Transport,
};
use bulwark_rate_limit::{ConcurrencyLimiter, DEFAULT_POLL_INTERVAL, RateTracker, ThrottleEngine};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

/// Engine-wide knobs.
///
/// # Examples
///
/// ```
/// use bulwark::EngineSettingsBuilder;
/// use std::time::Duration;
///
/// let settings = EngineSettingsBuilder::default()
///     .poll_interval(Duration::from_millis(10))
///     .build()
///     .unwrap();
/// assert!(settings.replay().is_none());
/// ```
#[derive(Debug, Clone, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct EngineSettings {
    /// Sleep between capacity checks while a concurrency group is full
    #[builder(default = "DEFAULT_POLL_INTERVAL")]
    poll_interval: Duration,
    /// Record/replay behavior, off when `None`
    #[builder(default, setter(strip_option))]
    replay: Option<ReplaySettings>,
}

impl EngineSettingsBuilder {
    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns error if the poll interval is zero.
    pub fn build(&self) -> Result<EngineSettings, BuilderError> {
        let settings = self.build_internal().map_err(|e| e.to_string())?;
        if settings.poll_interval.is_zero() {
            return Err(BuilderError::new(BuilderErrorKind::ZeroPollInterval));
        }
        Ok(settings)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            replay: None,
        }
    }
}

/// Where the response of one attempt comes from.
enum Source {
    Live,
    Replayed(Response),
    Missing(TransportError),
}

/// Coordinates throttling, concurrency, dispatch, validation and retries.
///
/// Engines are meant to be shared: wrap one in an `Arc` and hand it to every
/// [`Client`](crate::Client) that should obey the same limits.
///
/// # Examples
///
/// ```no_run
/// use bulwark::{ClientConfig, Engine, EngineSettings, ReqwestTransport};
/// use bulwark_core::{Method, RequestSpec};
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new(Arc::new(ReqwestTransport::new()), EngineSettings::default());
/// let config = ClientConfig::default().resolve()?;
/// let spec = RequestSpec::new(Method::Get, "/pokemon/ditto");
///
/// let response = engine.execute("https://pokeapi.co/api/v2", &spec, &config).await?;
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    transport: Arc<dyn Transport>,
    tracker: Arc<RateTracker>,
    throttle: ThrottleEngine,
    limiter: ConcurrencyLimiter,
    sink: FanoutSink,
    hooks: Vec<Arc<dyn Hook>>,
    replay: Option<ReplaySettings>,
    records_made: AtomicU64,
    replays_made: AtomicU64,
}

impl Engine {
    /// Creates an engine with no sinks or hooks.
    pub fn new(transport: Arc<dyn Transport>, settings: EngineSettings) -> Self {
        let tracker = Arc::new(RateTracker::new());
        Self {
            transport,
            throttle: ThrottleEngine::new(tracker.clone()),
            tracker,
            limiter: ConcurrencyLimiter::with_poll_interval(settings.poll_interval),
            sink: FanoutSink::default(),
            hooks: Vec::new(),
            replay: settings.replay,
            records_made: AtomicU64::new(0),
            replays_made: AtomicU64::new(0),
        }
    }

    /// Adds an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink.push(sink);
        self
    }

    /// Adds a hook run around every dispatch.
    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Dispatch timestamps recorded so far.
    pub fn tracker(&self) -> &Arc<RateTracker> {
        &self.tracker
    }

    /// Concurrency groups.
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Responses persisted to the recording store.
    pub fn records_made(&self) -> u64 {
        self.records_made.load(Ordering::Relaxed)
    }

    /// Responses served from the recording store.
    pub fn replays_made(&self) -> u64 {
        self.replays_made.load(Ordering::Relaxed)
    }

    /// Observed dispatch rate for URLs matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns error if `pattern` is not a valid regular expression.
    pub fn requests_per_second(&self, pattern: &str) -> Result<f64, ConfigError> {
        let regex = anchored_regex(pattern).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Invalid(format!(
                "invalid rate pattern {pattern:?}: {e}"
            )))
        })?;
        Ok(self.tracker.rate_per_second(|url| regex.is_match(url)))
    }

    /// Runs one logical call.
    ///
    /// Returns `Ok(None)` when the call failed but the retry behavior is
    /// [`Behavior::Pass`].
    ///
    /// # Errors
    ///
    /// Returns the final rejection, transport failure or retry exhaustion
    /// under [`Behavior::Break`], and a configuration error when the
    /// endpoint cannot be formatted.
    #[instrument(skip_all, fields(method = %spec.method(), endpoint = %spec.endpoint()))]
    pub async fn execute(
        &self,
        base_url: &str,
        spec: &RequestSpec,
        config: &ResolvedConfig,
    ) -> BulwarkResult<Option<Response>> {
        let ctx = EndpointContext::new(*spec.method(), base_url, spec.endpoint(), spec.args().clone())
            .map_err(|e| ConfigError::new(ConfigErrorKind::Endpoint(e)))?;

        let _slot = match config.concurrency_for(ctx.unformatted_url()) {
            Some(limit) => Some(self.limiter.acquire(limit, &ctx, &self.sink).await),
            None => None,
        };

        let failure = match self.attempt(&ctx, spec, config, None).await {
            Ok(response) => return Ok(Some(response)),
            Err(failure) => failure,
        };

        let result = match config.retry() {
            Some(policy) if should_retry(policy, &failure) => {
                self.retry(&ctx, spec, config, policy, failure).await
            }
            _ => Err(failure),
        };

        match result {
            Ok(response) => Ok(Some(response)),
            Err(failure) => settle(&ctx, config.behavior(), failure),
        }
    }

    /// Runs one logical call and maps the accepted response.
    ///
    /// A mapper failure declared by the caller always propagates. Any other
    /// mapper failure follows the retry behavior.
    ///
    /// # Errors
    ///
    /// Everything [`Engine::execute`] returns, plus mapping failures.
    pub async fn execute_mapped<T>(
        &self,
        base_url: &str,
        spec: &RequestSpec,
        config: &ResolvedConfig,
        mapper: &dyn ResultMapper<T>,
    ) -> BulwarkResult<Option<T>> {
        let Some(response) = self.execute(base_url, spec, config).await? else {
            return Ok(None);
        };
        match mapper.map(&response) {
            Ok(value) => Ok(value),
            Err(err) if matches!(err.kind(), MappingErrorKind::Declared { .. }) => Err(err.into()),
            Err(err) => match config.behavior() {
                Behavior::Break => Err(err.into()),
                Behavior::Pass => {
                    warn!(url = %response.url(), error = %err, "Mapping failed, passing");
                    Ok(None)
                }
            },
        }
    }

    async fn retry(
        &self,
        ctx: &EndpointContext,
        spec: &RequestSpec,
        config: &ResolvedConfig,
        policy: &RetryPolicy,
        first: BulwarkError,
    ) -> Result<Response, BulwarkError> {
        let mut state = RetryState::new(policy.clone());
        state.record_failure(&first);
        let mut last = first;

        loop {
            let delay = state.increment(last.status());
            let snapshot = state.snapshot();

            if !state.can_retry() {
                self.sink.on_retry(&RetryEvent {
                    context: ctx,
                    snapshot: &snapshot,
                    phase: RetryPhase::Exhausted,
                });
                return Err(RetryExhaustedError::new(
                    ctx.url().clone(),
                    state.dispatches(),
                    *policy.max_attempts(),
                    state.cause(),
                    last,
                )
                .into());
            }

            self.sink.on_retry(&RetryEvent {
                context: ctx,
                snapshot: &snapshot,
                phase: RetryPhase::BeforeRetry,
            });
            tokio::time::sleep(delay).await;

            state.record_dispatch();
            match self.attempt(ctx, spec, config, Some(&snapshot)).await {
                Ok(response) => {
                    state.record_success(*response.status());
                    self.sink.on_retry(&RetryEvent {
                        context: ctx,
                        snapshot: &state.snapshot(),
                        phase: RetryPhase::Succeeded,
                    });
                    return Ok(response);
                }
                Err(failure) => {
                    state.record_failure(&failure);
                    if !should_retry(policy, &failure) {
                        debug!(cause = %state.cause(), "Rejection is not retryable, stopping");
                        return Err(failure);
                    }
                    last = failure;
                }
            }
        }
    }

    /// One dispatch: hooks, throttle, transport or replay, event, validation.
    async fn attempt(
        &self,
        ctx: &EndpointContext,
        spec: &RequestSpec,
        config: &ResolvedConfig,
        retry: Option<&RetrySnapshot>,
    ) -> Result<Response, BulwarkError> {
        let request = TransportRequest::new(
            *spec.method(),
            ctx.url().clone(),
            spec.headers().clone(),
            spec.body().clone(),
            *config.timeout(),
        );
        let source = self.lookup(&request).await;

        for hook in &self.hooks {
            if let Err(e) = hook.before(ctx).await {
                warn!(hook = hook.name(), error = %e, "Before hook failed");
            }
        }

        let throttled = match &source {
            Source::Live => true,
            Source::Replayed(_) => !self
                .replay
                .as_ref()
                .is_some_and(|replay| *replay.disable_throttling()),
            Source::Missing(_) => false,
        };
        if throttled {
            self.throttle.throttle(config.throttle(), ctx, &self.sink).await;
        }

        let started = Instant::now();
        let result = match source {
            Source::Live => {
                let result = self.dispatch(&request).await;
                if let Ok(response) = &result {
                    self.store(&request, response).await;
                }
                result
            }
            Source::Replayed(response) => Ok(response),
            Source::Missing(err) => Err(err),
        };
        let elapsed = started.elapsed();

        let outcome = AttemptOutcome::from(result);
        for hook in &self.hooks {
            if let Err(e) = hook.after(ctx, &outcome, retry).await {
                warn!(hook = hook.name(), error = %e, "After hook failed");
            }
        }
        self.sink.on_dispatch(&DispatchEvent {
            context: ctx,
            outcome: &outcome,
            retry,
            timestamp: Utc::now(),
            elapsed,
        });

        match outcome {
            AttemptOutcome::Response(response) => validate(config, response),
            AttemptOutcome::Failed(err) => Err(err.into()),
        }
    }

    async fn dispatch(&self, request: &TransportRequest) -> Result<Response, TransportError> {
        let started = Instant::now();
        let result = match request.timeout() {
            Some(limit) => tokio::time::timeout(*limit, self.transport.dispatch(request))
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::new(TransportErrorKind::Timeout(
                        limit.as_millis() as u64,
                    )))
                }),
            None => self.transport.dispatch(request).await,
        };
        result.map(|response| response.with_elapsed(started.elapsed()))
    }

    async fn lookup(&self, request: &TransportRequest) -> Source {
        let Some(replay) = self.replay.as_ref().filter(|replay| replay.mode().replays()) else {
            return Source::Live;
        };
        let signature = RequestSignature::from(request);
        let found = match find_recording(replay, &signature).await {
            Ok(found) => found,
            Err(e) => {
                warn!(url = %request.url(), error = %e, "Recording lookup failed");
                None
            }
        };

        match found {
            Some(response) => {
                self.replays_made.fetch_add(1, Ordering::Relaxed);
                debug!(url = %request.url(), status = *response.status(), "Replaying recorded response");
                Source::Replayed(response.with_replayed(true))
            }
            None if replay.mode().records() => Source::Live,
            None => Source::Missing(TransportError::new(TransportErrorKind::ReplayMissing(
                request.url().clone(),
            ))),
        }
    }

    async fn store(&self, request: &TransportRequest, response: &Response) {
        let Some(replay) = self.replay.as_ref().filter(|replay| replay.mode().records()) else {
            return;
        };
        let recording = Recording::new(RequestSignature::from(request), response.clone());
        match replay.store().record(&recording).await {
            Ok(handle) => {
                self.records_made.fetch_add(1, Ordering::Relaxed);
                debug!(url = %request.url(), handle = %handle, "Recorded response");
            }
            Err(e) => warn!(url = %request.url(), error = %e, "Failed to record response"),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("transport", &self.transport.name())
            .field("tracker", &self.tracker)
            .field("limiter", &self.limiter)
            .field("sink", &self.sink)
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .field("replay", &self.replay)
            .finish()
    }
}

async fn find_recording(
    replay: &ReplaySettings,
    signature: &RequestSignature,
) -> Result<Option<Response>, StorageError> {
    let Some(handle) = replay.store().find(signature, *replay.discard_before()).await? else {
        return Ok(None);
    };
    let response = replay.store().load(&handle).await?.into_response();
    if *replay.discard_bad_responses() && !response.is_success() {
        debug!(status = *response.status(), "Discarding recorded non-success response");
        return Ok(None);
    }
    Ok(Some(response))
}

/// Runs validators in order; the first rejection wins.
fn validate(config: &ResolvedConfig, response: Response) -> Result<Response, BulwarkError> {
    for validator in config.validators() {
        if let Err(kind) = validator.check(&response) {
            return Err(RejectionError::new(kind, validator.name(), response).into());
        }
    }
    Ok(response)
}

fn settle(
    ctx: &EndpointContext,
    behavior: Behavior,
    failure: BulwarkError,
) -> BulwarkResult<Option<Response>> {
    match behavior {
        Behavior::Break => {
            error!(url = %ctx.url(), error = %failure, "Request failed");
            Err(failure)
        }
        Behavior::Pass => {
            warn!(url = %ctx.url(), error = %failure, "Request failed, passing");
            Ok(None)
        }
    }
}
