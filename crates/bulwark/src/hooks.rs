//! Built-in dispatch hooks.

use async_trait::async_trait;
use bulwark_core::EndpointContext;
use bulwark_error::HookError;
use bulwark_interface::{AttemptOutcome, Hook, RetrySnapshot};
use bulwark_rate_limit::parse_retry_after;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Which calls a `Retry-After` pause applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseScope {
    /// Only calls to the same unformatted URL
    #[default]
    Endpoint,
    /// Every call made through the engine
    Client,
}

/// Pauses calls after the server answers with `Retry-After`.
///
/// After a response with the configured status (429 by default) carrying a
/// `Retry-After` header, every later call in the same scope waits in
/// `before` until the requested time has passed.
#[derive(Debug)]
pub struct RetryAfterHook {
    scope: PauseScope,
    status: u16,
    max_pause: Option<Duration>,
    paused_until: Mutex<HashMap<String, Instant>>,
}

impl Default for RetryAfterHook {
    fn default() -> Self {
        Self::new(PauseScope::Endpoint)
    }
}

impl RetryAfterHook {
    /// Creates a hook reacting to 429 responses.
    pub fn new(scope: PauseScope) -> Self {
        Self {
            scope,
            status: 429,
            max_pause: None,
            paused_until: Mutex::new(HashMap::new()),
        }
    }

    /// Reacts to `status` instead of 429.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Caps how long a single header may pause calls.
    pub fn with_max_pause(mut self, max_pause: Duration) -> Self {
        self.max_pause = Some(max_pause);
        self
    }

    fn key(&self, context: &EndpointContext) -> String {
        match self.scope {
            PauseScope::Endpoint => context.unformatted_url().clone(),
            PauseScope::Client => "*".to_string(),
        }
    }

    /// Remaining pause for calls like `context`.
    pub fn remaining(&self, context: &EndpointContext) -> Duration {
        let paused = self
            .paused_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        paused
            .get(&self.key(context))
            .map_or(Duration::ZERO, |until| {
                until.saturating_duration_since(Instant::now())
            })
    }
}

#[async_trait]
impl Hook for RetryAfterHook {
    fn name(&self) -> &str {
        "retry_after"
    }

    async fn before(&self, context: &EndpointContext) -> Result<(), HookError> {
        loop {
            let wait = self.remaining(context);
            if wait.is_zero() {
                return Ok(());
            }
            debug!(
                uurl = %context.unformatted_url(),
                wait_secs = wait.as_secs_f64(),
                "Waiting for Retry-After pause"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn after(
        &self,
        context: &EndpointContext,
        outcome: &AttemptOutcome,
        _retry: Option<&RetrySnapshot>,
    ) -> Result<(), HookError> {
        let Some(response) = outcome.response() else {
            return Ok(());
        };
        if *response.status() != self.status {
            return Ok(());
        }
        let Some(header) = response.header("retry-after") else {
            return Ok(());
        };
        let pause = parse_retry_after(header, Utc::now())
            .ok_or_else(|| HookError::new(format!("Unparseable Retry-After header: {header}")))?;
        let pause = self.max_pause.map_or(pause, |cap| pause.min(cap));

        let until = Instant::now().checked_add(pause).ok_or_else(|| {
            HookError::new(format!("Retry-After pause out of range: {header}"))
        })?;
        let mut paused = self
            .paused_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = paused.entry(self.key(context)).or_insert(until);
        *slot = (*slot).max(until);

        info!(
            uurl = %context.unformatted_url(),
            pause_secs = pause.as_secs_f64(),
            "Server requested Retry-After pause"
        );
        Ok(())
    }
}
