//! Sink that writes every event to `tracing`.

use bulwark_interface::{
    AttemptOutcome, ConcurrencyEvent, ConcurrencyPhase, DispatchEvent, RetryEvent, RetryPhase,
    Sink, ThrottleEvent, ThrottlePhase,
};
use tracing::{debug, error, info, warn};

/// Logs dispatches, throttle waits, concurrency transitions and retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn on_dispatch(&self, event: &DispatchEvent<'_>) {
        let ctx = event.context;
        let attempt = event.retry.map_or(0, |retry| *retry.attempt());
        match event.outcome {
            AttemptOutcome::Response(response) if response.is_success() => debug!(
                url = %ctx.url(),
                uurl = %ctx.unformatted_url(),
                method = %ctx.method(),
                status = *response.status(),
                attempt,
                elapsed_secs = event.elapsed.as_secs_f64(),
                replayed = *response.replayed(),
                "Request finished"
            ),
            AttemptOutcome::Response(response) => warn!(
                url = %ctx.url(),
                uurl = %ctx.unformatted_url(),
                method = %ctx.method(),
                status = *response.status(),
                attempt,
                elapsed_secs = event.elapsed.as_secs_f64(),
                replayed = *response.replayed(),
                "Request returned non-success status"
            ),
            AttemptOutcome::Failed(err) => warn!(
                url = %ctx.url(),
                uurl = %ctx.unformatted_url(),
                method = %ctx.method(),
                attempt,
                error = %err,
                "Request failed without a response"
            ),
        }
    }

    fn on_throttle(&self, event: &ThrottleEvent<'_>) {
        match event.phase {
            ThrottlePhase::LimitReached => info!(
                url = %event.context.url(),
                rule = %event.rule,
                current = event.current,
                wait_secs = event.wait.as_secs_f64(),
                "{} hit throttle limit, waiting",
                event.context.url()
            ),
            ThrottlePhase::WaitOver => info!(
                url = %event.context.url(),
                wait_secs = event.wait.as_secs_f64(),
                "Done waiting on throttle"
            ),
        }
    }

    fn on_concurrency(&self, event: &ConcurrencyEvent<'_>) {
        match event.phase {
            ConcurrencyPhase::Blocked => warn!(
                uurl = %event.context.unformatted_url(),
                group_key = %event.group_key,
                limit = event.limit,
                in_flight = event.in_flight,
                "Concurrency limit reached, blocking"
            ),
            ConcurrencyPhase::Freed => info!(
                uurl = %event.context.unformatted_url(),
                group_key = %event.group_key,
                limit = event.limit,
                in_flight = event.in_flight,
                "Concurrency limit freed"
            ),
        }
    }

    fn on_retry(&self, event: &RetryEvent<'_>) {
        let snapshot = event.snapshot;
        match event.phase {
            RetryPhase::BeforeRetry => info!(
                url = %event.context.url(),
                attempt = *snapshot.attempt(),
                max_attempts = *snapshot.max_attempts(),
                delay_secs = snapshot.delay().as_secs_f64(),
                cause = %snapshot.cause(),
                "Retrying request"
            ),
            RetryPhase::Succeeded => info!(
                url = %event.context.url(),
                attempt = *snapshot.attempt(),
                max_attempts = *snapshot.max_attempts(),
                "Retry succeeded"
            ),
            RetryPhase::Exhausted => error!(
                url = %event.context.url(),
                attempt = *snapshot.attempt(),
                max_attempts = *snapshot.max_attempts(),
                cause = %snapshot.cause(),
                "Retries exhausted"
            ),
        }
    }
}
