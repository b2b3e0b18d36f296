//! Sink that remembers what the engine reported.

use bulwark::{
    ConcurrencyEvent, ConcurrencyPhase, DispatchEvent, RetryEvent, RetryPhase, RetrySnapshot,
    Sink, ThrottleEvent, ThrottlePhase,
};
use std::sync::Mutex;

/// Records events for later assertions.
#[derive(Debug, Default)]
pub struct EventLog {
    retries: Mutex<Vec<(RetryPhase, RetrySnapshot)>>,
    dispatches: Mutex<Vec<(String, Option<u16>, bool)>>,
    throttles: Mutex<Vec<ThrottlePhase>>,
    concurrency: Mutex<Vec<ConcurrencyPhase>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry events in order.
    pub fn retries(&self) -> Vec<(RetryPhase, RetrySnapshot)> {
        self.retries.lock().unwrap().clone()
    }

    /// Retry phases in order.
    pub fn retry_phases(&self) -> Vec<RetryPhase> {
        self.retries().into_iter().map(|(phase, _)| phase).collect()
    }

    /// `(url, status, retried)` per dispatch.
    pub fn dispatches(&self) -> Vec<(String, Option<u16>, bool)> {
        self.dispatches.lock().unwrap().clone()
    }

    pub fn throttles(&self) -> Vec<ThrottlePhase> {
        self.throttles.lock().unwrap().clone()
    }

    pub fn concurrency(&self) -> Vec<ConcurrencyPhase> {
        self.concurrency.lock().unwrap().clone()
    }
}

impl Sink for EventLog {
    fn on_dispatch(&self, event: &DispatchEvent<'_>) {
        self.dispatches.lock().unwrap().push((
            event.context.url().clone(),
            event.outcome.status(),
            event.retry.is_some(),
        ));
    }

    fn on_throttle(&self, event: &ThrottleEvent<'_>) {
        self.throttles.lock().unwrap().push(event.phase);
    }

    fn on_concurrency(&self, event: &ConcurrencyEvent<'_>) {
        self.concurrency.lock().unwrap().push(event.phase);
    }

    fn on_retry(&self, event: &RetryEvent<'_>) {
        self.retries
            .lock()
            .unwrap()
            .push((event.phase, event.snapshot.clone()));
    }
}
