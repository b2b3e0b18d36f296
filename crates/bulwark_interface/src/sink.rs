//! Event consumers.

use crate::{ConcurrencyEvent, DispatchEvent, RetryEvent, ThrottleEvent};
use std::sync::Arc;

/// Receives tracking events.
///
/// Every method defaults to a no-op so a sink only implements what it needs.
/// Sinks are called inline on the request path and should return quickly.
pub trait Sink: Send + Sync {
    /// A dispatch finished.
    fn on_dispatch(&self, _event: &DispatchEvent<'_>) {}

    /// A throttle wait started or ended.
    fn on_throttle(&self, _event: &ThrottleEvent<'_>) {}

    /// A concurrency group blocked or freed.
    fn on_concurrency(&self, _event: &ConcurrencyEvent<'_>) {}

    /// The retry loop changed state.
    fn on_retry(&self, _event: &RetryEvent<'_>) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {}

/// Forwards each event to every inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    /// Creates a fan-out over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink.
    pub fn push(&mut self, sink: Arc<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// Number of inner sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True when there are no inner sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Sink for FanoutSink {
    fn on_dispatch(&self, event: &DispatchEvent<'_>) {
        self.sinks.iter().for_each(|sink| sink.on_dispatch(event));
    }

    fn on_throttle(&self, event: &ThrottleEvent<'_>) {
        self.sinks.iter().for_each(|sink| sink.on_throttle(event));
    }

    fn on_concurrency(&self, event: &ConcurrencyEvent<'_>) {
        self.sinks.iter().for_each(|sink| sink.on_concurrency(event));
    }

    fn on_retry(&self, event: &RetryEvent<'_>) {
        self.sinks.iter().for_each(|sink| sink.on_retry(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RetryPhase, RetrySnapshot};
    use bulwark_core::{EndpointContext, Method};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Sink for Counter {
        fn on_retry(&self, _event: &RetryEvent<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_forwards_to_every_sink() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let mut fanout = FanoutSink::new(vec![first.clone()]);
        fanout.push(second.clone());
        fanout.push(Arc::new(NullSink));

        let ctx = EndpointContext::new(Method::Get, "https://api", "/a", BTreeMap::new()).unwrap();
        let snapshot = RetrySnapshot::new(1, 3, Duration::from_secs(1), "[Bad Status Code: 500]", Some(500));
        fanout.on_retry(&RetryEvent {
            context: &ctx,
            snapshot: &snapshot,
            phase: RetryPhase::BeforeRetry,
        });

        assert_eq!(fanout.len(), 3);
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
    }
}
