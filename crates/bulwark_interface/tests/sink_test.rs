//! Tests for sink fan-out and attempt outcomes.

use bulwark_core::{EndpointContext, Method, Response};
use bulwark_error::{TransportError, TransportErrorKind};
use bulwark_interface::{AttemptOutcome, DispatchEvent, FanoutSink, Sink};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct CountingSink {
    dispatches: AtomicUsize,
}

impl Sink for CountingSink {
    fn on_dispatch(&self, _event: &DispatchEvent<'_>) {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
    }
}

fn context() -> EndpointContext {
    EndpointContext::new(Method::Get, "http://api", "/x", BTreeMap::new()).unwrap()
}

#[test]
fn test_fanout_reaches_every_sink() {
    let first = Arc::new(CountingSink::default());
    let second = Arc::new(CountingSink::default());
    let fanout = FanoutSink::new(vec![first.clone(), second.clone()]);

    let ctx = context();
    let outcome = AttemptOutcome::Response(Response::new(200, Method::Get, "http://api/x"));
    let event = DispatchEvent {
        context: &ctx,
        outcome: &outcome,
        retry: None,
        timestamp: chrono::Utc::now(),
        elapsed: Duration::ZERO,
    };
    fanout.on_dispatch(&event);
    fanout.on_dispatch(&event);

    assert_eq!(first.dispatches.load(Ordering::SeqCst), 2);
    assert_eq!(second.dispatches.load(Ordering::SeqCst), 2);
}

#[test]
fn test_outcome_accessors() {
    let ok = AttemptOutcome::from(Ok::<_, TransportError>(Response::new(
        503,
        Method::Get,
        "http://api/x",
    )));
    assert_eq!(ok.status(), Some(503));
    assert!(ok.error().is_none());

    let failed = AttemptOutcome::from(Err::<Response, _>(TransportError::new(
        TransportErrorKind::Connect("refused".into()),
    )));
    assert_eq!(failed.status(), None);
    assert_eq!(failed.error().map(|e| e.kind().label()), Some("Connect"));
}
