//! Rule-based dispatch throttling.

use crate::RateTracker;
use bulwark_core::{EndpointContext, Throttle, ThrottleRule};
use bulwark_interface::{Sink, ThrottleEvent, ThrottlePhase};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// What happened while a call waited for throttle clearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleOutcome {
    /// Total time spent sleeping
    pub waited: Duration,
    /// Number of sleeps taken
    pub waits: u32,
}

impl ThrottleOutcome {
    /// True when the call had to wait at least once.
    pub fn was_throttled(&self) -> bool {
        self.waits > 0
    }
}

/// Decision taken under the admission lock.
enum Admission<'a> {
    Admitted,
    Wait {
        rule: &'a ThrottleRule,
        current: usize,
        wait: Duration,
    },
}

/// Delays dispatches until every matching throttle rule has headroom.
///
/// Only one caller at a time sleeps on behalf of a given rule. Others that hit
/// the same rule sleep the same amount silently and then re-check, so a crowd
/// of blocked callers never wakes up and passes all at once.
///
/// # Example
///
/// ```no_run
/// use bulwark_core::{EndpointContext, Method, Throttle, ThrottleRule};
/// use bulwark_interface::NullSink;
/// use bulwark_rate_limit::{RateTracker, ThrottleEngine};
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let engine = ThrottleEngine::new(Arc::new(RateTracker::new()));
/// let throttle = Throttle::from(ThrottleRule::new(".*", 2, Duration::from_secs(1)).unwrap());
/// let ctx = EndpointContext::new(Method::Get, "https://api", "/a", BTreeMap::new()).unwrap();
///
/// let outcome = engine.throttle(&throttle, &ctx, &NullSink).await;
/// assert!(!outcome.was_throttled());
/// # }
/// ```
#[derive(Debug)]
pub struct ThrottleEngine {
    tracker: Arc<RateTracker>,
    admission: Mutex<()>,
    waiters: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ThrottleEngine {
    /// Creates an engine over a shared tracker.
    pub fn new(tracker: Arc<RateTracker>) -> Self {
        Self {
            tracker,
            admission: Mutex::new(()),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// The tracker dispatches are recorded in.
    pub fn tracker(&self) -> &Arc<RateTracker> {
        &self.tracker
    }

    /// Wait required by `rule` right now.
    pub fn wait_for_rule(&self, rule: &ThrottleRule) -> (usize, Duration) {
        let current = self
            .tracker
            .count_matching(|url| rule.matches(url), *rule.window());
        (current, rule.wait_for(current))
    }

    /// Picks the longest wait among matching rules, recording the dispatch
    /// when none applies.
    ///
    /// Check and record happen under one lock so concurrent callers cannot
    /// both observe headroom for the same slot.
    fn admit<'a>(&self, throttle: &'a Throttle, url: &str) -> Admission<'a> {
        let _admission = self
            .admission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let worst = throttle
            .matching(url)
            .map(|rule| {
                let (current, wait) = self.wait_for_rule(rule);
                (rule, current, wait)
            })
            .filter(|(_, _, wait)| !wait.is_zero())
            .max_by_key(|(_, _, wait)| *wait);

        match worst {
            Some((rule, current, wait)) => Admission::Wait {
                rule,
                current,
                wait,
            },
            None => {
                self.tracker.record(url);
                Admission::Admitted
            }
        }
    }

    fn waiter_lock(&self, rule: &ThrottleRule) -> Arc<tokio::sync::Mutex<()>> {
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        waiters
            .entry(rule.pattern_str().to_string())
            .or_default()
            .clone()
    }

    /// Waits until the call may be dispatched, then records it.
    ///
    /// Cancelling the returned future before it completes records nothing.
    #[instrument(skip_all, fields(url = %ctx.url(), uurl = %ctx.unformatted_url()))]
    pub async fn throttle(
        &self,
        throttle: &Throttle,
        ctx: &EndpointContext,
        sink: &dyn Sink,
    ) -> ThrottleOutcome {
        let mut outcome = ThrottleOutcome::default();
        loop {
            let (rule, current, wait) = match self.admit(throttle, ctx.url()) {
                Admission::Admitted => return outcome,
                Admission::Wait {
                    rule,
                    current,
                    wait,
                } => (rule, current, wait),
            };

            let lock = self.waiter_lock(rule);
            match lock.try_lock() {
                Ok(active) => {
                    info!(
                        rule = %rule,
                        current,
                        wait_secs = wait.as_secs_f64(),
                        "Throttle limit reached"
                    );
                    sink.on_throttle(&ThrottleEvent {
                        context: ctx,
                        rule,
                        wait,
                        current,
                        phase: ThrottlePhase::LimitReached,
                    });
                    tokio::time::sleep(wait).await;
                    sink.on_throttle(&ThrottleEvent {
                        context: ctx,
                        rule,
                        wait,
                        current,
                        phase: ThrottlePhase::WaitOver,
                    });
                    debug!(rule = %rule, "Throttle wait over");
                    drop(active);
                }
                Err(_) => {
                    debug!(
                        rule = %rule,
                        wait_secs = wait.as_secs_f64(),
                        "Another caller is waiting on this rule, sleeping before re-check"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
            outcome.waited += wait;
            outcome.waits += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::Method;
    use bulwark_interface::NullSink;
    use std::collections::BTreeMap;

    fn ctx(url_path: &str) -> EndpointContext {
        EndpointContext::new(Method::Get, "https://api", url_path, BTreeMap::new()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_under_cap_passes_immediately() {
        let engine = ThrottleEngine::new(Arc::new(RateTracker::new()));
        let throttle = Throttle::from(ThrottleRule::new(".*", 3, Duration::from_secs(1)).unwrap());
        for _ in 0..3 {
            let outcome = engine.throttle(&throttle, &ctx("/a"), &NullSink).await;
            assert!(!outcome.was_throttled());
        }
        assert_eq!(engine.tracker().total(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_cap_waits_within_window() {
        let engine = ThrottleEngine::new(Arc::new(RateTracker::new()));
        let throttle = Throttle::from(ThrottleRule::new(".*", 2, Duration::from_secs(2)).unwrap());
        engine.throttle(&throttle, &ctx("/a"), &NullSink).await;
        engine.throttle(&throttle, &ctx("/a"), &NullSink).await;

        let start = tokio::time::Instant::now();
        let outcome = engine.throttle(&throttle, &ctx("/a"), &NullSink).await;
        let waited = start.elapsed();

        assert!(outcome.was_throttled());
        assert!(waited > Duration::ZERO);
        assert!(waited <= Duration::from_secs(2));
        assert_eq!(engine.tracker().total(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_rule_never_waits() {
        let engine = ThrottleEngine::new(Arc::new(RateTracker::new()));
        let throttle = Throttle::from(
            ThrottleRule::new("https://other", 1, Duration::from_secs(10)).unwrap(),
        );
        for _ in 0..5 {
            let outcome = engine.throttle(&throttle, &ctx("/a"), &NullSink).await;
            assert!(!outcome.was_throttled());
        }
    }
}
