//! In-flight call limiting per concurrency group.

use bulwark_core::{ConcurrencyLimit, EndpointContext, GroupKey};
use bulwark_interface::{ConcurrencyEvent, ConcurrencyPhase, Sink};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default sleep between capacity checks while blocked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Default)]
struct GroupState {
    in_flight: usize,
    completed: u64,
    /// Completion count observed when the group filled up; `Some` while gated
    gate: Option<u64>,
}

type Groups = Arc<Mutex<HashMap<GroupKey, GroupState>>>;

fn lock(groups: &Groups) -> MutexGuard<'_, HashMap<GroupKey, GroupState>> {
    groups.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Step {
    Admitted { freed: bool, in_flight: usize },
    Blocked { in_flight: usize },
    Wait,
}

/// Caps simultaneous holders per [`GroupKey`].
///
/// Once a group fills up it is gated: nobody else is admitted until the
/// configured number of holders has completed, after which callers are let in
/// until the group is full again.
///
/// # Example
///
/// ```
/// use bulwark_core::{ConcurrencyLimit, EndpointContext, Method};
/// use bulwark_interface::NullSink;
/// use bulwark_rate_limit::ConcurrencyLimiter;
/// use std::collections::BTreeMap;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = ConcurrencyLimiter::new();
/// let limit = ConcurrencyLimit::new(1).unwrap();
/// let ctx = EndpointContext::new(Method::Get, "https://api", "/a", BTreeMap::new()).unwrap();
///
/// let guard = limiter.acquire(&limit, &ctx, &NullSink).await;
/// assert_eq!(limiter.in_flight(guard.key()), 1);
/// drop(guard);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    groups: Groups,
    poll_interval: Duration,
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyLimiter {
    /// Creates a limiter polling every [`DEFAULT_POLL_INTERVAL`].
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Creates a limiter with a custom poll interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            groups: Arc::new(Mutex::new(HashMap::new())),
            poll_interval,
        }
    }

    /// Current holders for `key`.
    pub fn in_flight(&self, key: &GroupKey) -> usize {
        lock(&self.groups)
            .get(key)
            .map(|state| state.in_flight)
            .unwrap_or(0)
    }

    fn step(&self, key: &GroupKey, limit: usize, needed: usize) -> Step {
        let mut groups = lock(&self.groups);
        let state = groups.entry(key.clone()).or_default();
        match state.gate {
            None if state.in_flight < limit => {
                state.in_flight += 1;
                Step::Admitted {
                    freed: false,
                    in_flight: state.in_flight,
                }
            }
            None => {
                state.gate = Some(state.completed);
                Step::Blocked {
                    in_flight: state.in_flight,
                }
            }
            Some(base)
                if state.completed - base >= needed as u64 && state.in_flight < limit =>
            {
                state.gate = None;
                state.in_flight += 1;
                Step::Admitted {
                    freed: true,
                    in_flight: state.in_flight,
                }
            }
            Some(_) => Step::Wait,
        }
    }

    /// Waits for a slot in the group `ctx` falls into under `limit`.
    ///
    /// The slot is released when the returned guard drops. Cancelling the
    /// future while it waits holds nothing.
    #[instrument(skip_all, fields(uurl = %ctx.unformatted_url(), limit = *limit.limit()))]
    pub async fn acquire(
        &self,
        limit: &ConcurrencyLimit,
        ctx: &EndpointContext,
        sink: &dyn Sink,
    ) -> ConcurrencyGuard {
        let key = limit.group_key(ctx);
        let max = *limit.limit();
        let needed = limit.free_threshold().completions_needed(max);

        loop {
            match self.step(&key, max, needed) {
                Step::Admitted { freed, in_flight } => {
                    if freed {
                        info!(group_key = %key, in_flight, "Concurrency limit freed");
                        sink.on_concurrency(&ConcurrencyEvent {
                            context: ctx,
                            group_key: &key,
                            limit: max,
                            in_flight,
                            phase: ConcurrencyPhase::Freed,
                        });
                    }
                    debug!(group_key = %key, in_flight, "Concurrency slot acquired");
                    return ConcurrencyGuard {
                        groups: self.groups.clone(),
                        key,
                    };
                }
                Step::Blocked { in_flight } => {
                    info!(group_key = %key, in_flight, "Concurrency limit reached");
                    sink.on_concurrency(&ConcurrencyEvent {
                        context: ctx,
                        group_key: &key,
                        limit: max,
                        in_flight,
                        phase: ConcurrencyPhase::Blocked,
                    });
                    tokio::time::sleep(self.poll_interval).await;
                }
                Step::Wait => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

/// A held concurrency slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct ConcurrencyGuard {
    groups: Groups,
    key: GroupKey,
}

impl ConcurrencyGuard {
    /// The group this slot belongs to.
    pub fn key(&self) -> &GroupKey {
        &self.key
    }
}

impl Drop for ConcurrencyGuard {
    fn drop(&mut self) {
        let mut groups = lock(&self.groups);
        let idle = match groups.get_mut(&self.key) {
            Some(state) => {
                state.in_flight = state.in_flight.saturating_sub(1);
                state.completed += 1;
                state.in_flight == 0 && state.gate.is_none()
            }
            None => false,
        };
        if idle {
            groups.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::{FreeThreshold, Method};
    use bulwark_interface::NullSink;
    use std::collections::BTreeMap;

    fn ctx() -> EndpointContext {
        EndpointContext::new(Method::Get, "https://api", "/a", BTreeMap::new()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_holds_until_all_complete() {
        let limiter = ConcurrencyLimiter::new();
        let limit = ConcurrencyLimit::new(2).unwrap();
        let ctx = ctx();

        let first = limiter.acquire(&limit, &ctx, &NullSink).await;
        let second = limiter.acquire(&limit, &ctx, &NullSink).await;
        let key = first.key().clone();

        let waiter = {
            let limiter = limiter.clone();
            let limit = limit.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { limiter.acquire(&limit, &ctx, &NullSink).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(first);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiter.is_finished());
        assert_eq!(limiter.in_flight(&key), 1);

        drop(second);
        let third = waiter.await.unwrap();
        assert_eq!(limiter.in_flight(&key), 1);
        drop(third);
        assert_eq!(limiter.in_flight(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_percent_threshold_releases_early() {
        let limiter = ConcurrencyLimiter::new();
        let limit = ConcurrencyLimit::new(2)
            .unwrap()
            .with_free_threshold(FreeThreshold::Percent(50.0))
            .unwrap();
        let ctx = ctx();

        let first = limiter.acquire(&limit, &ctx, &NullSink).await;
        let _second = limiter.acquire(&limit, &ctx, &NullSink).await;

        let waiter = {
            let limiter = limiter.clone();
            let limit = limit.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { limiter.acquire(&limit, &ctx, &NullSink).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(first);
        let third = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be admitted after half the group completed")
            .unwrap();
        drop(third);
    }
}
