//! Dispatch timestamp bookkeeping.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Records when each URL was dispatched and answers windowed counts.
///
/// Timestamps are appended under the lock using `Instant::now()` taken while
/// the lock is held, so every per-URL list is ascending. Entries are kept for
/// the lifetime of the tracker.
///
/// # Example
///
/// ```
/// use bulwark_rate_limit::RateTracker;
/// use std::time::Duration;
///
/// let tracker = RateTracker::new();
/// tracker.record("https://api/a");
/// tracker.record("https://api/b");
///
/// assert_eq!(tracker.count_matching(|url| url.ends_with("/a"), Duration::from_secs(1)), 1);
/// assert_eq!(tracker.total(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RateTracker {
    dispatches: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.dispatches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a dispatch timestamp for `url`.
    #[instrument(skip(self))]
    pub fn record(&self, url: &str) {
        let mut dispatches = self.lock();
        let now = Instant::now();
        dispatches.entry(url.to_string()).or_default().push(now);
        debug!("Recorded dispatch");
    }

    /// Copies each URL's newest entries, newest-first, while `keep` holds.
    ///
    /// Only the copy happens under the lock; callers filter URLs afterwards.
    fn snapshot(&self, keep: impl Fn(Instant) -> bool) -> Vec<(String, Vec<Instant>)> {
        let dispatches = self.lock();
        dispatches
            .iter()
            .map(|(url, times)| {
                let recent = times.iter().rev().copied().take_while(|at| keep(*at)).collect();
                (url.clone(), recent)
            })
            .collect()
    }

    /// Dispatches to URLs accepted by `matches` within the last `window`.
    ///
    /// A timestamp exactly `window` old no longer counts.
    pub fn count_matching(&self, matches: impl Fn(&str) -> bool, window: Duration) -> usize {
        let now = Instant::now();
        self.snapshot(|at| now.saturating_duration_since(at) < window)
            .into_iter()
            .filter(|(url, _)| matches(url))
            .map(|(_, times)| times.len())
            .sum()
    }

    /// Observed dispatch rate for URLs accepted by `matches`.
    ///
    /// Measured from the first to the last matching dispatch, or to now when
    /// there is only one. Zero when less than a second of history exists.
    pub fn rate_per_second(&self, matches: impl Fn(&str) -> bool) -> f64 {
        let mut times: Vec<Instant> = self
            .snapshot(|_| true)
            .into_iter()
            .filter(|(url, _)| matches(url))
            .flat_map(|(_, times)| times)
            .collect();
        if times.is_empty() {
            return 0.0;
        }
        times.sort();
        let start = times[0];
        let end = if times.len() > 1 {
            times[times.len() - 1]
        } else {
            Instant::now()
        };
        let elapsed = end.saturating_duration_since(start).as_secs_f64();
        if elapsed >= 1.0 {
            times.len() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Total dispatches recorded for every URL.
    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Dispatch count per URL.
    pub fn counts(&self) -> HashMap<String, usize> {
        self.lock()
            .iter()
            .map(|(url, times)| (url.clone(), times.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_boundary_is_exclusive() {
        let tracker = RateTracker::new();
        tracker.record("u");
        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(tracker.count_matching(|_| true, Duration::from_secs(1)), 1);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(tracker.count_matching(|_| true, Duration::from_secs(1)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_per_second() {
        let tracker = RateTracker::new();
        for _ in 0..4 {
            tracker.record("u");
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        // four dispatches across three seconds
        let rate = tracker.rate_per_second(|_| true);
        assert!((rate - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_urls_are_ignored() {
        let tracker = RateTracker::new();
        tracker.record("https://a");
        tracker.record("https://b");
        tracker.record("https://b");
        assert_eq!(tracker.count_matching(|url| url == "https://b", Duration::from_secs(60)), 2);
        assert_eq!(tracker.counts().get("https://a"), Some(&1));
    }

    #[test]
    fn test_matcher_runs_without_holding_the_lock() {
        let tracker = RateTracker::new();
        tracker.record("https://a");
        tracker.record("https://b");

        // The matcher reads the tracker again; it would deadlock under the lock.
        let count = tracker.count_matching(
            |url| tracker.total() == 2 && url == "https://a",
            Duration::from_secs(60),
        );
        assert_eq!(count, 1);
        assert!(tracker.rate_per_second(|_| tracker.total() == 2) >= 0.0);
    }
}
