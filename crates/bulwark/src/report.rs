//! Per-endpoint request statistics.

use bulwark_interface::{AttemptOutcome, DispatchEvent, Sink, ThrottleEvent, ThrottlePhase};
use bulwark_rate_limit::RateTracker;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Label of the aggregate row.
pub const TOTAL: &str = "TOTAL";

#[derive(Debug, Clone, Default)]
struct Tally {
    requests: u64,
    status_2xx: u64,
    status_3xx: u64,
    status_4xx: u64,
    status_5xx: u64,
    aborted: u64,
    retries: u64,
    throttles: u64,
    replays: u64,
    total_latency: Duration,
    max_latency: Duration,
    timed: u64,
}

impl Tally {
    fn absorb(&mut self, other: &Tally) {
        self.requests += other.requests;
        self.status_2xx += other.status_2xx;
        self.status_3xx += other.status_3xx;
        self.status_4xx += other.status_4xx;
        self.status_5xx += other.status_5xx;
        self.aborted += other.aborted;
        self.retries += other.retries;
        self.throttles += other.throttles;
        self.replays += other.replays;
        self.total_latency += other.total_latency;
        self.max_latency = self.max_latency.max(other.max_latency);
        self.timed += other.timed;
    }

    fn row(&self, uurl: &str, requests_per_second: f64) -> ReportRow {
        let avg_latency = if self.timed == 0 {
            Duration::ZERO
        } else {
            self.total_latency / self.timed as u32
        };
        ReportRow {
            uurl: uurl.to_string(),
            requests: self.requests,
            status_2xx: self.status_2xx,
            status_3xx: self.status_3xx,
            status_4xx: self.status_4xx,
            status_5xx: self.status_5xx,
            aborted: self.aborted,
            retries: self.retries,
            throttles: self.throttles,
            replays: self.replays,
            avg_latency_secs: avg_latency.as_secs_f64(),
            max_latency_secs: self.max_latency.as_secs_f64(),
            requests_per_second,
        }
    }
}

/// One line of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct ReportRow {
    /// Endpoint template, or `TOTAL`
    uurl: String,
    /// Dispatches, retries included
    requests: u64,
    /// Responses in 200..300
    status_2xx: u64,
    /// Responses in 300..400
    status_3xx: u64,
    /// Responses in 400..500
    status_4xx: u64,
    /// Responses in 500..600
    status_5xx: u64,
    /// Dispatches that produced no response
    aborted: u64,
    /// Dispatches that were retries
    retries: u64,
    /// Throttle waits
    throttles: u64,
    /// Responses served from recordings
    replays: u64,
    /// Mean latency of responses
    avg_latency_secs: f64,
    /// Slowest response
    max_latency_secs: f64,
    /// Observed dispatch rate
    requests_per_second: f64,
}

impl ReportRow {
    /// Share of dispatches answered with 2xx, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.status_2xx as f64 * 100.0 / self.requests as f64
        }
    }
}

/// Snapshot of everything a [`ReportBuilder`] saw.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct Report {
    /// One row per endpoint template, sorted
    rows: Vec<ReportRow>,
    /// Sum over all rows
    total: ReportRow,
}

impl Report {
    /// Row for one endpoint template.
    pub fn row(&self, uurl: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| row.uurl == uurl)
    }

    /// Renders the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Sink that tallies events per unformatted URL.
///
/// Register it on an engine, then call [`ReportBuilder::build`] at any point.
///
/// # Examples
///
/// ```
/// use bulwark::ReportBuilder;
///
/// let report = ReportBuilder::new().build();
/// assert!(report.rows().is_empty());
/// assert_eq!(*report.total().requests(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ReportBuilder {
    tracker: Option<Arc<RateTracker>>,
    tallies: Mutex<BTreeMap<String, Tally>>,
}

impl ReportBuilder {
    /// Creates an empty builder without rate data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder that reads request rates from `tracker`.
    pub fn with_tracker(tracker: Arc<RateTracker>) -> Self {
        Self {
            tracker: Some(tracker),
            tallies: Mutex::default(),
        }
    }

    fn update(&self, uurl: &str, f: impl FnOnce(&mut Tally)) {
        let mut tallies = self.tallies.lock().unwrap_or_else(PoisonError::into_inner);
        f(tallies.entry(uurl.to_string()).or_default());
    }

    fn rate_for(&self, uurl: &str) -> f64 {
        let Some(tracker) = &self.tracker else {
            return 0.0;
        };
        match template_regex(uurl) {
            Ok(pattern) => tracker.rate_per_second(|url| pattern.is_match(url)),
            Err(e) => {
                tracing::debug!(uurl, error = %e, "Cannot build rate pattern");
                0.0
            }
        }
    }

    /// Builds the report from everything seen so far.
    pub fn build(&self) -> Report {
        let tallies = self
            .tallies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut total = Tally::default();
        let rows = tallies
            .iter()
            .map(|(uurl, tally)| {
                total.absorb(tally);
                tally.row(uurl, self.rate_for(uurl))
            })
            .collect();
        let total_rate = self
            .tracker
            .as_ref()
            .map_or(0.0, |tracker| tracker.rate_per_second(|_| true));

        Report {
            rows,
            total: total.row(TOTAL, total_rate),
        }
    }
}

impl Sink for ReportBuilder {
    fn on_dispatch(&self, event: &DispatchEvent<'_>) {
        self.update(event.context.unformatted_url(), |tally| {
            tally.requests += 1;
            if event.retry.is_some() {
                tally.retries += 1;
            }
            match event.outcome {
                AttemptOutcome::Response(response) => {
                    match *response.status() {
                        200..=299 => tally.status_2xx += 1,
                        300..=399 => tally.status_3xx += 1,
                        400..=499 => tally.status_4xx += 1,
                        500..=599 => tally.status_5xx += 1,
                        _ => {}
                    }
                    if *response.replayed() {
                        tally.replays += 1;
                    }
                    tally.total_latency += event.elapsed;
                    tally.max_latency = tally.max_latency.max(event.elapsed);
                    tally.timed += 1;
                }
                AttemptOutcome::Failed(_) => tally.aborted += 1,
            }
        });
    }

    fn on_throttle(&self, event: &ThrottleEvent<'_>) {
        if event.phase == ThrottlePhase::LimitReached {
            self.update(event.context.unformatted_url(), |tally| tally.throttles += 1);
        }
    }
}

/// Regex matching every URL an endpoint template can produce.
fn template_regex(template: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        match rest[open..].find('}') {
            Some(close) => {
                pattern.push_str("[^/]+");
                rest = &rest[open + close + 1..];
            }
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_regex_matches_formatted_urls() {
        let pattern = template_regex("https://api/pokemon/{NAME}/forms").unwrap();
        assert!(pattern.is_match("https://api/pokemon/ditto/forms"));
        assert!(!pattern.is_match("https://api/pokemon/ditto/moves"));
        assert!(!pattern.is_match("https://api/pokemon/a/b/forms"));
    }

    #[test]
    fn test_template_without_placeholders_is_literal() {
        let pattern = template_regex("https://api/v2/berry?limit=1").unwrap();
        assert!(pattern.is_match("https://api/v2/berry?limit=1"));
        assert!(!pattern.is_match("https://api/v2/berryXlimit=1"));
    }
}
