//! `Retry-After` header parsing.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Parses a `Retry-After` value given as delta-seconds or an HTTP date.
///
/// Dates in the past yield zero. Unparseable values yield `None`.
///
/// # Example
///
/// ```
/// use bulwark_rate_limit::parse_retry_after;
/// use chrono::{TimeZone, Utc};
/// use std::time::Duration;
///
/// let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 0).unwrap();
/// assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
/// assert_eq!(
///     parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
///     Some(Duration::from_secs(60))
/// );
/// assert_eq!(parse_retry_after("soon", now), None);
/// ```
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds.max(0.0)).ok();
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(date) => {
            let delta = date.with_timezone(&Utc) - now;
            Some(delta.to_std().unwrap_or(Duration::ZERO))
        }
        Err(e) => {
            debug!(value, error = %e, "Unparseable Retry-After header");
            None
        }
    }
}
