//! Throttle rule description and wait-time arithmetic.

use regex::Regex;
use std::time::Duration;

/// Caps how many requests whose URL matches `pattern` may start per `window`.
///
/// # Examples
///
/// ```
/// use bulwark_core::ThrottleRule;
/// use std::time::Duration;
///
/// let rule = ThrottleRule::new(".*", 10, Duration::from_secs(1)).unwrap();
/// assert!(rule.matches("https://example.com/a"));
/// assert_eq!(rule.readable_window(), "second");
/// assert_eq!(rule.to_string(), "10 requests per second for URLs matching .*");
/// ```
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct ThrottleRule {
    /// Pattern as written
    source: String,
    /// Compiled pattern, anchored at the start of the URL
    #[getter(skip)]
    pattern: Regex,
    /// Requests allowed per window
    max_requests: u32,
    /// Sliding window length
    window: Duration,
}

impl ThrottleRule {
    /// Compiles a rule.
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not compile, `max_requests` is zero, or the
    /// window is empty.
    pub fn new(pattern: &str, max_requests: u32, window: Duration) -> Result<Self, String> {
        let compiled = crate::anchored_regex(pattern)
            .map_err(|e| format!("invalid throttle pattern {pattern:?}: {e}"))?;
        if max_requests == 0 {
            return Err(format!(
                "throttle rule {pattern} must allow at least one request"
            ));
        }
        if window.is_zero() {
            return Err(format!("throttle rule {pattern} must have a non-zero window"));
        }
        Ok(Self {
            source: pattern.to_string(),
            pattern: compiled,
            max_requests,
            window,
        })
    }

    /// The pattern source text.
    pub fn pattern_str(&self) -> &str {
        &self.source
    }

    /// True when the pattern matches at the start of `url`.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// How long to wait given `current` matching requests inside the window.
    ///
    /// Zero while under the cap. Over it, the window is divided by the
    /// remaining headroom clamped to at least one, so the result never exceeds
    /// one window.
    pub fn wait_for(&self, current: usize) -> Duration {
        let max = self.max_requests as i64;
        let current = i64::try_from(current).unwrap_or(i64::MAX);
        if current < max {
            return Duration::ZERO;
        }
        let divisor = (max - current).max(1) as u32;
        self.window / divisor
    }

    /// Window length in words, e.g. `"second"`, `"5 minutes"`.
    pub fn readable_window(&self) -> String {
        readable_duration(self.window)
    }
}

impl PartialEq for ThrottleRule {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.max_requests == other.max_requests
            && self.window == other.window
    }
}

impl std::fmt::Display for ThrottleRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} requests per {} for URLs matching {}",
            self.max_requests,
            self.readable_window(),
            self.source
        )
    }
}

fn readable_duration(window: Duration) -> String {
    let mut seconds = window.as_secs();
    let mut parts = Vec::new();
    for (name, size) in [("hour", 3600), ("minute", 60), ("second", 1)] {
        if seconds >= size {
            let amount = seconds / size;
            seconds %= size;
            if amount == 1 {
                parts.push(name.to_string());
            } else {
                parts.push(format!("{amount} {name}s"));
            }
        }
    }
    match parts.len() {
        0 => format!("{} milliseconds", window.as_millis()),
        1 => parts.remove(0),
        n => format!("{} and {}", parts[..n - 1].join(", "), parts[n - 1]),
    }
}

/// An ordered set of throttle rules applied to every request.
#[derive(Debug, Clone, Default, PartialEq, derive_getters::Getters)]
pub struct Throttle {
    /// Rules in declaration order
    rules: Vec<ThrottleRule>,
}

impl Throttle {
    /// Wraps a rule list.
    pub fn new(rules: Vec<ThrottleRule>) -> Self {
        Self { rules }
    }

    /// Rules whose pattern matches `url`.
    pub fn matching<'a>(&'a self, url: &str) -> impl Iterator<Item = &'a ThrottleRule> {
        self.rules.iter().filter(move |rule| rule.matches(url))
    }
}

impl From<ThrottleRule> for Throttle {
    fn from(rule: ThrottleRule) -> Self {
        Self::new(vec![rule])
    }
}
