//! Concurrency limit rules and grouping keys.

use crate::EndpointContext;
use regex::Regex;

/// When a blocked group may start admitting callers again.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FreeThreshold {
    /// Wait until `limit` holders have completed
    #[default]
    AllCompleted,
    /// Wait until this percentage of `limit` has completed
    Percent(f64),
}

impl FreeThreshold {
    /// Number of completions needed before the gate reopens.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_core::FreeThreshold;
    ///
    /// assert_eq!(FreeThreshold::AllCompleted.completions_needed(4), 4);
    /// assert_eq!(FreeThreshold::Percent(50.0).completions_needed(4), 2);
    /// assert_eq!(FreeThreshold::Percent(10.0).completions_needed(4), 1);
    /// ```
    pub fn completions_needed(&self, limit: usize) -> usize {
        match self {
            FreeThreshold::AllCompleted => limit.max(1),
            FreeThreshold::Percent(pct) => {
                let needed = (limit as f64 * pct / 100.0).ceil() as usize;
                needed.clamp(1, limit.max(1))
            }
        }
    }
}

/// Caps in-flight calls for endpoints whose unformatted URL matches a pattern.
///
/// # Examples
///
/// ```
/// use bulwark_core::ConcurrencyLimit;
///
/// let limit = ConcurrencyLimit::new(2)
///     .unwrap()
///     .with_blocking_args(vec!["NAME".to_string()]);
///
/// assert_eq!(*limit.limit(), 2);
/// assert!(limit.matches("https://api/pokemon/{NAME}"));
/// ```
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct ConcurrencyLimit {
    /// Maximum simultaneous holders per group
    limit: usize,
    /// Pattern as written
    source: String,
    /// Compiled pattern, anchored at the start
    #[getter(skip)]
    pattern: Regex,
    /// Arguments whose values split the group further
    blocking_args: Vec<String>,
    /// Group per unformatted URL when true, one global group when false
    limit_per_uurl: bool,
    /// Release policy once the group is full
    free_threshold: FreeThreshold,
}

impl ConcurrencyLimit {
    /// A limit applying to every endpoint, grouped per unformatted URL.
    ///
    /// # Errors
    ///
    /// Fails when `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, String> {
        if limit == 0 {
            return Err("concurrency limit must be at least 1".to_string());
        }
        Ok(Self {
            limit,
            source: ".*".to_string(),
            pattern: crate::anchored_regex(".*").map_err(|e| e.to_string())?,
            blocking_args: Vec::new(),
            limit_per_uurl: true,
            free_threshold: FreeThreshold::AllCompleted,
        })
    }

    /// Restricts the limit to unformatted URLs matching `pattern`.
    ///
    /// # Errors
    ///
    /// Fails when the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, String> {
        self.pattern = crate::anchored_regex(pattern)
            .map_err(|e| format!("invalid concurrency pattern {pattern:?}: {e}"))?;
        self.source = pattern.to_string();
        Ok(self)
    }

    /// Splits groups by the values of these endpoint arguments.
    pub fn with_blocking_args(mut self, args: Vec<String>) -> Self {
        self.blocking_args = args;
        self
    }

    /// Chooses per-URL grouping (`true`) or one global group (`false`).
    pub fn with_limit_per_uurl(mut self, per_uurl: bool) -> Self {
        self.limit_per_uurl = per_uurl;
        self
    }

    /// Sets the release policy.
    ///
    /// # Errors
    ///
    /// Fails when a percentage is outside `(0, 100]`.
    pub fn with_free_threshold(mut self, threshold: FreeThreshold) -> Result<Self, String> {
        if let FreeThreshold::Percent(pct) = threshold {
            if pct.is_nan() || pct <= 0.0 || pct > 100.0 {
                return Err(format!(
                    "free threshold percentage must be in (0, 100], got {pct}"
                ));
            }
        }
        self.free_threshold = threshold;
        Ok(self)
    }

    /// True when this limit applies to `unformatted_url`.
    pub fn matches(&self, unformatted_url: &str) -> bool {
        self.pattern.is_match(unformatted_url)
    }

    /// Key of the group the call contends in.
    pub fn group_key(&self, ctx: &EndpointContext) -> GroupKey {
        let scope = if self.limit_per_uurl {
            ctx.unformatted_url().clone()
        } else {
            "global".to_string()
        };
        let args = self
            .blocking_args
            .iter()
            .map(|name| ctx.arg(name).unwrap_or_default().to_string())
            .collect();
        GroupKey {
            rule: self.source.clone(),
            scope,
            args,
        }
    }
}

impl PartialEq for ConcurrencyLimit {
    fn eq(&self, other: &Self) -> bool {
        self.limit == other.limit
            && self.source == other.source
            && self.blocking_args == other.blocking_args
            && self.limit_per_uurl == other.limit_per_uurl
            && self.free_threshold == other.free_threshold
    }
}

/// Identifies a set of calls that share one concurrency budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_getters::Getters)]
pub struct GroupKey {
    /// Pattern of the limit that produced the key
    rule: String,
    /// Unformatted URL, or `global`
    scope: String,
    /// Blocking argument values in declaration order
    args: Vec<String>,
}

impl GroupKey {
    /// Creates a key directly.
    pub fn new(rule: impl Into<String>, scope: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            rule: rule.into(),
            scope: scope.into(),
            args,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scope)?;
        if !self.args.is_empty() {
            write!(f, " [{}]", self.args.join(", "))?;
        }
        Ok(())
    }
}
