//! Layered client configuration.
//!
//! A [`ClientConfig`] is a stack layer: every field is a [`Setting`] that
//! either inherits from the layer below, disables the feature, or sets a
//! value. Layers combine with [`ClientConfig::merge`] and are turned into a
//! concrete [`ResolvedConfig`] once, before any request is dispatched, so a
//! malformed policy fails fast instead of mid-call.
//!
//! Files are read with the `config` crate:
//!
//! ```toml
//! base_url = "https://pokeapi.co/api/v2"
//! timeout_secs = 10.0
//! strict_status = [200, 404]
//!
//! [retry]
//! delay = 1.0
//! max_attempts = 3
//! modifier = 1.5
//! retry_on = [{ status = 503 }, "transport"]
//!
//! [[throttle]]
//! pattern = ".*"
//! max_requests = 10
//! window_secs = 1.0
//!
//! [[concurrency]]
//! limit = 4
//! blocking_args = ["NAME"]
//! ```

use crate::validators::{AllowedStatusValidator, DefaultValidator, StrictStatusValidator};
use bulwark_core::{
    Behavior, ConcurrencyLimit, FreeThreshold, RetryPolicy, Setting, StatusSet, Throttle,
    ThrottleRule,
};
use bulwark_error::{ConfigError, ConfigErrorKind};
use bulwark_interface::Validator;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// One configuration layer.
///
/// # Examples
///
/// ```
/// use bulwark::ClientConfig;
/// use bulwark_core::{RetryPolicy, Setting};
/// use std::time::Duration;
///
/// let base = ClientConfig::default()
///     .with_retry(RetryPolicy::new(Duration::from_secs(1), 3))
///     .with_timeout(Duration::from_secs(5));
/// let call = ClientConfig::default().with_retry(Setting::Disabled);
///
/// let merged = ClientConfig::merge(&base, &call);
/// assert!(merged.retry().is_disabled());
/// assert_eq!(merged.timeout(), &Setting::Value(Duration::from_secs(5)));
/// ```
#[derive(Clone, Default, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_", into)]
pub struct ClientConfig {
    /// Retry policy
    retry: Setting<RetryPolicy>,
    /// Throttle rules
    throttle: Setting<Throttle>,
    /// Concurrency limits, first match wins
    concurrency: Setting<Vec<ConcurrencyLimit>>,
    /// Only these statuses are accepted
    strict_status: Setting<StatusSet>,
    /// These statuses are accepted in addition to 2xx
    allowed_status: Setting<StatusSet>,
    /// Custom validators run after the status validator
    validators: Setting<Vec<Arc<dyn Validator>>>,
    /// Per-dispatch timeout
    timeout: Setting<Duration>,
}

impl ClientConfig {
    /// Field-wise merge; `over` wins wherever it is not `Inherit`.
    pub fn merge(base: &ClientConfig, over: &ClientConfig) -> ClientConfig {
        ClientConfig {
            retry: Setting::merge(&base.retry, &over.retry),
            throttle: Setting::merge(&base.throttle, &over.throttle),
            concurrency: Setting::merge(&base.concurrency, &over.concurrency),
            strict_status: Setting::merge(&base.strict_status, &over.strict_status),
            allowed_status: Setting::merge(&base.allowed_status, &over.allowed_status),
            validators: Setting::merge(&base.validators, &over.validators),
            timeout: Setting::merge(&base.timeout, &over.timeout),
        }
    }

    /// Checks every set field and produces the concrete per-call view.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid field.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let retry = self.retry.value().cloned();
        if let Some(policy) = &retry {
            policy
                .validate()
                .map_err(|e| ConfigError::new(ConfigErrorKind::Retry(e)))?;
        }

        let timeout = self.timeout.value().copied();
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::new(ConfigErrorKind::Invalid(
                "timeout must be greater than zero".to_string(),
            )));
        }

        let mut validators: Vec<Arc<dyn Validator>> =
            match (self.strict_status.value(), self.allowed_status.value()) {
                (Some(strict), _) => vec![Arc::new(StrictStatusValidator::new(strict.clone()))],
                (None, Some(allowed)) => {
                    vec![Arc::new(AllowedStatusValidator::new(allowed.clone()))]
                }
                (None, None) => vec![Arc::new(DefaultValidator)],
            };
        if let Some(custom) = self.validators.value() {
            validators.extend(custom.iter().cloned());
        }

        Ok(ResolvedConfig {
            retry,
            throttle: self.throttle.value().cloned().unwrap_or_default(),
            concurrency: self.concurrency.value().cloned().unwrap_or_default(),
            validators,
            timeout,
        })
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let validators = self
            .validators
            .clone()
            .map(|list| list.iter().map(|v| v.name().to_string()).collect::<Vec<_>>());
        f.debug_struct("ClientConfig")
            .field("retry", &self.retry)
            .field("throttle", &self.throttle)
            .field("concurrency", &self.concurrency)
            .field("strict_status", &self.strict_status)
            .field("allowed_status", &self.allowed_status)
            .field("validators", &validators)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Concrete configuration for one call, with nothing left to inherit.
#[derive(Clone, derive_getters::Getters)]
pub struct ResolvedConfig {
    /// Retry policy, `None` when retries are off
    retry: Option<RetryPolicy>,
    /// Throttle rules, possibly empty
    throttle: Throttle,
    /// Concurrency limits, possibly empty
    concurrency: Vec<ConcurrencyLimit>,
    /// Status validator followed by custom validators
    validators: Vec<Arc<dyn Validator>>,
    /// Per-dispatch timeout
    timeout: Option<Duration>,
}

impl ResolvedConfig {
    /// First concurrency limit whose pattern matches `unformatted_url`.
    pub fn concurrency_for(&self, unformatted_url: &str) -> Option<&ConcurrencyLimit> {
        self.concurrency
            .iter()
            .find(|limit| limit.matches(unformatted_url))
    }

    /// Final disposition for failed calls.
    pub fn behavior(&self) -> Behavior {
        self.retry
            .as_ref()
            .map(|policy| *policy.behavior())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("retry", &self.retry)
            .field("throttle", &self.throttle)
            .field("concurrency", &self.concurrency)
            .field(
                "validators",
                &self.validators.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Throttle rule as written in a file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThrottleRuleEntry {
    /// URL pattern, anchored at the start
    pub pattern: String,
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
}

fn default_window_secs() -> f64 {
    1.0
}

impl ThrottleRuleEntry {
    fn into_rule(self) -> Result<ThrottleRule, ConfigError> {
        let window = seconds(self.window_secs)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Throttle(e)))?;
        ThrottleRule::new(&self.pattern, self.max_requests, window)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Throttle(e)))
    }
}

/// Concurrency limit as written in a file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConcurrencyEntry {
    /// Maximum simultaneous calls per group
    pub limit: usize,
    /// Unformatted URL pattern
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Arguments that split groups
    #[serde(default)]
    pub blocking_args: Vec<String>,
    /// Group per endpoint (`true`) or globally
    #[serde(default = "default_per_uurl")]
    pub limit_per_uurl: bool,
    /// Percentage of `limit` that must complete before a full group reopens
    #[serde(default)]
    pub free_percent: Option<f64>,
}

fn default_pattern() -> String {
    ".*".to_string()
}

fn default_per_uurl() -> bool {
    true
}

impl ConcurrencyEntry {
    fn into_limit(self) -> Result<ConcurrencyLimit, ConfigError> {
        let invalid = |e: String| ConfigError::new(ConfigErrorKind::Concurrency(e));
        let threshold = self
            .free_percent
            .map_or(FreeThreshold::AllCompleted, FreeThreshold::Percent);
        ConcurrencyLimit::new(self.limit)
            .and_then(|limit| limit.with_pattern(&self.pattern))
            .and_then(|limit| limit.with_free_threshold(threshold))
            .map(|limit| {
                limit
                    .with_blocking_args(self.blocking_args)
                    .with_limit_per_uurl(self.limit_per_uurl)
            })
            .map_err(invalid)
    }
}

/// Client configuration as stored in a TOML file.
///
/// Absent fields inherit; the string `"disabled"` turns a feature off.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Base URL prepended to every endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Retry policy
    #[serde(default)]
    pub retry: Setting<RetryPolicy>,
    /// Throttle rules
    #[serde(default)]
    pub throttle: Setting<Vec<ThrottleRuleEntry>>,
    /// Concurrency limits
    #[serde(default)]
    pub concurrency: Setting<Vec<ConcurrencyEntry>>,
    /// Strict status set
    #[serde(default)]
    pub strict_status: Setting<StatusSet>,
    /// Allowed status set
    #[serde(default)]
    pub allowed_status: Setting<StatusSet>,
    /// Per-dispatch timeout in seconds
    #[serde(default)]
    pub timeout_secs: Setting<f64>,
}

impl FileConfig {
    /// Loads `~/.config/bulwark/bulwark.toml` then `./bulwark.toml`.
    ///
    /// Both files are optional; values in the later file win.
    ///
    /// # Errors
    ///
    /// Returns error if a present file cannot be parsed.
    #[instrument]
    pub fn load() -> Result<Self, ConfigError> {
        debug!("Loading configuration with precedence: current dir > home dir");

        let mut builder = Config::builder();
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/bulwark/bulwark.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }
        builder = builder.add_source(File::with_name("bulwark").required(false));

        Self::build(builder)
    }

    /// Loads a single file.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or malformed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from(path.as_ref())))
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        builder
            .build()
            .map_err(|e| {
                ConfigError::new(ConfigErrorKind::Load(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ConfigError::new(ConfigErrorKind::Load(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Converts the file layer into a [`ClientConfig`], validating rules.
    ///
    /// # Errors
    ///
    /// Returns error for an invalid pattern, limit, window or timeout.
    pub fn to_client_config(&self) -> Result<ClientConfig, ConfigError> {
        let throttle = match &self.throttle {
            Setting::Value(entries) => Setting::Value(Throttle::new(
                entries
                    .iter()
                    .cloned()
                    .map(ThrottleRuleEntry::into_rule)
                    .collect::<Result<_, _>>()?,
            )),
            Setting::Disabled => Setting::Disabled,
            Setting::Inherit => Setting::Inherit,
        };
        let concurrency = match &self.concurrency {
            Setting::Value(entries) => Setting::Value(
                entries
                    .iter()
                    .cloned()
                    .map(ConcurrencyEntry::into_limit)
                    .collect::<Result<_, _>>()?,
            ),
            Setting::Disabled => Setting::Disabled,
            Setting::Inherit => Setting::Inherit,
        };
        let timeout = match self.timeout_secs {
            Setting::Value(secs) => Setting::Value(
                seconds(secs).map_err(|e| ConfigError::new(ConfigErrorKind::Invalid(e)))?,
            ),
            Setting::Disabled => Setting::Disabled,
            Setting::Inherit => Setting::Inherit,
        };

        Ok(ClientConfig::default()
            .with_retry(self.retry.clone())
            .with_throttle(throttle)
            .with_concurrency(concurrency)
            .with_strict_status(self.strict_status.clone())
            .with_allowed_status(self.allowed_status.clone())
            .with_timeout(timeout))
    }
}

fn seconds(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {secs}: {e}"))
}
