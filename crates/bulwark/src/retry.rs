//! Retry loop bookkeeping.

use bulwark_core::{RetryPolicy, RetryTrigger};
use bulwark_error::{BulwarkError, BulwarkErrorKind, RejectionErrorKind};
use bulwark_interface::RetrySnapshot;
use std::time::Duration;

/// Cause label of an accepted attempt.
pub const SUCCESSFUL: &str = "SUCCESSFUL";

/// Human-readable reason an attempt was rejected.
///
/// Bad statuses, caller-classified rejections and transport failures render
/// differently so alerts can tell them apart.
///
/// # Examples
///
/// ```
/// use bulwark::cause_of;
/// use bulwark_error::{BulwarkError, TransportError, TransportErrorKind};
///
/// let err: BulwarkError = TransportError::new(TransportErrorKind::Timeout(100)).into();
/// assert_eq!(cause_of(&err), "[Request Error: Timeout]");
/// ```
pub fn cause_of(error: &BulwarkError) -> String {
    match error.kind() {
        BulwarkErrorKind::Rejection(rejection) => match rejection.kind() {
            RejectionErrorKind::UserDefined { kind, .. } => format!("[User Error: {kind}]"),
            _ => format!("[Bad Status Code: {}]", rejection.response().status()),
        },
        BulwarkErrorKind::Transport(err) => format!("[Request Error: {}]", err.kind().label()),
        BulwarkErrorKind::RetryExhausted(err) => err.cause().to_string(),
        BulwarkErrorKind::Config(_) => "[Config Error]".to_string(),
        BulwarkErrorKind::Mapping(_) => "[Mapping Error]".to_string(),
        BulwarkErrorKind::Storage(_) => "[Storage Error]".to_string(),
        BulwarkErrorKind::Builder(_) => "[Builder Error]".to_string(),
    }
}

/// True when `policy` allows retrying after `error`.
///
/// An empty trigger list retries every rejection and transport failure.
pub fn should_retry(policy: &RetryPolicy, error: &BulwarkError) -> bool {
    let retryable = matches!(
        error.kind(),
        BulwarkErrorKind::Rejection(_) | BulwarkErrorKind::Transport(_)
    );
    if !retryable {
        return false;
    }
    if policy.retry_on().is_empty() {
        return true;
    }
    policy
        .retry_on()
        .iter()
        .any(|trigger| trigger_matches(trigger, error))
}

fn trigger_matches(trigger: &RetryTrigger, error: &BulwarkError) -> bool {
    match (trigger, error.kind()) {
        (RetryTrigger::Status(status), BulwarkErrorKind::Rejection(rejection)) => {
            rejection.response().status() == status
        }
        (RetryTrigger::Transport, BulwarkErrorKind::Transport(_)) => true,
        (RetryTrigger::TransportKind(kind), BulwarkErrorKind::Transport(err)) => {
            err.kind().label().eq_ignore_ascii_case(kind)
        }
        (RetryTrigger::Validator(name), BulwarkErrorKind::Rejection(rejection)) => {
            rejection.validator() == name
                || matches!(
                    rejection.kind(),
                    RejectionErrorKind::UserDefined { kind, .. } if kind == name
                )
        }
        _ => false,
    }
}

/// State of one call's retry sequence.
///
/// `attempt` counts retries: it is 0 while the original dispatch is being
/// judged and reaches `max_attempts + 1` once the policy is exhausted.
///
/// # Examples
///
/// ```
/// use bulwark::RetryState;
/// use bulwark_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_secs(1), 2).with_modifier(2.0);
/// let mut state = RetryState::new(policy);
///
/// assert_eq!(state.increment(None), Duration::from_secs(1));
/// assert!(state.can_retry());
/// assert_eq!(state.increment(None), Duration::from_secs(2));
/// assert!(state.can_retry());
/// state.increment(None);
/// assert!(!state.can_retry());
/// ```
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    delay: Duration,
    current_delay: Duration,
    dispatches: u32,
    cause: String,
    last_status: Option<u16>,
    success: bool,
}

impl RetryState {
    /// Fresh state after the original dispatch was rejected.
    pub fn new(policy: RetryPolicy) -> Self {
        let delay = *policy.delay();
        Self {
            policy,
            attempt: 0,
            delay,
            current_delay: delay,
            dispatches: 1,
            cause: String::new(),
            last_status: None,
            success: false,
        }
    }

    /// Moves to the next retry and returns the delay to sleep before it.
    ///
    /// The running delay is multiplied by the policy modifier on every call
    /// after the first, saturating at `Duration::MAX`. A delay override for
    /// `last_status` replaces the result for this iteration only.
    pub fn increment(&mut self, last_status: Option<u16>) -> Duration {
        self.attempt += 1;
        if self.attempt > 1 {
            let grown = self.delay.as_secs_f64() * *self.policy.modifier();
            self.delay = Duration::try_from_secs_f64(grown).unwrap_or(Duration::MAX);
        }
        self.current_delay = last_status
            .and_then(|status| self.policy.overrides().get(&status))
            .map_or(self.delay, |over| over.delay);
        self.current_delay
    }

    /// True while retries remain.
    pub fn can_retry(&self) -> bool {
        self.attempt <= *self.policy.max_attempts()
    }

    /// Records a rejected dispatch.
    pub fn record_failure(&mut self, error: &BulwarkError) {
        self.cause = cause_of(error);
        self.last_status = error.status();
        self.success = false;
    }

    /// Records an accepted dispatch.
    pub fn record_success(&mut self, status: u16) {
        self.cause = SUCCESSFUL.to_string();
        self.last_status = Some(status);
        self.success = true;
    }

    /// Counts a retry dispatch.
    pub fn record_dispatch(&mut self) {
        self.dispatches += 1;
    }

    /// Retries made so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total dispatches, the original included.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    /// Delay that preceded the latest retry.
    pub fn delay(&self) -> Duration {
        self.current_delay
    }

    /// Label of the latest outcome.
    pub fn cause(&self) -> &str {
        &self.cause
    }

    /// True once a retry was accepted.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Policy driving this state.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Read-only view handed to sinks and hooks.
    pub fn snapshot(&self) -> RetrySnapshot {
        RetrySnapshot::new(
            self.attempt,
            *self.policy.max_attempts(),
            self.current_delay,
            self.cause.clone(),
            self.last_status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::{Method, Response};
    use bulwark_error::{RejectionError, TransportError, TransportErrorKind};

    fn rejected(status: u16) -> BulwarkError {
        let response = Response::new(status, Method::Get, "https://api/x");
        RejectionError::new(
            RejectionErrorKind::NonOk {
                url: "https://api/x".into(),
                status,
            },
            "default",
            response,
        )
        .into()
    }

    fn user_rejected(kind: &str) -> BulwarkError {
        let response = Response::new(200, Method::Get, "https://api/x");
        RejectionError::new(
            RejectionErrorKind::UserDefined {
                url: "https://api/x".into(),
                kind: kind.into(),
                message: "empty payload".into(),
            },
            "payload",
            response,
        )
        .into()
    }

    #[test]
    fn test_cause_labels() {
        assert_eq!(cause_of(&rejected(503)), "[Bad Status Code: 503]");
        assert_eq!(cause_of(&user_rejected("EmptyPayload")), "[User Error: EmptyPayload]");
        let transport: BulwarkError =
            TransportError::new(TransportErrorKind::Connect("refused".into())).into();
        assert_eq!(cause_of(&transport), "[Request Error: Connect]");
    }

    #[test]
    fn test_empty_triggers_retry_everything() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 1);
        assert!(should_retry(&policy, &rejected(404)));
        let transport: BulwarkError =
            TransportError::new(TransportErrorKind::Timeout(5)).into();
        assert!(should_retry(&policy, &transport));
    }

    #[test]
    fn test_triggers_filter_rejections() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 1).with_retry_on(vec![
            RetryTrigger::Status(503),
            RetryTrigger::TransportKind("timeout".into()),
            RetryTrigger::Validator("EmptyPayload".into()),
        ]);
        assert!(should_retry(&policy, &rejected(503)));
        assert!(!should_retry(&policy, &rejected(500)));
        assert!(should_retry(&policy, &user_rejected("EmptyPayload")));

        let timeout: BulwarkError = TransportError::new(TransportErrorKind::Timeout(5)).into();
        let connect: BulwarkError =
            TransportError::new(TransportErrorKind::Connect("refused".into())).into();
        assert!(should_retry(&policy, &timeout));
        assert!(!should_retry(&policy, &connect));
    }

    #[test]
    fn test_override_replaces_delay_for_one_iteration() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 5)
            .with_modifier(2.0)
            .with_override(429, Duration::from_secs(10));
        let mut state = RetryState::new(policy);

        assert_eq!(state.increment(Some(500)), Duration::from_secs(1));
        assert_eq!(state.increment(Some(429)), Duration::from_secs(10));
        assert_eq!(state.increment(Some(500)), Duration::from_secs(4));
    }

    #[test]
    fn test_running_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 40)
            .with_modifier(10.0)
            .with_override(429, Duration::from_millis(10));
        let mut state = RetryState::new(policy);

        for _ in 0..40 {
            assert_eq!(state.increment(Some(429)), Duration::from_millis(10));
        }
        assert_eq!(state.increment(Some(500)), Duration::MAX);
    }

    #[test]
    fn test_snapshot_reflects_latest_failure() {
        let mut state = RetryState::new(RetryPolicy::new(Duration::from_millis(500), 2));
        state.record_failure(&rejected(502));
        state.increment(Some(502));

        let snapshot = state.snapshot();
        assert_eq!(*snapshot.attempt(), 1);
        assert_eq!(*snapshot.max_attempts(), 2);
        assert_eq!(snapshot.cause(), "[Bad Status Code: 502]");
        assert_eq!(*snapshot.last_status(), Some(502));

        state.record_success(200);
        assert!(state.is_success());
        assert_eq!(state.cause(), SUCCESSFUL);
    }
}
