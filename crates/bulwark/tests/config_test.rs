//! Tests for configuration layering and file loading.

mod test_utils;

use bulwark::{
    BuilderError, BuilderErrorKind, Client, ClientConfig, ConfigErrorKind, Engine,
    EngineSettings, EngineSettingsBuilder, FileConfig, RequestSpecBuilder, RetryPolicy, Setting,
    StatusSet,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockReply, MockTransport};

fn engine() -> Arc<Engine> {
    let transport = Arc::new(MockTransport::always(MockReply::Status(200)));
    Arc::new(Engine::new(transport, EngineSettings::default()))
}

#[test]
fn test_call_layer_overrides_namespace_overrides_client() {
    let client = ClientConfig::default()
        .with_retry(RetryPolicy::new(Duration::from_secs(1), 3))
        .with_allowed_status(StatusSet::from(404))
        .with_timeout(Duration::from_secs(10));
    let namespace = ClientConfig::default()
        .with_retry(RetryPolicy::new(Duration::from_secs(2), 5))
        .with_allowed_status(Setting::Disabled);
    let call = ClientConfig::default().with_timeout(Duration::from_secs(1));

    let merged = ClientConfig::merge(&ClientConfig::merge(&client, &namespace), &call);
    let resolved = merged.resolve().unwrap();

    let policy = resolved.retry().as_ref().unwrap();
    assert_eq!(*policy.max_attempts(), 5);
    assert_eq!(*policy.delay(), Duration::from_secs(2));
    assert_eq!(*resolved.timeout(), Some(Duration::from_secs(1)));
    let names: Vec<_> = resolved.validators().iter().map(|v| v.name()).collect();
    assert_eq!(names, vec!["default"]);
}

#[test]
fn test_disabled_retry_resolves_to_no_policy() {
    let base = ClientConfig::default().with_retry(RetryPolicy::new(Duration::from_secs(1), 3));
    let over = ClientConfig::default().with_retry(Setting::Disabled);

    let resolved = ClientConfig::merge(&base, &over).resolve().unwrap();

    assert!(resolved.retry().is_none());
    assert_eq!(resolved.behavior(), bulwark::Behavior::Break);
}

#[test]
fn test_zero_timeout_is_rejected() {
    let err = ClientConfig::default()
        .with_timeout(Duration::ZERO)
        .resolve()
        .unwrap_err();
    assert!(matches!(err.kind(), ConfigErrorKind::Invalid(_)));
}

#[test]
fn test_file_config_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
base_url = "https://pokeapi.co/api/v2"
strict_status = [200, 404]
throttle = "disabled"

[retry]
delay = 0.5
max_attempts = 2
behavior = "pass"
"#
    )
    .unwrap();

    let config = FileConfig::from_file(file.path()).unwrap();

    assert_eq!(config.base_url.as_deref(), Some("https://pokeapi.co/api/v2"));
    assert!(config.throttle.is_disabled());
    let client_config = config.to_client_config().unwrap();
    let resolved = client_config.resolve().unwrap();
    assert_eq!(resolved.behavior(), bulwark::Behavior::Pass);
    assert_eq!(
        resolved.retry().as_ref().map(|policy| *policy.delay()),
        Some(Duration::from_millis(500))
    );
    assert!(resolved.throttle().rules().is_empty());

    let client = Client::from_file_config(engine(), &config).unwrap();
    assert_eq!(client.base_url(), "https://pokeapi.co/api/v2");
}

#[test]
fn test_missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err.kind(), ConfigErrorKind::Load(_)));
}

#[test]
fn test_client_from_file_requires_base_url() {
    let config = FileConfig::from_toml_str("timeout_secs = 3.0").unwrap();

    let err = Client::from_file_config(engine(), &config).unwrap_err();

    assert!(matches!(err.kind(), ConfigErrorKind::Invalid(_)));
}

#[test]
fn test_invalid_concurrency_entry_is_rejected() {
    let config = FileConfig::from_toml_str(
        r#"
[[concurrency]]
limit = 2
free_percent = 150.0
"#,
    )
    .unwrap();

    let err = config.to_client_config().unwrap_err();

    assert!(matches!(err.kind(), ConfigErrorKind::Concurrency(_)));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let err = EngineSettingsBuilder::default()
        .poll_interval(Duration::ZERO)
        .build()
        .unwrap_err();

    assert_eq!(err.kind(), &BuilderErrorKind::ZeroPollInterval);
}

#[test]
fn test_request_without_endpoint_is_incomplete() {
    let message = RequestSpecBuilder::default().build().unwrap_err();

    let err = BuilderError::from(message);

    assert!(matches!(err.kind(), BuilderErrorKind::Incomplete(_)));
}
