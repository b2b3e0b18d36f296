//! Tests for recording and replaying responses.

mod test_utils;

use bulwark::{
    Client, ClientConfig, Engine, EngineSettingsBuilder, FileSystemRecordingStore,
    MemoryRecordingStore, Method, Recording, RecordingStore, ReplayMode, ReplaySettings,
    RequestSignature, Response, StatusSet, Throttle, ThrottlePhase, ThrottleRule,
    TransportErrorKind,
};
use bulwark::BulwarkErrorKind;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{EventLog, MockReply, MockTransport};

const BASE: &str = "https://api.test";

fn replaying(
    transport: Arc<MockTransport>,
    replay: ReplaySettings,
    config: ClientConfig,
) -> (Client, Arc<EventLog>) {
    let settings = EngineSettingsBuilder::default()
        .replay(replay)
        .build()
        .unwrap();
    let log = Arc::new(EventLog::new());
    let engine = Engine::new(transport, settings).with_sink(log.clone());
    (Client::new(Arc::new(engine), BASE, config).unwrap(), log)
}

async fn seed(store: &dyn RecordingStore, endpoint: &str, response: Response) {
    let url = format!("{BASE}{endpoint}");
    let signature = RequestSignature::new(Method::Get, url, None);
    store.record(&Recording::new(signature, response)).await.unwrap();
}

fn ditto() -> Response {
    Response::new(200, Method::Get, format!("{BASE}/pokemon/ditto")).with_body("ditto")
}

#[tokio::test(start_paused = true)]
async fn test_record_then_replay() {
    let store = Arc::new(MemoryRecordingStore::new());

    let live = Arc::new(MockTransport::always(MockReply::Body(200, "ditto".into())));
    let (recorder, _) = replaying(
        live.clone(),
        ReplaySettings::new(ReplayMode::Record, store.clone()),
        ClientConfig::default(),
    );
    recorder.get("/pokemon/ditto").await.unwrap();
    assert_eq!(live.calls(), 1);
    assert_eq!(store.len().await, 1);
    assert_eq!(recorder.engine().records_made(), 1);

    let offline = Arc::new(MockTransport::always(MockReply::Status(500)));
    let (player, _) = replaying(
        offline.clone(),
        ReplaySettings::new(ReplayMode::Replay, store.clone()),
        ClientConfig::default(),
    );
    let response = player.get("/pokemon/ditto").await.unwrap().unwrap();

    assert_eq!(response.text(), "ditto");
    assert!(*response.replayed());
    assert_eq!(offline.calls(), 0);
    assert_eq!(player.engine().replays_made(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replay_without_recording_fails_without_dispatch() {
    let store = Arc::new(MemoryRecordingStore::new());
    let transport = Arc::new(MockTransport::always(MockReply::Status(200)));
    let (client, _) = replaying(
        transport.clone(),
        ReplaySettings::new(ReplayMode::Replay, store),
        ClientConfig::default(),
    );

    let err = client.get("/pokemon/ditto").await.unwrap_err();

    match err.kind() {
        BulwarkErrorKind::Transport(transport_err) => {
            assert!(matches!(transport_err.kind(), TransportErrorKind::ReplayMissing(_)));
        }
        other => panic!("expected missing recording, got {other}"),
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_smart_replay_records_once_then_replays() {
    let store = Arc::new(MemoryRecordingStore::new());
    let transport = Arc::new(MockTransport::always(MockReply::Body(200, "ditto".into())));
    let (client, _) = replaying(
        transport.clone(),
        ReplaySettings::new(ReplayMode::SmartReplay, store.clone()),
        ClientConfig::default(),
    );

    let first = client.get("/pokemon/ditto").await.unwrap().unwrap();
    let second = client.get("/pokemon/ditto").await.unwrap().unwrap();

    assert!(!*first.replayed());
    assert!(*second.replayed());
    assert_eq!(second.text(), "ditto");
    assert_eq!(transport.calls(), 1);
    assert_eq!(client.engine().records_made(), 1);
    assert_eq!(client.engine().replays_made(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_discarded_bad_recording_is_fetched_again() {
    let store = Arc::new(MemoryRecordingStore::new());
    seed(
        store.as_ref(),
        "/pokemon/ditto",
        Response::new(503, Method::Get, format!("{BASE}/pokemon/ditto")),
    )
    .await;

    let transport = Arc::new(MockTransport::always(MockReply::Body(200, "ditto".into())));
    let replay =
        ReplaySettings::new(ReplayMode::SmartReplay, store.clone()).with_discard_bad_responses(true);
    let (client, _) = replaying(transport.clone(), replay, ClientConfig::default());

    let response = client.get("/pokemon/ditto").await.unwrap().unwrap();

    assert_eq!(*response.status(), 200);
    assert!(!*response.replayed());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_recording_is_replayed_when_kept() {
    let store = Arc::new(MemoryRecordingStore::new());
    seed(
        store.as_ref(),
        "/pokemon/missingno",
        Response::new(404, Method::Get, format!("{BASE}/pokemon/missingno")),
    )
    .await;

    let transport = Arc::new(MockTransport::always(MockReply::Status(200)));
    let (client, _) = replaying(
        transport.clone(),
        ReplaySettings::new(ReplayMode::SmartReplay, store),
        ClientConfig::default().with_allowed_status(StatusSet::from(404)),
    );

    let response = client.get("/pokemon/missingno").await.unwrap().unwrap();

    assert_eq!(*response.status(), 404);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recordings_older_than_cutoff_are_ignored() {
    let store = Arc::new(MemoryRecordingStore::new());
    seed(store.as_ref(), "/pokemon/ditto", ditto()).await;

    let transport = Arc::new(MockTransport::always(MockReply::Status(200)));
    let replay = ReplaySettings::new(ReplayMode::Replay, store)
        .with_discard_before(Utc::now() + ChronoDuration::hours(1));
    let (client, _) = replaying(transport.clone(), replay, ClientConfig::default());

    let err = client.get("/pokemon/ditto").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_replayed_calls_are_throttled_by_default() {
    let store = Arc::new(MemoryRecordingStore::new());
    seed(store.as_ref(), "/pokemon/ditto", ditto()).await;

    let rule = ThrottleRule::new(".*", 1, Duration::from_secs(10)).unwrap();
    let transport = Arc::new(MockTransport::always(MockReply::Status(500)));
    let (client, log) = replaying(
        transport,
        ReplaySettings::new(ReplayMode::Replay, store),
        ClientConfig::default().with_throttle(Throttle::from(rule)),
    );

    let started = tokio::time::Instant::now();
    client.get("/pokemon/ditto").await.unwrap();
    client.get("/pokemon/ditto").await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(log.throttles().contains(&ThrottlePhase::LimitReached));
}

#[tokio::test(start_paused = true)]
async fn test_disable_throttling_skips_throttle_for_replays() {
    let store = Arc::new(MemoryRecordingStore::new());
    seed(store.as_ref(), "/pokemon/ditto", ditto()).await;

    let rule = ThrottleRule::new(".*", 1, Duration::from_secs(10)).unwrap();
    let transport = Arc::new(MockTransport::always(MockReply::Status(500)));
    let replay = ReplaySettings::new(ReplayMode::Replay, store).with_disable_throttling(true);
    let (client, log) = replaying(
        transport,
        replay,
        ClientConfig::default().with_throttle(Throttle::from(rule)),
    );

    let started = tokio::time::Instant::now();
    for _ in 0..3 {
        client.get("/pokemon/ditto").await.unwrap();
    }

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(log.throttles().is_empty());
    assert_eq!(client.engine().tracker().total(), 0);
}

#[tokio::test]
async fn test_filesystem_store_survives_new_engine() {
    let dir = tempfile::tempdir().unwrap();

    let store = Arc::new(FileSystemRecordingStore::new(dir.path()).unwrap());
    let live = Arc::new(MockTransport::always(MockReply::Body(200, "ditto".into())));
    let (recorder, _) = replaying(
        live.clone(),
        ReplaySettings::new(ReplayMode::Record, store),
        ClientConfig::default(),
    );
    recorder.get("/pokemon/ditto").await.unwrap();

    let reopened = Arc::new(FileSystemRecordingStore::new(dir.path()).unwrap());
    let offline = Arc::new(MockTransport::always(MockReply::Status(500)));
    let (player, _) = replaying(
        offline.clone(),
        ReplaySettings::new(ReplayMode::Replay, reopened),
        ClientConfig::default(),
    );
    let response = player.get("/pokemon/ditto").await.unwrap().unwrap();

    assert_eq!(response.text(), "ditto");
    assert_eq!(live.calls(), 1);
    assert_eq!(offline.calls(), 0);
}
