//! Tests for walking paged endpoints.

mod test_utils;

use bulwark::{
    Client, ClientConfig, Engine, EngineSettings, JsonParser, Method, Paginator, RequestSpec,
};
use serde::Deserialize;
use std::sync::Arc;
use test_utils::{MockReply, MockTransport};

const BASE: &str = "https://api.test";

fn client(transport: Arc<MockTransport>) -> Client {
    let engine = Engine::new(transport, EngineSettings::default());
    Client::new(Arc::new(engine), BASE, ClientConfig::default()).expect("valid config")
}

fn bodies(pages: &[&str]) -> Vec<MockReply> {
    pages
        .iter()
        .map(|body| MockReply::Body(200, body.to_string()))
        .collect()
}

fn offset_pages(transport: Arc<MockTransport>) -> Paginator<Vec<u32>, usize> {
    Paginator::<Vec<u32>, usize>::offset(
        client(transport),
        RequestSpec::new(Method::Get, "/pokemon?offset={offset}&limit={limit}"),
        Arc::new(JsonParser::<Vec<u32>>::new()),
        |last: Option<&Vec<u32>>| last.is_none_or(|page| page.len() == 2),
    )
    .with_page_size(2)
}

#[tokio::test(start_paused = true)]
async fn test_offset_walk_stops_on_short_page() {
    let transport = Arc::new(MockTransport::sequence(
        bodies(&["[1,2]", "[3,4]", "[5]"]),
        MockReply::Status(500),
    ));
    let mut pages = offset_pages(transport.clone());

    let mut items = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        items.extend(page);
    }

    assert_eq!(items, vec![1, 2, 3, 4, 5]);
    assert_eq!(transport.calls(), 3);
    assert_eq!(*pages.token(), 6);
    let urls = transport.urls();
    assert!(urls[0].ends_with("/pokemon?offset=0&limit=2"), "{}", urls[0]);
    assert!(urls[1].ends_with("/pokemon?offset=2&limit=2"), "{}", urls[1]);
    assert!(urls[2].ends_with("/pokemon?offset=4&limit=2"), "{}", urls[2]);
}

#[tokio::test(start_paused = true)]
async fn test_offset_prev_page_steps_back_one_page() {
    let transport = Arc::new(MockTransport::sequence(
        bodies(&["[1,2]", "[3,4]", "[3,4]"]),
        MockReply::Status(500),
    ));
    let mut pages = offset_pages(transport.clone());

    assert!(pages.prev_page().await.unwrap().is_none());
    assert_eq!(transport.calls(), 0);

    pages.next_page().await.unwrap();
    pages.next_page().await.unwrap();
    let previous = pages.prev_page().await.unwrap();

    assert_eq!(previous, Some(vec![3, 4]));
    assert_eq!(*pages.token(), 2);
    assert!(transport.urls()[2].ends_with("offset=2&limit=2"));
}

#[tokio::test(start_paused = true)]
async fn test_set_page_jumps_to_token() {
    let transport = Arc::new(MockTransport::always(MockReply::Body(200, "[9]".into())));
    let mut pages = offset_pages(transport.clone());

    pages.set_page(10);
    let page = pages.next_page().await.unwrap();

    assert_eq!(page, Some(vec![9]));
    assert!(transport.urls()[0].ends_with("offset=10&limit=2"));
    assert!(pages.next_page().await.unwrap().is_none());
    assert_eq!(transport.calls(), 1);
}

#[derive(Debug, Clone, Deserialize)]
struct Berries {
    items: Vec<String>,
    next: Option<String>,
}

#[tokio::test(start_paused = true)]
async fn test_token_walk_follows_cursor() {
    let transport = Arc::new(MockTransport::sequence(
        bodies(&[
            r#"{"items":["cheri"],"next":"b2"}"#,
            r#"{"items":["chesto"],"next":null}"#,
        ]),
        MockReply::Status(500),
    ));
    let mut pages = Paginator::<Berries, String>::new(
        client(transport.clone()),
        RequestSpec::new(Method::Get, "/berry?cursor={token}&limit={limit}"),
        Arc::new(JsonParser::<Berries>::new()),
        "start".to_string(),
        |last: Option<&Berries>| last.is_none_or(|page| page.next.is_some()),
        |page: &Berries, _token: &String, _size| page.next.clone().unwrap_or_default(),
    );

    let mut names = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        names.extend(page.items);
    }

    assert_eq!(names, vec!["cheri", "chesto"]);
    let urls = transport.urls();
    assert!(urls[0].ends_with("/berry?cursor=start&limit=20"), "{}", urls[0]);
    assert!(urls[1].ends_with("/berry?cursor=b2&limit=20"), "{}", urls[1]);
    assert!(pages.prev_page().await.unwrap().is_none());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_page_keeps_token() {
    let transport = Arc::new(MockTransport::statuses(&[503]));
    let mut pages = offset_pages(transport.clone());

    assert!(pages.next_page().await.is_err());
    assert_eq!(*pages.token(), 0);
}
