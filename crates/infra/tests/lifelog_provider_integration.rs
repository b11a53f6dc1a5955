//! Wiremock tests for the lifelog API client.

use chrono::NaiveDate;
use daybridge_core::LifelogProvider;
use daybridge_domain::DaybridgeError;
use daybridge_infra::LifelogApiClient;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LifelogApiClient {
    LifelogApiClient::with_base_url("test-api-key", server.uri()).expect("client built")
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 26).expect("valid date")
}

fn entry(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "markdown": format!("# {title}\n\nnotes"),
        "startTime": "2026-08-26T09:00:00Z",
        "endTime": "2026-08-26T09:30:00Z"
    })
}

#[tokio::test]
async fn list_by_date_sends_the_api_key_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .and(header("X-API-Key", "test-api-key"))
        .and(query_param("date", "2026-08-26"))
        .and(query_param("timezone", "UTC"))
        .and(query_param("includeMarkdown", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [entry("ll-1", "Morning walk")] },
            "meta": { "lifelogs": { "nextCursor": null, "count": 1 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_by_date(date(), "UTC", None, None)
        .await
        .expect("page fetched");

    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].id, "ll-1");
    assert_eq!(page.entries[0].title, "Morning walk");
    assert_eq!(page.count, 1);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn a_cursor_and_limit_are_forwarded_and_the_next_cursor_returned() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .and(query_param("cursor", "cur-1"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [entry("ll-2", "Standup")] },
            "meta": { "lifelogs": { "nextCursor": "cur-2", "count": 2 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_by_date(date(), "UTC", Some("cur-1"), Some(25))
        .await
        .expect("page fetched");

    assert_eq!(page.next_cursor.as_deref(), Some("cur-2"));
    assert!(page.has_more);
    assert_eq!(page.count, 2);
}

#[tokio::test]
async fn an_empty_next_cursor_means_the_last_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [] },
            "meta": { "lifelogs": { "nextCursor": "", "count": 0 } }
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .list_by_date(date(), "UTC", None, None)
        .await
        .expect("page fetched");

    assert!(page.next_cursor.is_none());
    assert!(!page.has_more);
}

#[tokio::test]
async fn malformed_entries_are_skipped_not_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [
                entry("ll-1", "Kept"),
                { "id": "ll-bad", "markdown": "orphan", "startTime": "not-a-timestamp" }
            ] },
            "meta": { "lifelogs": { "count": 2 } }
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .list_by_date(date(), "UTC", None, None)
        .await
        .expect("page fetched");

    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].id, "ll-1");
}

#[tokio::test]
async fn a_missing_meta_block_defaults_cleanly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "lifelogs": [entry("ll-1", "Solo")] }
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .list_by_date(date(), "UTC", None, None)
        .await
        .expect("page fetched");

    assert_eq!(page.entries.len(), 1);
    // Count falls back to the parsed entry total.
    assert_eq!(page.count, 1);
    assert!(!page.has_more);
}

#[tokio::test]
async fn server_errors_surface_as_provider_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/lifelogs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_by_date(date(), "UTC", None, None)
        .await
        .expect_err("must fail");

    match err {
        DaybridgeError::Provider(msg) => {
            assert!(msg.contains("500"), "unexpected message: {msg}");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}
