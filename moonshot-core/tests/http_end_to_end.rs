//! Real reqwest transport against a local mock server.
//!
//! The blocking client cannot run on a tokio worker, so every fetch goes
//! through `spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moonshot_core::data::{
    AuthStyle, EarningsSource, FetchError, HttpSettings, PagedFetcher, Pause, PolygonClient,
    ReqwestTransport, RetryPolicy,
};
use moonshot_core::domain::DateRange;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoSleep;

impl Pause for NoSleep {
    fn pause(&self, _duration: Duration) {}
}

fn client(base: String, auth: AuthStyle) -> PolygonClient {
    let settings = HttpSettings {
        timeout: Duration::from_secs(5),
        ..HttpSettings::default()
    };
    let transport = ReqwestTransport::new(&settings).unwrap();
    let fetcher = PagedFetcher::new(transport, RetryPolicy::new(3, 0.0, 0.0).unwrap())
        .with_pause(Arc::new(NoSleep));
    PolygonClient::new(fetcher, "PK", auth).with_base_url(base)
}

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn follows_cursor_and_reattaches_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/reference/earnings"))
        .and(query_param("ticker", "AAPL"))
        .and(query_param("apiKey", "PK"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"reportDate": "2024-02-01", "ticker": "AAPL", "fiscalPeriod": "Q1", "fiscalYear": 2024}],
            "next_url": format!("{}/page2?cursor=abc", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .and(query_param("cursor", "abc"))
        .and(query_param("apiKey", "PK"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"reportDate": "2024-05-02", "ticker": "AAPL", "fiscalPeriod": "Q2", "fiscalYear": 2024}],
            "next_url": null,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let events = tokio::task::spawn_blocking(move || {
        client(base, AuthStyle::Query).fetch_earnings("AAPL", range())
    })
    .await
    .unwrap()
    .unwrap();

    let quarters: Vec<String> = events.iter().map(|e| e.quarter_key()).collect();
    assert_eq!(quarters, vec!["Q1 2024", "Q2 2024"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/aggs/grouped/locale/us/market/stocks/2024-05-03"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/aggs/grouped/locale/us/market/stocks/2024-05-03"))
        .and(query_param("adjusted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"T": "ZZZ", "o": 1.0, "c": 1.1, "v": 10, "vw": 1.05}]
        })))
        .mount(&server)
        .await;

    let base = server.uri();
    let bars = tokio::task::spawn_blocking(move || {
        client(base, AuthStyle::Query)
            .grouped_daily(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].ticker.as_deref(), Some("ZZZ"));
}

#[tokio::test(flavor = "multi_thread")]
async fn persistent_failure_is_reported_without_the_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let base = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        client(base, AuthStyle::Query)
            .grouped_daily(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
    let msg = err.to_string();
    assert!(msg.contains("apiKey=REDACTED"), "{msg}");
    assert!(!msg.contains("apiKey=PK"), "{msg}");
}

#[tokio::test(flavor = "multi_thread")]
async fn bearer_auth_sends_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/aggs/grouped/locale/us/market/stocks/2024-05-03"))
        .and(header("authorization", "Bearer PK"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let base = server.uri();
    let bars = tokio::task::spawn_blocking(move || {
        client(base, AuthStyle::Bearer)
            .grouped_daily(NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
    })
    .await
    .unwrap()
    .unwrap();

    assert!(bars.is_empty());
}
