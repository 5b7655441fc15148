//! End-to-end tests against mock upstreams over real sockets.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aggregation_gateway::config::BreakerConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_aggregate_merges_both_dependencies() {
    let post = common::start_mock_backend(r#"{"userId":1,"id":1,"title":"foo"}"#).await;
    let author = common::start_mock_backend(r#"{"id":1,"name":"bar"}"#).await;
    let (url, shutdown) = common::start_gateway(common::gateway_config(post, author)).await;

    let res = common::client().get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"post_title": "foo", "author_name": "bar"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_field_falls_back() {
    let post = common::start_mock_backend(r#"{"id":1}"#).await;
    let author = common::start_mock_backend(r#"{"name":"bar"}"#).await;
    let (url, shutdown) = common::start_gateway(common::gateway_config(post, author)).await;

    let body: Value = common::client()
        .get(format!("{url}/aggregate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["post_title"], "Unknown Title");
    assert_eq!(body["author_name"], "bar");

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_dependency_times_out_while_sibling_succeeds() {
    let post = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, r#"{"title":"late"}"#.to_string())
    })
    .await;

    let author_hits = Arc::new(AtomicU32::new(0));
    let hits = author_hits.clone();
    let author = common::start_programmable_backend(move || {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (200, r#"{"name":"bar"}"#.to_string())
        }
    })
    .await;

    let mut config = common::gateway_config(post, author);
    config.breaker = BreakerConfig {
        max_failures: 3,
        call_timeout_ms: 300,
        reset_timeout_ms: 10_000,
    };
    let (url, shutdown) = common::start_gateway(config).await;

    let res = common::client().get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Failed to fetch data from external APIs");
    assert_eq!(body["failures"].as_array().unwrap().len(), 1);
    assert_eq!(body["failures"][0]["dependency"], "post");
    assert_eq!(body["failures"][0]["cause"], "timeout");
    assert!(body["message"].as_str().unwrap().contains("timed out"));
    assert_eq!(author_hits.load(Ordering::SeqCst), 1, "sibling call must still run");

    shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_opens_and_stops_calling_upstream() {
    let post_hits = Arc::new(AtomicU32::new(0));
    let hits = post_hits.clone();
    let post = common::start_programmable_backend(move || {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (503, "Service Unavailable".to_string())
        }
    })
    .await;
    let author = common::start_mock_backend(r#"{"name":"bar"}"#).await;

    let mut config = common::gateway_config(post, author);
    config.breaker.max_failures = 2;
    let (url, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..2 {
        let body: Value = client.get(format!("{url}/aggregate")).send().await.unwrap().json().await.unwrap();
        assert_eq!(body["failures"][0]["cause"], "status:503");
    }

    let res = client.get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["failures"][0]["cause"], "breaker-open");
    assert_eq!(body["failures"][0]["breaker"], "OPEN");
    assert_eq!(post_hits.load(Ordering::SeqCst), 2);

    let breakers: Value = client.get(format!("{url}/breakers")).send().await.unwrap().json().await.unwrap();
    let post_breaker = breakers
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["dependency"] == "post")
        .unwrap();
    assert_eq!(post_breaker["mode"], "OPEN");

    shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_recovers_after_reset_timeout() {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = healthy.clone();
    let post = common::start_programmable_backend(move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, r#"{"title":"back"}"#.to_string())
            } else {
                (500, "down".to_string())
            }
        }
    })
    .await;
    let author = common::start_mock_backend(r#"{"name":"bar"}"#).await;

    let mut config = common::gateway_config(post, author);
    config.breaker = BreakerConfig {
        max_failures: 1,
        call_timeout_ms: 2_000,
        reset_timeout_ms: 300,
    };
    let (url, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let res = client.get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["post_title"], "back");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_route_and_health() {
    let post = common::start_mock_backend(r#"{"title":"foo"}"#).await;
    let author = common::start_mock_backend(r#"{"name":"bar"}"#).await;
    let (url, shutdown) = common::start_gateway(common::gateway_config(post, author)).await;
    let client = common::client();

    let res = client.get(format!("{url}/does-not-exist")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Route not found"}));

    let res = client.get(format!("{url}/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "API Gateway");

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_object_body_is_a_decode_failure() {
    let post = common::start_mock_backend("[]").await;
    let author = common::start_mock_backend(r#"{"name":"bar"}"#).await;
    let (url, shutdown) = common::start_gateway(common::gateway_config(post, author)).await;

    let res = common::client().get(format!("{url}/aggregate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["failures"][0]["dependency"], "post");
    assert_eq!(body["failures"][0]["cause"], "decode");

    shutdown.trigger();
}
