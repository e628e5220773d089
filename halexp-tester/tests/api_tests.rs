//! HTTP API tests against the router via `oneshot`

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use halexp_common::config::HarnessConfig;
use halexp_common::events::EventBus;
use halexp_tester::details::DetailStore;
use halexp_tester::dispatcher::QueryDispatcher;
use halexp_tester::normalize::ProfileLink;
use halexp_tester::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use helpers::{author_record, envelope, ScriptedTransport, TEST_PROFILE_TEMPLATE};

fn test_state(transport: ScriptedTransport) -> AppState {
    let dispatcher = QueryDispatcher::new(
        Arc::new(transport),
        DetailStore::new(),
        EventBus::new(64),
        ProfileLink::new(TEST_PROFILE_TEMPLATE),
    );
    let mut config = HarnessConfig::default();
    config.upstream.profile_url_template = TEST_PROFILE_TEMPLATE.to_string();
    AppState::new(dispatcher, config)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "halexp-tester");
    assert_eq!(body["busy"], false);
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, body) = send(&app, get("/api/buildinfo")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
}

#[tokio::test]
async fn test_current_run_404_before_first_run() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, body) = send(&app, get("/api/runs/current")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_start_run_and_read_snapshot() {
    let transport = ScriptedTransport::new()
        .respond("=mean", Ok(envelope(vec![author_record("Ada Lovelace", "ada")])))
        .respond("=median", Ok(envelope(vec![])));
    let state = test_state(transport);
    let busy = state.dispatcher.busy_indicator();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        post_json(
            "/api/runs",
            json!({
                "instances": ["search.test/halexp"],
                "min_years": ["2015\n2020"],
                "thresholds": ["0.5"],
                "metrics": ["mean", "median"],
                "query": "ocean"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["configurations"], 4);
    let run_id = body["run_id"].as_str().unwrap().to_string();

    tokio::time::timeout(Duration::from_secs(5), busy.wait_until_idle(Duration::from_millis(10)))
        .await
        .unwrap();

    let (status, snapshot) = send(&app, get("/api/runs/current")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["run_id"], run_id);
    assert_eq!(snapshot["busy"], false);
    assert_eq!(snapshot["headers"][0], "Config");

    let rows = snapshot["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["display_name"], "halexp | 2015 | 0.5 | mean");
    assert_eq!(rows[0]["state"]["status"], "loaded");
    assert_eq!(rows[0]["state"]["items"][0]["label"], "Ada Lovelace");
    assert_eq!(rows[1]["display_name"], "halexp | 2015 | 0.5 | median");
    assert_eq!(rows[1]["state"]["items"], json!([]));
    assert_eq!(rows[3]["display_name"], "halexp | 2020 | 0.5 | median");

    let (status, detail) = send(&app, get("/api/details/0%230")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["key"], "0#0");
    assert_eq!(detail["record"]["author_name"], "Ada Lovelace");
    assert_eq!(detail["summary"]["shape"], "author");
    assert_eq!(detail["summary"]["paper_count"], 2);

    let (status, _) = send(&app, get("/api/details/1%230")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_detail_key_is_400() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, body) = send(&app, get("/api/details/first")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_empty_space_rejected() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, _) = send(&app, post_json("/api/runs", json!({ "query": "ocean" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get("/api/runs/current")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_strict_run_rejects_malformed_year() {
    let app = build_router(test_state(ScriptedTransport::new()));
    let (status, body) = send(
        &app,
        post_json(
            "/api/runs",
            json!({
                "instances": ["http://search.test/halexp/"],
                "min_years": ["recent"],
                "strict": true
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("recent"));
}

#[tokio::test]
async fn test_layout_preview_does_not_dispatch() {
    let state = test_state(ScriptedTransport::new());
    let dispatcher = state.dispatcher.clone();
    let app = build_router(state);

    let (status, layout) = send(
        &app,
        post_json(
            "/api/layout",
            json!({
                "instances": ["http://search.test/halexp/"],
                "metrics": ["mean", "sigmoid"],
                "query_mode": "docs",
                "query": "sea level",
                "result_count": 3
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(layout["headers"], json!(["Config", "# 1", "# 2", "# 3"]));
    assert_eq!(layout["rows"].as_array().unwrap().len(), 2);
    assert!(layout["rows"][1]["query_url"]
        .as_str()
        .unwrap()
        .starts_with("http://search.test/halexp/docs/query?query=sea+level&hits=3"));
    assert!(dispatcher.current_run().await.is_none());
}
