//! Model slot lifecycle and telemetry over HTTP.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{FakeProbe, Harness};
use lumen_server::services;
use serde_json::json;

#[tokio::test]
async fn health_reports_loading_before_any_load() {
    let h = Harness::new();

    let (status, body) = h.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "loading");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["model_id"], "default-model");
}

#[tokio::test]
async fn load_then_health_reports_exact_id() {
    let h = Harness::new();

    let (status, body) = h.load("qwen2.5vl:7b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["model_id"], "qwen2.5vl:7b");
    assert_eq!(body["message"], "Model qwen2.5vl:7b loaded successfully");
    assert_eq!(body["device"], "CPU");
    assert_eq!(body["memory_usage"], "12.00 MB");

    let (_, health) = h.get("/api/health").await;
    assert_eq!(health["status"], "ready");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["model_id"], "qwen2.5vl:7b");

    assert_eq!(h.journal.events(), vec!["load:qwen2.5vl:7b:auto"]);
}

#[tokio::test]
async fn load_requires_a_model_id() {
    let h = Harness::new();

    for body in [json!({}), json!({ "model_id": "" }), json!({ "model_id": "   " }), json!({ "model_id": null })] {
        let (status, resp) = h.post_json("/api/load-model", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(resp["error"], "Model ID is required");
    }

    assert!(h.journal.events().is_empty());
}

#[tokio::test]
async fn load_with_malformed_json_is_400() {
    let h = Harness::new();

    let (status, resp) = h
        .send(
            Request::post("/api/load-model")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "Model ID is required");

    let (status, _) = h
        .send(Request::post("/api/load-model").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn load_failure_is_500_and_clears_the_slot() {
    let h = Harness::new();
    h.load("llava:7b").await;

    let (status, body) = h.load("missing-model").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to load model");

    let (_, health) = h.get("/api/health").await;
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["status"], "loading");
    // The id of the last successful load is kept.
    assert_eq!(health["model_id"], "llava:7b");

    assert_eq!(
        h.journal.events(),
        vec!["load:llava:7b:auto", "release:llava:7b", "load:missing-model:auto"]
    );
}

#[tokio::test]
async fn load_releases_the_previous_model_first() {
    let h = Harness::new();
    h.load("first").await;
    let (status, _) = h.load("second").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        h.journal.events(),
        vec!["load:first:auto", "release:first", "load:second:auto"]
    );
    assert_eq!(services::model::status(&h.state).await.as_deref(), Some("second"));
}

#[tokio::test]
async fn release_failure_of_previous_model_is_ignored() {
    let h = Harness::new();
    h.load("sticky-model").await;

    let (status, body) = h.load("next-model").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_id"], "next-model");
}

/// Waits until the fake backend has entered the load call for `model_id`.
async fn wait_for_load_call(h: &Harness, model_id: &str) {
    let marker = format!("load:{model_id}:");
    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.journal.events().iter().any(|e| e.starts_with(&marker)) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("backend load call started");
}

#[tokio::test]
async fn health_and_stats_answer_while_a_load_is_pending() {
    let h = Harness::new();
    h.load("llava:7b").await;

    let state = h.state.clone();
    let pending = tokio::spawn(async move { services::model::load(&state, "gated-model").await });
    wait_for_load_call(&h, "gated-model").await;

    let (status, health) = tokio::time::timeout(Duration::from_secs(1), h.get("/api/health"))
        .await
        .expect("health answered during load");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "loading");
    assert_eq!(health["model_loaded"], false);

    let (status, stats) = tokio::time::timeout(Duration::from_secs(1), h.get("/api/stats"))
        .await
        .expect("stats answered during load");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["model_id"], "None");

    h.gate.notify_one();
    assert!(pending.await.unwrap().is_ok());

    let (_, health) = h.get("/api/health").await;
    assert_eq!(health["status"], "ready");
    assert_eq!(health["model_id"], "gated-model");
}

#[tokio::test]
async fn unload_waits_for_a_pending_load() {
    let h = Harness::new();

    let state = h.state.clone();
    let pending = tokio::spawn(async move { services::model::load(&state, "gated-model").await });
    wait_for_load_call(&h, "gated-model").await;

    let state = h.state.clone();
    let unload = tokio::spawn(async move { services::model::unload(&state).await });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!unload.is_finished());

    h.gate.notify_one();
    assert!(pending.await.unwrap().is_ok());
    assert!(unload.await.unwrap().is_ok());

    assert_eq!(services::model::status(&h.state).await, None);
    assert_eq!(
        h.journal.events(),
        vec!["load:gated-model:auto", "release:gated-model"]
    );
}

#[tokio::test]
async fn unload_twice_second_is_nothing_loaded() {
    let h = Harness::new();
    h.load("llava:7b").await;

    let (status, body) = h.unload().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Model unloaded successfully");
    assert_eq!(body["memory_usage"], "12.00 MB");

    let (status, body) = h.unload().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No model is currently loaded");
}

#[tokio::test]
async fn unload_clears_slot_even_if_release_fails() {
    let h = Harness::new();
    h.load("sticky-model").await;

    let (status, _) = h.unload().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(services::model::status(&h.state).await, None);
}

#[tokio::test]
async fn stats_reports_slot_and_host() {
    let h = Harness::new();

    let (status, body) = h.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "model_loaded": false,
            "model_id": "None",
            "memory_usage": "12.00 MB",
            "device": "CPU",
            "success": true,
        })
    );

    h.load("llava:7b").await;
    let (_, body) = h.get("/api/stats").await;
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_id"], "llava:7b");
}

#[tokio::test]
async fn stats_with_unreadable_memory_uses_sentinel() {
    let h = Harness::with(
        FakeProbe {
            memory: None,
            ..Default::default()
        },
        lumen_config::DEFAULT_MAX_UPLOAD_BYTES,
    );

    let (status, body) = h.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["memory_usage"], "N/A");
}

#[tokio::test]
async fn stats_probe_failure_is_500_with_best_effort_state() {
    let h = Harness::with(
        FakeProbe {
            device_fails: true,
            ..Default::default()
        },
        lumen_config::DEFAULT_MAX_UPLOAD_BYTES,
    );
    h.load("llava:7b").await;

    let (status, body) = h.get("/api/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_id"], "llava:7b");
    assert_eq!(body["device"], "Unknown");
    assert_eq!(body["memory_usage"], "N/A");
    assert_eq!(body["error"], "driver query failed");
}

#[tokio::test]
async fn load_with_failing_device_probe_reports_unknown() {
    let h = Harness::with(
        FakeProbe {
            device_fails: true,
            ..Default::default()
        },
        lumen_config::DEFAULT_MAX_UPLOAD_BYTES,
    );

    let (status, body) = h.load("llava:7b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"], "Unknown");
}

#[tokio::test]
async fn bootstrap_failure_leaves_server_degraded() {
    let h = Harness::new();

    assert!(!services::model::bootstrap(&h.state, "missing-default").await);

    let (status, health) = h.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "loading");
    assert_eq!(health["model_loaded"], false);
}

#[tokio::test]
async fn bootstrap_success_makes_server_ready() {
    let h = Harness::new();

    assert!(services::model::bootstrap(&h.state, "default-model").await);

    let (_, health) = h.get("/api/health").await;
    assert_eq!(health["status"], "ready");
    assert_eq!(health["model_id"], "default-model");
}

#[tokio::test]
async fn index_page_is_served() {
    let h = Harness::new();

    let response = tower::ServiceExt::oneshot(
        h.app.clone(),
        Request::get("/").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
