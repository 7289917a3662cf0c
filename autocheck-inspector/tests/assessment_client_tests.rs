//! Gemini client tests against a local stub backend
//!
//! The stub is a small axum app bound to an ephemeral port, so the real
//! reqwest transport path is exercised without leaving the machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use autocheck_common::events::EventBus;
use autocheck_inspector::models::{ImageUpload, RoomStatus};
use autocheck_inspector::services::{
    AssessmentError, GeminiClient, GeminiConfig, RoomAssessor, RoomRegistry,
};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

const API_KEY: &str = "stub-key";

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: Value,
    delay: Duration,
    seen: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Stub {
    fn answering(analysis: Value) -> Self {
        Self::raw(
            StatusCode::OK,
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": analysis.to_string() }], "role": "model" },
                    "finishReason": "STOP"
                }]
            }),
        )
    }

    fn raw(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn generate_content(
    State(stub): State<Stub>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.seen.lock().unwrap().push((call, key, request));

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }
    (stub.status, Json(stub.body.clone()))
}

/// Serve the stub on 127.0.0.1 and return its base URL
async fn spawn_stub(stub: Stub) -> String {
    let app = Router::new()
        .route("/v1beta/models/:call", post(generate_content))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: String, timeout: Duration) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        api_key: API_KEY.to_string(),
        model: "test-model".to_string(),
        base_url,
        timeout,
        response_language: "Spanish".to_string(),
    })
    .unwrap()
}

fn valid_analysis() -> Value {
    json!({
        "roomName": "Baño",
        "score": 92,
        "summary": "Muy limpio",
        "issues": ["Marcas de agua en la mampara"],
        "tips": ["Secar la mampara tras cada uso"]
    })
}

fn photo() -> ImageUpload {
    ImageUpload::new(vec![0xFFu8, 0xD8, 0xFF, 0xE0], "image/jpeg")
}

#[tokio::test]
async fn test_successful_assessment() {
    let stub = Stub::answering(valid_analysis());
    let seen = stub.seen.clone();
    let base_url = spawn_stub(stub).await;

    let analysis = client(base_url, Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap();

    assert_eq!(analysis.room_label, "Baño");
    assert_eq!(analysis.score, 92);
    assert_eq!(analysis.issues, vec!["Marcas de agua en la mampara"]);
    assert_eq!(analysis.tips, vec!["Secar la mampara tras cada uso"]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (call, key, request) = &seen[0];
    assert_eq!(call, "test-model:generateContent");
    assert_eq!(key.as_deref(), Some(API_KEY));

    let parts = &request["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[0]["inlineData"]["data"], "/9j/4A==");
    assert!(parts[1]["text"].as_str().unwrap().contains("in Spanish"));
    assert_eq!(request["generationConfig"]["responseMimeType"], "application/json");
}

#[tokio::test]
async fn test_error_status_is_transport_error() {
    let base_url = spawn_stub(Stub::raw(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": { "code": 503, "message": "overloaded" } }),
    ))
    .await;

    let err = client(base_url, Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap_err();
    match err {
        AssessmentError::Transport(msg) => assert!(msg.contains("503")),
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}", addr), Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Transport(_)));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let mut stub = Stub::answering(valid_analysis());
    stub.delay = Duration::from_secs(3);
    let base_url = spawn_stub(stub).await;

    let err = client(base_url, Duration::from_millis(200))
        .assess(&photo())
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Transport(_)));
}

#[tokio::test]
async fn test_missing_candidates_is_malformed() {
    let base_url = spawn_stub(Stub::raw(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    ))
    .await;

    let err = client(base_url, Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_out_of_range_score_is_malformed() {
    let mut analysis = valid_analysis();
    analysis["score"] = json!(140);
    let base_url = spawn_stub(Stub::answering(analysis)).await;

    let err = client(base_url, Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AssessmentError::MalformedResponse("score 140 outside 0-100".to_string())
    );
}

#[tokio::test]
async fn test_missing_field_is_malformed() {
    let mut analysis = valid_analysis();
    analysis.as_object_mut().unwrap().remove("tips");
    let base_url = spawn_stub(Stub::answering(analysis)).await;

    let err = client(base_url, Duration::from_secs(5))
        .assess(&photo())
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_registry_surfaces_backend_failure_as_room_error() {
    let mut analysis = valid_analysis();
    analysis["score"] = json!("noventa");
    let base_url = spawn_stub(Stub::answering(analysis)).await;

    let registry = RoomRegistry::new(
        Arc::new(client(base_url, Duration::from_secs(5))),
        EventBus::new(16),
    );
    let id = registry.add(photo()).await;
    tokio::time::timeout(Duration::from_secs(10), registry.settle())
        .await
        .expect("assessment did not finish");

    let room = registry.room(id).await.unwrap();
    assert_eq!(room.status, RoomStatus::Error);
    assert!(room.error_message.unwrap().contains("score is not an integer"));
    assert_eq!(registry.global().await.score, 0);
}
