//! OpenAI extractor against a local mock of the chat-completions API

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use ysr_common::config::TomlConfig;
use ysr_import::config::OpenAiConfig;
use ysr_import::models::Row;
use ysr_import::services::OpenAiExtractor;
use ysr_import::types::{EntityKind, ExtractedBatch, ExtractionError, RecordExtractor};

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    /// Last request body and Authorization header seen by the mock
    seen: Arc<Mutex<Option<(Value, String)>>>,
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    *state.seen.lock().unwrap() = Some((request, auth));
    (state.status, Json(state.body.clone()))
}

/// Start a mock server and return an extractor pointed at it
async fn mock_extractor(status: StatusCode, body: Value) -> (OpenAiExtractor, MockState) {
    let state = MockState {
        status,
        body,
        seen: Arc::new(Mutex::new(None)),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = OpenAiConfig::from_toml("sk-test-key".to_string(), &TomlConfig::default());
    config.base_url = format!("http://{}/v1/", addr);
    config.timeout_secs = 5;

    (OpenAiExtractor::new(config).unwrap(), state)
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn rows() -> Vec<Row> {
    vec![[("Name", "Ana Ruiz"), ("Student ID", "A-100")]
        .into_iter()
        .collect()]
}

#[tokio::test]
async fn test_participants_extracted_from_fenced_reply() {
    let reply = "```json\n[{\"name\":\"Ana Ruiz\",\"dateOfBirth\":\"2012-04-09\",\
                 \"identificationNumber\":\"A-100\",\"programs\":\"Robotics\"}]\n```";
    let (extractor, state) = mock_extractor(StatusCode::OK, completion(reply)).await;

    let batch = extractor
        .extract(&rows(), EntityKind::Participant)
        .await
        .unwrap();

    match batch {
        ExtractedBatch::Participants(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].identification_number, "A-100");
            assert_eq!(records[0].programs, vec!["Robotics"]);
            assert_eq!(records[0].school, "");
        }
        other => panic!("unexpected batch: {:?}", other),
    }

    let (request, auth) = state.seen.lock().unwrap().clone().unwrap();
    assert_eq!(auth, "Bearer sk-test-key");
    assert_eq!(request["model"], "gpt-4o-mini");
    assert_eq!(request["max_tokens"], 4000);
    assert_eq!(request["messages"][0]["role"], "system");
    assert!(request["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("A-100"));
}

#[tokio::test]
async fn test_api_error_status_reported() {
    let (extractor, _) = mock_extractor(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "Incorrect API key provided"}}),
    )
    .await;

    let err = extractor
        .extract(&rows(), EntityKind::Program)
        .await
        .unwrap_err();

    match err {
        ExtractionError::Api { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let (extractor, _) = mock_extractor(StatusCode::OK, json!({"choices": []})).await;

    let err = extractor
        .extract(&rows(), EntityKind::Program)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::EmptyResponse));
}

#[tokio::test]
async fn test_prose_reply_is_invalid_json() {
    let (extractor, _) =
        mock_extractor(StatusCode::OK, completion("Sorry, I cannot help with that.")).await;

    let err = extractor
        .extract(&rows(), EntityKind::Participant)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::InvalidJson(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_request_error() {
    let mut config = OpenAiConfig::from_toml("sk-test-key".to_string(), &TomlConfig::default());
    // Port 9 (discard) is not expected to accept HTTP connections
    config.base_url = "http://127.0.0.1:9/v1".to_string();
    config.timeout_secs = 2;
    let extractor = OpenAiExtractor::new(config).unwrap();

    let err = extractor
        .extract(&rows(), EntityKind::Participant)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Request(_)));
}
