//! Backends against a local mock of each provider API.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quartet_llm::{
    AnthropicBackend, AnthropicParams, ChatParams, GeminiBackend, HttpClient, LlmBackend,
    LlmError, LlmInvocation, Message, OpenAiCompatibleBackend,
};

#[derive(Clone, Default)]
struct MockState {
    bodies: Arc<Mutex<Vec<Value>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    flaky_hits: Arc<AtomicUsize>,
}

impl MockState {
    fn record(&self, headers: HeaderMap, body: Value) {
        self.headers.lock().unwrap().push(headers);
        self.bodies.lock().unwrap().push(body);
    }

    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap()
    }

    fn last_header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .last()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record(headers, body);
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": "chat answer"}}],
        "usage": {"prompt_tokens": 11, "completion_tokens": 7},
        "citations": ["https://example.org/source"]
    }))
}

async fn gemini(
    State(state): State<MockState>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Json<Value> {
    body["_call"] = json!(call);
    state.record(headers, body);
    Json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "gemini "}, {"text": "answer"}]}}],
        "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2}
    }))
}

async fn gemini_blocked(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    state.record(headers, json!({}));
    Json(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
}

async fn anthropic(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record(headers, body);
    Json(json!({
        "content": [
            {"type": "text", "text": "first half, "},
            {"type": "text", "text": "second half"}
        ],
        "usage": {"input_tokens": 20, "output_tokens": 9}
    }))
}

async fn flaky(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    if state.flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})))
    } else {
        (
            StatusCode::OK,
            Json(json!({"choices": [{"message": {"content": "recovered"}}]})),
        )
    }
}

async fn always_down(State(state): State<MockState>) -> StatusCode {
    state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::BAD_GATEWAY
}

async fn denied(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": "Incorrect API key provided"}})),
    )
}

async fn rate_limited() -> StatusCode {
    StatusCode::TOO_MANY_REQUESTS
}

async fn spawn_mock() -> (String, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/gemini/models/{call}", post(gemini))
        .route("/blocked/models/{call}", post(gemini_blocked))
        .route("/anthropic/messages", post(anthropic))
        .route("/flaky/chat/completions", post(flaky))
        .route("/down/chat/completions", post(always_down))
        .route("/denied/chat/completions", post(denied))
        .route("/limited/chat/completions", post(rate_limited))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn client(max_retries: u32) -> Arc<HttpClient> {
    Arc::new(
        HttpClient::with_settings(Duration::from_secs(10), max_retries)
            .unwrap()
            .with_initial_backoff(Duration::from_millis(10)),
    )
}

fn invocation(messages: Vec<Message>) -> LlmInvocation {
    LlmInvocation::new("research", "gather", "", Duration::from_secs(10), messages)
}

fn chat_backend(base: &str, name: &str, retries: u32) -> OpenAiCompatibleBackend {
    OpenAiCompatibleBackend::new(
        client(retries),
        name,
        "sk-test-key".to_string(),
        base,
        "sonar".to_string(),
        ChatParams {
            max_tokens: None,
            temperature: Some(0.2),
        },
    )
}

#[tokio::test]
async fn test_chat_completions_round_trip() {
    let (base, state) = spawn_mock().await;
    let backend = chat_backend(&format!("{base}/v1"), "perplexity", 0);

    let result = backend
        .invoke(invocation(vec![Message::user("What is photosynthesis?")]))
        .await
        .unwrap();

    assert_eq!(result.raw_response, "chat answer");
    assert_eq!(result.provider, "perplexity");
    assert_eq!(result.model_used, "sonar");
    assert_eq!(result.tokens_input, Some(11));
    assert_eq!(result.tokens_output, Some(7));
    assert_eq!(
        result.extensions["citations"],
        json!(["https://example.org/source"])
    );

    let body = state.last_body();
    assert_eq!(body["model"], "sonar");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "What is photosynthesis?");
    assert_eq!(body["stream"], false);
    assert_eq!(
        state.last_header("authorization").as_deref(),
        Some("Bearer sk-test-key")
    );
}

#[tokio::test]
async fn test_gemini_round_trip() {
    let (base, state) = spawn_mock().await;
    let backend = GeminiBackend::new(
        client(0),
        "gemini-key".to_string(),
        &format!("{base}/gemini"),
        "gemini-2.0-flash".to_string(),
        ChatParams::default(),
    );

    let result = backend
        .invoke(invocation(vec![
            Message::system("structure it"),
            Message::user("notes"),
        ]))
        .await
        .unwrap();

    assert_eq!(result.raw_response, "gemini answer");
    assert_eq!(result.tokens_input, Some(5));

    let body = state.last_body();
    assert_eq!(body["_call"], "gemini-2.0-flash:generateContent");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "notes");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "structure it");
    assert_eq!(
        state.last_header("x-goog-api-key").as_deref(),
        Some("gemini-key")
    );
}

#[tokio::test]
async fn test_gemini_without_candidates_is_transport_error() {
    let (base, _state) = spawn_mock().await;
    let backend = GeminiBackend::new(
        client(0),
        "gemini-key".to_string(),
        &format!("{base}/blocked"),
        "gemini-2.0-flash".to_string(),
        ChatParams::default(),
    );

    let err = backend
        .invoke(invocation(vec![Message::user("x")]))
        .await
        .unwrap_err();
    match err {
        LlmError::Transport(msg) => assert!(msg.contains("SAFETY")),
        other => panic!("Expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_anthropic_round_trip_joins_text_blocks() {
    let (base, state) = spawn_mock().await;
    let backend = AnthropicBackend::new(
        client(0),
        "anthropic-key".to_string(),
        &format!("{base}/anthropic"),
        "claude-3-haiku-20240307".to_string(),
        AnthropicParams::default(),
    );

    let result = backend
        .invoke(invocation(vec![Message::user("polish this")]))
        .await
        .unwrap();

    assert_eq!(result.raw_response, "first half, second half");
    assert_eq!(result.tokens_output, Some(9));

    let body = state.last_body();
    assert_eq!(body["max_tokens"], 1500);
    assert_eq!(body["model"], "claude-3-haiku-20240307");
    assert!(body.get("system").is_none());
    assert_eq!(
        state.last_header("x-api-key").as_deref(),
        Some("anthropic-key")
    );
    assert_eq!(
        state.last_header("anthropic-version").as_deref(),
        Some("2023-06-01")
    );
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (base, state) = spawn_mock().await;
    let backend = chat_backend(&format!("{base}/flaky"), "openai", 2);

    let result = backend
        .invoke(invocation(vec![Message::user("hi")]))
        .await
        .unwrap();

    assert_eq!(result.raw_response, "recovered");
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_persistent_server_error_becomes_outage() {
    let (base, state) = spawn_mock().await;
    let backend = chat_backend(&format!("{base}/down"), "openai", 1);

    let err = backend
        .invoke(invocation(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::ProviderOutage(_)));
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let (base, state) = spawn_mock().await;
    let backend = chat_backend(&format!("{base}/denied"), "openai", 3);

    let err = backend
        .invoke(invocation(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    match err {
        LlmError::ProviderAuth(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("Incorrect API key provided"));
        }
        other => panic!("Expected ProviderAuth, got {other:?}"),
    }
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rate_limit_maps_to_quota() {
    let (base, _state) = spawn_mock().await;
    let backend = chat_backend(&format!("{base}/limited"), "perplexity", 0);

    let err = backend
        .invoke(invocation(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ProviderQuota(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = chat_backend(&format!("http://{addr}"), "openai", 0);
    let err = backend
        .invoke(invocation(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)));
}
