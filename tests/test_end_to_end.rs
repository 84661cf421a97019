//! Full stack: config -> real HTTP backends -> dispatcher -> router.
//!
//! One local axum server stands in for all four provider APIs, so every
//! request below crosses the real wire formats.

use axum::body::{Body, to_bytes};
use axum::extract::{Path, State};
use axum::http::{Method, Request, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use quartet::{Config, Dispatcher, ProviderRole, router};
use quartet_prompt_template::MISSING_PLAN_NOTICE;

#[derive(Clone, Default)]
struct Providers {
    /// `(provider, request body)` in arrival order
    calls: Arc<Mutex<Vec<(&'static str, Value)>>>,
    fail_gemini: Arc<Mutex<bool>>,
}

impl Providers {
    fn record(&self, provider: &'static str, body: Value) {
        self.calls.lock().unwrap().push((provider, body));
    }

    fn order(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    fn bodies_for(&self, provider: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == provider)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

fn chat_reply(text: &str) -> Json<Value> {
    Json(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}))
}

async fn perplexity(State(s): State<Providers>, Json(body): Json<Value>) -> Json<Value> {
    s.record("perplexity", body);
    chat_reply("search notes")
}

async fn openai(State(s): State<Providers>, Json(body): Json<Value>) -> Json<Value> {
    s.record("openai", body);
    chat_reply("reasoning ideas")
}

async fn gemini(
    State(s): State<Providers>,
    Path(_call): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    s.record("gemini", body);
    if *s.fail_gemini.lock().unwrap() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "backend exploded"}})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"candidates": [{"content": {"parts": [{"text": "synthesis plan"}]}}]})),
    )
}

async fn anthropic(State(s): State<Providers>, Json(body): Json<Value>) -> Json<Value> {
    s.record("anthropic", body);
    Json(json!({"content": [{"type": "text", "text": "long-form report"}]}))
}

async fn spawn_providers() -> (String, Providers) {
    let state = Providers::default();
    let app = Router::new()
        .route("/perplexity/chat/completions", post(perplexity))
        .route("/openai/chat/completions", post(openai))
        .route("/gemini/models/{call}", post(gemini))
        .route("/anthropic/messages", post(anthropic))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn app() -> (Router, Providers) {
    let (base, providers) = spawn_providers().await;
    let config = Config::builder()
        .http_max_retries(0)
        .provider_base_url(ProviderRole::Search, format!("{base}/perplexity"))
        .provider_base_url(ProviderRole::Reasoning, format!("{base}/openai"))
        .provider_base_url(ProviderRole::Synthesis, format!("{base}/gemini"))
        .provider_base_url(ProviderRole::LongForm, format!("{base}/anthropic"))
        .build()
        .unwrap();

    let set = quartet_llm::from_config_with(&config, |_| Some("test-key".to_string())).unwrap();
    let dispatcher = Dispatcher::from_config(&config, set);
    (router(Arc::new(dispatcher)), providers)
}

async fn chat(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_essay_crosses_all_four_providers_in_order() {
    let (app, providers) = app().await;

    let (status, body) = chat(
        &app,
        json!({"mode": "essay", "user_input": "Should school uniforms be mandatory?"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "long-form report");
    assert_eq!(
        providers.order(),
        vec!["perplexity", "openai", "gemini", "anthropic"]
    );

    let polish = providers.bodies_for("anthropic").remove(0).to_string();
    for earlier in ["search notes", "reasoning ideas", "synthesis plan"] {
        assert!(polish.contains(earlier), "polish request lacks {earlier}");
    }
}

#[tokio::test]
async fn test_reasoning_role_carries_tutor_system_prompt() {
    let (app, providers) = app().await;
    chat(&app, json!({"mode": "C", "user_input": "science fair"})).await;

    let body = providers.bodies_for("openai").remove(0);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_inquiry_plan_then_report() {
    let (app, providers) = app().await;

    let (_, early) = chat(
        &app,
        json!({"mode": "A", "user_input": "Now write up the inquiry report for direction 1"}),
    )
    .await;
    assert_eq!(early["answer"], MISSING_PLAN_NOTICE);
    assert!(providers.order().is_empty());

    let (status, plan) = chat(
        &app,
        json!({"mode": "A", "user_input": "Design inquiry directions on microplastics"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["answer"], "synthesis plan");
    assert_eq!(providers.order(), vec!["perplexity", "openai", "gemini"]);

    let (status, report) = chat(
        &app,
        json!({"mode": "A", "user_input": "Now write up the inquiry report for direction 1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["answer"], "long-form report");
    assert_eq!(
        providers.order(),
        vec!["perplexity", "openai", "gemini", "gemini", "anthropic"]
    );

    let outline_request = providers.bodies_for("gemini").remove(1).to_string();
    assert!(outline_request.contains("synthesis plan"));
}

#[tokio::test]
async fn test_provider_error_becomes_500_and_stops_the_chain() {
    let (app, providers) = app().await;
    *providers.fail_gemini.lock().unwrap() = true;

    let (status, body) = chat(&app, json!({"mode": "research", "user_input": "tides"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Internal server error (AI call or processing failed): "));
    assert!(detail.contains("research.restructure"));
    assert_eq!(providers.order(), vec!["perplexity", "gemini"]);
}
