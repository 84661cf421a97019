//! HTTP boundary for quartet
//!
//! - `POST /chat` `{ mode, user_input, session_id? }` -> `200 { answer }`
//! - `GET /health` -> `200 { status: "ok" }`
//!
//! An unknown mode or malformed body answers `422 { detail }`; any pipeline
//! failure answers `500 { detail }` with the cause redacted. CORS is
//! permissive.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use quartet_orchestrator::{ChatRequest, Dispatcher, OrchestrationError};

/// Prefix of every 500 response's `detail`.
pub const INTERNAL_ERROR_PREFIX: &str = "Internal server error (AI call or processing failed): ";

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    mode: String,
    user_input: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatAnswer {
    answer: String,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

/// Routes with permissive CORS, ready to serve or drive with `oneshot`.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { dispatcher })
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Fails if the listener cannot bind or the server stops with an I/O error.
pub async fn serve(dispatcher: Arc<Dispatcher>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr().context("failed to read bound address")?;
    info!(addr = %local, "quartet listening");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let Json(body) = body.map_err(|rejection| unprocessable(rejection.body_text()))?;

    let request =
        ChatRequest::parse(&body.mode, body.user_input, body.session_id.as_deref())
            .map_err(map_orchestration_error)?;

    let answer = state
        .dispatcher
        .handle(&request)
        .await
        .map_err(map_orchestration_error)?;

    Ok(Json(ChatAnswer { answer }))
}

fn unprocessable(detail: String) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorDetail { detail }))
}

fn map_orchestration_error(err: OrchestrationError) -> ApiError {
    let public = err.public_message();
    match err {
        OrchestrationError::Validation(_) => {
            warn!(error = %public, "Rejected chat request");
            unprocessable(public)
        }
        OrchestrationError::Provider { .. } | OrchestrationError::Internal(_) => {
            error!(error = %public, "Chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: format!("{INTERNAL_ERROR_PREFIX}{public}"),
                }),
            )
        }
    }
}
