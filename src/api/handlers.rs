//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CreateSessionResponse, CredentialRequest, ErrorResponse, HealthResponse, OkResponse,
    SendMessageRequest, SendMessageResponse, SuccessResponse, SuggestionRequest,
};
use super::AppState;
use crate::auth::SessionAuthBridge;
use crate::backend::ChatBackend;
use crate::runtime::{SessionHandle, SessionSnapshot};
use crate::state_machine::Event;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/chat/sessions", post(create_session))
        .route(
            "/api/chat/sessions/:id",
            get(get_session).delete(destroy_session),
        )
        // SSE streaming
        .route("/api/chat/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/chat/sessions/:id/messages", post(send_message))
        .route("/api/chat/sessions/:id/suggestions", post(apply_suggestion))
        .route("/api/chat/sessions/:id/clear", post(clear_session))
        // Login layer
        .route(
            "/api/credential",
            put(set_credential).delete(clear_credential),
        )
        .route("/api/health", get(health))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn lookup(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let handle = state.sessions.create().await;
    Ok(Json(CreateSessionResponse {
        session_id: handle.session_id,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = lookup(&state, &id).await?;
    Ok(Json(handle.snapshot()))
}

async fn destroy_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.sessions.destroy(&id).await {
        return Err(AppError::NotFound(format!("Session not found: {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    // Subscribe before snapshotting so nothing falls between the two
    let broadcast_rx = handle.subscribe();
    Ok(sse_stream(handle.snapshot(), broadcast_rx))
}

// ============================================================
// User Actions
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let handle = lookup(&state, &id).await?;

    if req.text.trim().is_empty() {
        return Ok(Json(SendMessageResponse { queued: false }));
    }
    // Advisory only; the session itself drops submissions while busy
    let queued = !handle.snapshot().busy;

    handle
        .send(Event::user_message(req.text))
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(SendMessageResponse { queued }))
}

async fn apply_suggestion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SuggestionRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let handle = lookup(&state, &id).await?;
    handle
        .send(Event::SuggestionClicked { text: req.text })
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(OkResponse { ok: true }))
}

async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    let handle = lookup(&state, &id).await?;
    handle
        .send(Event::Clear)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(OkResponse { ok: true }))
}

// ============================================================
// Credential
// ============================================================

async fn set_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.token.trim().is_empty() {
        return Err(AppError::BadRequest("Token must not be empty".to_string()));
    }
    state.credentials.set(req.token);
    tracing::info!("Credential updated");
    Ok(Json(SuccessResponse { success: true }))
}

async fn clear_credential(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.credentials.clear();
    tracing::info!("Credential cleared");
    Json(SuccessResponse { success: true })
}

// ============================================================
// Health & Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let probe = state.sessions.dispatcher().backend().health().await;
    let (backend, backend_error) = match probe {
        Ok(health) => (Some(health), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.session_count().await,
        credential_present: state.credentials.credential().is_some(),
        backend,
        backend_error,
    })
}

async fn get_version() -> &'static str {
    concat!("compass-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    /// The session is still mapped but its task has stopped
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
