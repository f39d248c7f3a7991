//! API request and response types

use crate::backend::BackendHealth;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Request to apply a suggested follow-up
#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub text: String,
}

/// Request to set the process-wide credential
#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub token: String,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Response for send action
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Advisory. False for blank text, or when the last published snapshot
    /// was busy. The snapshot can lag the session, so `true` does not promise
    /// a reply: the session still drops a submission that races an
    /// outstanding request. Follow `busy_changed` and `turn_appended` on the
    /// stream for the authoritative outcome.
    pub queued: bool,
}

/// Response for fire-and-forget actions
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Service health, including the backend probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub credential_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
