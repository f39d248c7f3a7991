//! Backend wire types

use crate::conversation::{Citation, Role};
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// One prior turn as the backend sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Successful chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response_text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl ChatReply {
    pub fn text(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            citations: Vec::new(),
            suggested_actions: Vec::new(),
            intent: None,
        }
    }
}

/// Error body, either `{ error }` or `{ success: false, error }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
