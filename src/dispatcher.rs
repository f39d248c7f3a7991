//! Message dispatch
//!
//! Builds the backend request from the conversation, attaches the bearer
//! credential, and maps the outcome back into a turn. Single-flight is
//! enforced by the session state machine, not here.

use crate::auth::SessionAuthBridge;
use crate::backend::{ChatBackend, ChatReply, ChatRequest, DispatchError, HistoryEntry};
use crate::conversation::Turn;

/// Shown in place of any failed dispatch
pub const FALLBACK_APOLOGY: &str =
    "Sorry, I couldn't reach the career assistant just now. Please try again in a moment.";

pub struct MessageDispatcher<B, A> {
    backend: B,
    auth: A,
}

impl<B: ChatBackend, A: SessionAuthBridge> MessageDispatcher<B, A> {
    pub fn new(backend: B, auth: A) -> Self {
        Self { backend, auth }
    }

    /// Serialize prior turns plus the new message.
    ///
    /// Local error fallbacks are left out; the backend never produced them.
    pub fn build_request(prior_turns: &[Turn], message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            conversation_history: prior_turns
                .iter()
                .filter(|t| !t.is_fallback())
                .map(|t| HistoryEntry {
                    role: t.role,
                    content: t.content.clone(),
                })
                .collect(),
        }
    }

    /// Issue one request. A missing credential fails before any network I/O.
    pub async fn dispatch(&self, request: &ChatRequest) -> Result<ChatReply, DispatchError> {
        let credential = self
            .auth
            .credential()
            .ok_or_else(|| DispatchError::auth("No credential available"))?;
        self.backend.chat(&credential, request).await
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// New pending assistant turn carrying the reply's metadata
    pub fn reply_turn(reply: ChatReply) -> Turn {
        Turn::reply(
            reply.response_text,
            reply.citations,
            reply.suggested_actions,
            reply.intent,
        )
    }

    /// Fixed apology turn; complete immediately, nothing to reveal
    pub fn fallback_turn() -> Turn {
        Turn::fallback(FALLBACK_APOLOGY)
    }
}
