//! Session state types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dispatch state of a chat session.
///
/// Reveal progress is tracked per turn in the conversation store; this
/// only covers the request/response cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for user input, no request outstanding
    #[default]
    Idle,

    /// One request in flight; further submissions are dropped
    AwaitingResponse { request_id: Uuid },

    /// Torn down by the owning view; absorbs every event
    Closed,
}

impl SessionState {
    /// Drives the waiting indicator and disables duplicate submissions
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::AwaitingResponse { .. })
    }

    pub fn is_closed(self) -> bool {
        matches!(self, SessionState::Closed)
    }
}
