//! Events that can occur in a chat session

use crate::backend::{ChatReply, DispatchError};
use crate::reveal::RevealId;
use uuid::Uuid;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
        request_id: Uuid,
    },
    SuggestionClicked {
        text: String,
    },
    Clear,

    // Backend events
    ReplyReceived {
        request_id: Uuid,
        reply: ChatReply,
    },
    DispatchFailed {
        request_id: Uuid,
        error: DispatchError,
    },

    // Reveal events
    RevealCompleted {
        reveal: RevealId,
    },

    // Lifecycle
    Teardown,
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage {
            text: text.into(),
            request_id: Uuid::new_v4(),
        }
    }
}
