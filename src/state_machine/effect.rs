//! Effects produced by state transitions

use crate::backend::{ChatReply, DispatchErrorKind};
use crate::reveal::RevealId;
use uuid::Uuid;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append the user turn, then dispatch it with the prior turns as history
    SubmitUserTurn { request_id: Uuid, text: String },

    /// Append a pending assistant turn and start revealing it
    AppendReplyTurn { reply: ChatReply },

    /// Append the fixed apology turn (already complete)
    AppendFallbackTurn { kind: DispatchErrorKind },

    /// Hand a reveal completion to the gate
    CompleteReveal { reveal: RevealId },

    /// Copy a suggestion into the pending input
    PrefillInput { text: String },

    /// Stop the running reveal, if any
    CancelReveal,

    /// Drop every turn
    ClearConversation,

    /// Waiting indicator changed
    NotifyBusy { busy: bool },

    /// Session torn down
    NotifyClosed,
}
