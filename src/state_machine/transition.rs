//! Pure state transition function
//!
//! Single-flight dispatch, stale-reply filtering and teardown are all
//! decided here, at one choke point.

use super::{Effect, Event, SessionState};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// State unchanged and nothing to do
    pub fn is_noop(&self, previous: &SessionState) -> bool {
        self.effects.is_empty() && self.new_state == *previous
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session has been torn down")]
    SessionClosed,
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Nothing reaches a torn-down session, including late replies
        (SessionState::Closed, _) => Err(TransitionError::SessionClosed),

        (_, Event::Teardown) => Ok(TransitionResult::new(SessionState::Closed)
            .with_effect(Effect::CancelReveal)
            .with_effect(Effect::NotifyClosed)),

        // ============================================================
        // User submissions
        // ============================================================

        (SessionState::Idle, Event::UserMessage { text, request_id }) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(TransitionResult::new(*state));
            }
            Ok(
                TransitionResult::new(SessionState::AwaitingResponse { request_id })
                    .with_effect(Effect::SubmitUserTurn {
                        request_id,
                        text: text.to_string(),
                    })
                    .with_effect(Effect::NotifyBusy { busy: true }),
            )
        }

        // Single-flight: dropped, not queued, not an error
        (SessionState::AwaitingResponse { .. }, Event::UserMessage { .. }) => {
            Ok(TransitionResult::new(*state))
        }

        // ============================================================
        // Backend outcomes
        // ============================================================

        (
            SessionState::AwaitingResponse {
                request_id: pending,
            },
            Event::ReplyReceived { request_id, reply },
        ) if *pending == request_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::AppendReplyTurn { reply })
            .with_effect(Effect::NotifyBusy { busy: false })),

        (
            SessionState::AwaitingResponse {
                request_id: pending,
            },
            Event::DispatchFailed { request_id, error },
        ) if *pending == request_id => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::AppendFallbackTurn { kind: error.kind })
            .with_effect(Effect::NotifyBusy { busy: false })),

        // Outcome of a request that was cleared away
        (_, Event::ReplyReceived { .. } | Event::DispatchFailed { .. }) => {
            Ok(TransitionResult::new(*state))
        }

        // ============================================================
        // Reveal and input
        // ============================================================

        (_, Event::RevealCompleted { reveal }) => {
            Ok(TransitionResult::new(*state).with_effect(Effect::CompleteReveal { reveal }))
        }

        (_, Event::SuggestionClicked { text }) => {
            Ok(TransitionResult::new(*state).with_effect(Effect::PrefillInput { text }))
        }

        // ============================================================
        // Clear
        // ============================================================

        (SessionState::AwaitingResponse { .. }, Event::Clear) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::CancelReveal)
                .with_effect(Effect::ClearConversation)
                .with_effect(Effect::NotifyBusy { busy: false }))
        }

        (SessionState::Idle, Event::Clear) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::CancelReveal)
            .with_effect(Effect::ClearConversation)),
    }
}
