//! Chat session executor

use super::{SessionEvent, SessionSnapshot};
use crate::auth::SessionAuthBridge;
use crate::backend::{ChatBackend, DispatchErrorKind};
use crate::conversation::{ConversationStore, Turn};
use crate::dispatcher::MessageDispatcher;
use crate::reveal::{RevealCadence, RevealGate, RevealId, RevealSink, TypingRevealEngine};
use crate::state_machine::{transition, Effect, Event, SessionState, TransitionError};
use crate::suggestion::{InputBuffer, SuggestionRouter};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Static per-session settings
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub greeting: String,
    pub cadence: RevealCadence,
}

impl SessionContext {
    pub fn new(session_id: &str, greeting: impl Into<String>, cadence: RevealCadence) -> Self {
        Self {
            session_id: session_id.to_string(),
            greeting: greeting.into(),
            cadence,
        }
    }
}

/// Forwards frames to subscribers and completions back into the event loop
struct SessionRevealSink {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

#[async_trait]
impl RevealSink for SessionRevealSink {
    async fn frame(&self, _reveal: RevealId, turn_index: usize, visible: &str) {
        let _ = self.broadcast_tx.send(SessionEvent::RevealFrame {
            index: turn_index,
            visible: visible.to_string(),
        });
    }

    async fn completed(&self, reveal: RevealId, _turn_index: usize) {
        let _ = self.event_tx.send(Event::RevealCompleted { reveal }).await;
    }
}

/// One mounted chat session.
///
/// Owns the conversation store and the reveal machinery; everything that
/// mutates them runs on this task.
pub struct ChatSession<B, A>
where
    B: ChatBackend + 'static,
    A: SessionAuthBridge + 'static,
{
    context: SessionContext,
    state: SessionState,
    store: ConversationStore,
    engine: TypingRevealEngine,
    gate: RevealGate,
    input: InputBuffer,
    dispatcher: Arc<MessageDispatcher<B, A>>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    reveal_sink: Arc<dyn RevealSink>,
    /// Token to abandon the in-flight backend request
    dispatch_cancel: Option<CancellationToken>,
}

impl<B, A> ChatSession<B, A>
where
    B: ChatBackend + 'static,
    A: SessionAuthBridge + 'static,
{
    pub fn new(
        context: SessionContext,
        dispatcher: Arc<MessageDispatcher<B, A>>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        let reveal_sink = Arc::new(SessionRevealSink {
            event_tx: event_tx.clone(),
            broadcast_tx: broadcast_tx.clone(),
        });
        Self {
            context,
            state: SessionState::Idle,
            store: ConversationStore::new(),
            engine: TypingRevealEngine::new(),
            gate: RevealGate::new(),
            input: InputBuffer::default(),
            dispatcher,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
            reveal_sink,
            dispatch_cancel: None,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting chat session");

        if let Err(e) = self.seed_greeting() {
            tracing::error!(error = %e, "Failed to seed greeting");
            let _ = self.broadcast_tx.send(SessionEvent::Error { message: e });
        }
        self.publish_snapshot();

        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::error!(error = %e, "Error handling event");
                        let _ = self.broadcast_tx.send(SessionEvent::Error { message: e });
                    }
                    self.publish_snapshot();
                    if self.state.is_closed() {
                        break;
                    }
                }
                else => break,
            }
        }

        self.engine.cancel_active();
        if let Some(token) = self.dispatch_cancel.take() {
            token.cancel();
        }
        tracing::info!(
            session_id = %self.context.session_id,
            turns = self.store.len(),
            "Chat session stopped"
        );
    }

    fn seed_greeting(&mut self) -> Result<(), String> {
        let index = self.store.initialize(&self.context.greeting);
        self.broadcast_appended(index);
        self.start_reveal(index)
    }

    fn process_event(&mut self, event: Event) -> Result<(), String> {
        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(TransitionError::SessionClosed) => {
                tracing::debug!(session_id = %self.context.session_id, "Event after teardown ignored");
                return Ok(());
            }
        };

        if result.is_noop(&self.state) {
            tracing::debug!(state = ?self.state, "Event ignored");
            return Ok(());
        }
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect)?;
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) -> Result<(), String> {
        match effect {
            Effect::SubmitUserTurn { request_id, text } => {
                self.submit_user_turn(request_id, text);
                Ok(())
            }

            Effect::AppendReplyTurn { reply } => {
                self.dispatch_cancel = None;
                let index = self
                    .store
                    .append(MessageDispatcher::<B, A>::reply_turn(reply));
                self.broadcast_appended(index);
                self.start_reveal(index)
            }

            Effect::AppendFallbackTurn { kind } => {
                self.dispatch_cancel = None;
                if kind == DispatchErrorKind::Auth {
                    tracing::warn!(session_id = %self.context.session_id, "Chat request not authorized");
                }
                let index = self.store.append(MessageDispatcher::<B, A>::fallback_turn());
                self.broadcast_appended(index);
                Ok(())
            }

            Effect::CompleteReveal { reveal } => {
                self.engine.finish(reveal);
                if let Some(index) = self
                    .gate
                    .on_completed(reveal, &mut self.store)
                    .map_err(|e| e.to_string())?
                {
                    self.broadcast_completed(index);
                }
                Ok(())
            }

            Effect::PrefillInput { text } => {
                SuggestionRouter.on_suggestion_clicked(&text, &mut self.input);
                let _ = self.broadcast_tx.send(SessionEvent::InputPrefilled {
                    input: self.input.clone(),
                });
                Ok(())
            }

            Effect::CancelReveal => {
                self.engine.cancel_active();
                self.gate.release();
                Ok(())
            }

            Effect::ClearConversation => {
                if let Some(token) = self.dispatch_cancel.take() {
                    token.cancel();
                }
                if !self.store.is_empty() {
                    tracing::debug!(
                        session_id = %self.context.session_id,
                        discarded = self.store.len(),
                        "Clearing conversation"
                    );
                }
                self.store.clear();
                let _ = self.broadcast_tx.send(SessionEvent::Cleared);
                Ok(())
            }

            Effect::NotifyBusy { busy } => {
                let _ = self.broadcast_tx.send(SessionEvent::BusyChanged { busy });
                Ok(())
            }

            Effect::NotifyClosed => {
                let _ = self.broadcast_tx.send(SessionEvent::Closed);
                Ok(())
            }
        }
    }

    /// Snapshot history, append the user turn, then dispatch in the background
    fn submit_user_turn(&mut self, request_id: Uuid, text: String) {
        let request = MessageDispatcher::<B, A>::build_request(self.store.get_all(), &text);
        self.input.take();
        let index = self.store.append(Turn::user(text));
        self.broadcast_appended(index);

        let token = CancellationToken::new();
        self.dispatch_cancel = Some(token.clone());

        let dispatcher = self.dispatcher.clone();
        let event_tx = self.event_tx.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                result = dispatcher.dispatch(&request) => result,
                () = token.cancelled() => {
                    tracing::debug!(session_id = %session_id, "Chat request abandoned");
                    return;
                }
            };

            let event = match result {
                Ok(reply) => Event::ReplyReceived { request_id, reply },
                Err(error) => Event::DispatchFailed { request_id, error },
            };
            let _ = event_tx.send(event).await;
        });
    }

    /// Start typing out the turn at `index`.
    ///
    /// A reveal still running is superseded: its turn snaps to complete
    /// without a completion signal.
    fn start_reveal(&mut self, index: usize) -> Result<(), String> {
        if let Some(stale) = self.engine.cancel_active() {
            self.gate.release();
            if self
                .store
                .mark_complete(stale.turn_index())
                .map_err(|e| e.to_string())?
            {
                self.broadcast_completed(stale.turn_index());
            }
        }

        self.store.mark_revealing(index).map_err(|e| e.to_string())?;
        let text = self
            .store
            .get(index)
            .map(|t| t.content.clone())
            .ok_or_else(|| format!("No turn at index {index}"))?;

        let handle = self
            .engine
            .start(index, text, self.context.cadence, self.reveal_sink.clone());
        self.gate.watch(&handle);
        Ok(())
    }

    fn broadcast_appended(&self, index: usize) {
        if let Some(turn) = self.store.get(index) {
            let _ = self.broadcast_tx.send(SessionEvent::TurnAppended {
                index,
                turn: turn.view(),
            });
        }
    }

    fn broadcast_completed(&self, index: usize) {
        if let Some(turn) = self.store.get(index) {
            let _ = self.broadcast_tx.send(SessionEvent::TurnCompleted {
                index,
                turn: turn.view(),
            });
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            session_id: self.context.session_id.clone(),
            turns: self.store.get_all().iter().map(|t| t.view()).collect(),
            busy: self.state.is_busy(),
            pending_input: self.input.clone(),
        });
    }
}
