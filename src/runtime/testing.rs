//! Mock implementations for testing
//!
//! These mocks enable session-level testing without real I/O.

use crate::auth::SessionAuthBridge;
use crate::backend::{BackendHealth, ChatBackend, ChatReply, ChatRequest, DispatchError};
use crate::dispatcher::MessageDispatcher;
use crate::reveal::RevealCadence;
use crate::runtime::{ChatSession, SessionContext, SessionEvent, SessionSnapshot};
use crate::state_machine::Event;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock backend that returns queued replies
#[allow(dead_code)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<ChatReply, DispatchError>>>,
    /// Record of all requests made, with the credential each carried
    pub requests: Mutex<Vec<(String, ChatRequest)>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: ChatReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: DispatchError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn recorded_credentials(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    fn record(&self, credential: &str, request: &ChatRequest) {
        self.requests
            .lock()
            .unwrap()
            .push((credential.to_string(), request.clone()));
    }

    fn next_reply(&self) -> Result<ChatReply, DispatchError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DispatchError::network("No mock reply queued")))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, DispatchError> {
        self.record(credential, request);
        self.next_reply()
    }

    async fn health(&self) -> Result<BackendHealth, DispatchError> {
        Ok(BackendHealth {
            status: "healthy".to_string(),
            message: None,
        })
    }
}

// ============================================================================
// Delayed Mock Backend (for in-flight testing)
// ============================================================================

/// Mock backend that holds each request for a fixed delay
pub struct DelayedMockBackend {
    inner: MockBackend,
    delay: Duration,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
}

#[allow(dead_code)]
impl DelayedMockBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockBackend::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: ChatReply) {
        self.inner.queue_reply(reply);
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl ChatBackend for DelayedMockBackend {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, DispatchError> {
        self.inner.record(credential, request);
        self.request_started.notify_waiters();
        tokio::time::sleep(self.delay).await;
        self.inner.next_reply()
    }

    async fn health(&self) -> Result<BackendHealth, DispatchError> {
        self.inner.health().await
    }
}

// ============================================================================
// Static Credential
// ============================================================================

/// Fixed credential, or none at all
#[derive(Debug, Clone)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    pub fn new(token: &str) -> Self {
        Self(Some(token.to_string()))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl SessionAuthBridge for StaticCredential {
    fn credential(&self) -> Option<String> {
        self.0.clone()
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

/// Helper for running a single session with minimal boilerplate
pub struct TestSession<B: ChatBackend + 'static> {
    pub backend: Arc<B>,
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SessionEvent>,
    pub snapshot_rx: watch::Receiver<SessionSnapshot>,
    _session_handle: tokio::task::JoinHandle<()>,
}

impl TestSession<MockBackend> {
    pub fn builder() -> TestSessionBuilder<MockBackend> {
        TestSessionBuilder {
            backend: MockBackend::new(),
            credential: StaticCredential::new("samantha.lee"),
            greeting: "Hi! I'm your career assistant.".to_string(),
            cadence: RevealCadence::new(3, Duration::from_millis(10)),
        }
    }
}

pub struct TestSessionBuilder<B> {
    backend: B,
    credential: StaticCredential,
    greeting: String,
    cadence: RevealCadence,
}

impl<B: ChatBackend + 'static> TestSessionBuilder<B> {
    pub fn backend<B2: ChatBackend + 'static>(self, backend: B2) -> TestSessionBuilder<B2> {
        TestSessionBuilder {
            backend,
            credential: self.credential,
            greeting: self.greeting,
            cadence: self.cadence,
        }
    }

    pub fn credential(mut self, credential: StaticCredential) -> Self {
        self.credential = credential;
        self
    }

    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn cadence(mut self, step_chars: usize, interval: Duration) -> Self {
        self.cadence = RevealCadence::new(step_chars, interval);
        self
    }

    pub fn build(self) -> TestSession<B> {
        let backend = Arc::new(self.backend);
        let dispatcher = Arc::new(MessageDispatcher::new(backend.clone(), self.credential));

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(1024);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let session = ChatSession::new(
            SessionContext::new("test-session", self.greeting, self.cadence),
            dispatcher,
            event_rx,
            event_tx.clone(),
            broadcast_tx,
            snapshot_tx,
        );
        let handle = tokio::spawn(session.run());

        TestSession {
            backend,
            event_tx,
            broadcast_rx,
            snapshot_rx,
            _session_handle: handle,
        }
    }
}

impl<B: ChatBackend + 'static> TestSession<B> {
    pub async fn send_message(&self, text: &str) {
        self.event_tx
            .send(Event::user_message(text))
            .await
            .expect("Failed to send message");
    }

    pub async fn click_suggestion(&self, text: &str) {
        self.event_tx
            .send(Event::SuggestionClicked {
                text: text.to_string(),
            })
            .await
            .expect("Failed to click suggestion");
    }

    pub async fn clear(&self) {
        self.event_tx
            .send(Event::Clear)
            .await
            .expect("Failed to clear");
    }

    pub async fn teardown(&self) {
        self.event_tx
            .send(Event::Teardown)
            .await
            .expect("Failed to tear down");
    }

    /// Wait until the published snapshot satisfies `predicate`
    pub async fn wait_for_snapshot(
        &mut self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
        timeout: Duration,
    ) -> Option<SessionSnapshot> {
        match tokio::time::timeout(timeout, self.snapshot_rx.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }

    /// Wait for a broadcast event matching `predicate`, skipping others
    pub async fn wait_for_event(
        &mut self,
        mut predicate: impl FnMut(&SessionEvent) -> bool,
        timeout: Duration,
    ) -> Option<SessionEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, self.broadcast_rx.recv()).await {
                Ok(Ok(event)) if predicate(&event) => return Some(event),
                Ok(Ok(_) | Err(broadcast::error::RecvError::Lagged(_))) => continue,
                _ => return None,
            }
        }
        None
    }

    /// Everything broadcast so far that has not been consumed
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.broadcast_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DispatchErrorKind;
    use crate::conversation::{Citation, CitationSource, RevealState, Role};
    use crate::dispatcher::FALLBACK_APOLOGY;

    const WAIT: Duration = Duration::from_secs(10);

    fn profile_reply() -> ChatReply {
        ChatReply {
            response_text: "Here is your profile summary.".to_string(),
            citations: vec![Citation::new(CitationSource::Skill, "Python")],
            suggested_actions: vec!["What roles fit me?".to_string()],
            intent: None,
        }
    }

    fn settled(turns: usize) -> impl FnMut(&SessionSnapshot) -> bool {
        move |s| !s.busy && s.turns.len() == turns && s.turns.iter().all(|t| t.reveal_state == RevealState::Complete)
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend::new();
        backend.queue_reply(ChatReply::text("Hello!"));

        let request = ChatRequest {
            message: "Hi".to_string(),
            conversation_history: vec![],
        };
        let reply = backend.chat("token", &request).await.unwrap();
        assert_eq!(reply.response_text, "Hello!");
        assert_eq!(backend.recorded_requests(), vec![request.clone()]);

        let err = backend.chat("token", &request).await.unwrap_err();
        assert_eq!(err.kind, DispatchErrorKind::Network);
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_revealed_on_mount() {
        let mut session = TestSession::builder().greeting("Welcome back!").build();

        let snapshot = session.wait_for_snapshot(settled(1), WAIT).await.unwrap();
        assert_eq!(snapshot.turns[0].role, Role::Assistant);
        assert_eq!(snapshot.turns[0].content, "Welcome back!");

        let events = session.drain_events();
        assert!(matches!(events.first(), Some(SessionEvent::TurnAppended { index: 0, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::RevealFrame { index: 0, .. })));
        assert!(matches!(events.last(), Some(SessionEvent::TurnCompleted { index: 0, .. })));
        assert!(session.backend.recorded_requests().is_empty());
    }

    /// Normal reply: metadata appears only after the reveal, and a suggestion
    /// click prefills without sending
    #[tokio::test(start_paused = true)]
    async fn test_normal_reply_then_suggestion() {
        let backend = MockBackend::new();
        backend.queue_reply(profile_reply());
        let mut session = TestSession::builder().backend(backend).build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("Show my profile").await;

        let appended = session
            .wait_for_event(
                |e| matches!(e, SessionEvent::TurnAppended { index: 2, .. }),
                WAIT,
            )
            .await
            .unwrap();
        let SessionEvent::TurnAppended { turn, .. } = appended else {
            unreachable!()
        };
        assert!(turn.citations.is_empty());
        assert!(turn.suggested_actions.is_empty());
        assert!(turn.content.is_empty());

        let snapshot = session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        let reply = &snapshot.turns[2];
        assert_eq!(reply.content, "Here is your profile summary.");
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citations[0].text, "Python");
        assert_eq!(reply.suggested_actions, vec!["What roles fit me?".to_string()]);
        assert!(reply.created_at.is_some());

        session.click_suggestion("What roles fit me?").await;
        let snapshot = session
            .wait_for_snapshot(|s| s.pending_input.focus_requested, WAIT)
            .await
            .unwrap();
        assert_eq!(snapshot.pending_input.text, "What roles fit me?");
        assert_eq!(snapshot.turns.len(), 3);
        assert_eq!(session.backend.recorded_requests().len(), 1);
    }

    /// Network failure: one complete apology turn, no metadata
    #[tokio::test(start_paused = true)]
    async fn test_network_failure_appends_single_apology() {
        let backend = MockBackend::new();
        backend.queue_error(DispatchError::network("connection refused"));
        let mut session = TestSession::builder().backend(backend).build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("Show my profile").await;

        let snapshot = session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        let fallback = &snapshot.turns[2];
        assert_eq!(fallback.content, FALLBACK_APOLOGY);
        assert_eq!(fallback.reveal_state, RevealState::Complete);
        assert!(fallback.citations.is_empty());
        assert!(fallback.suggested_actions.is_empty());

        // Fallbacks are never animated
        let events = session.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::RevealFrame { index: 2, .. })));
    }

    /// Duplicate send while busy: the second message has no effect
    #[tokio::test(start_paused = true)]
    async fn test_duplicate_send_while_busy_dropped() {
        let backend = DelayedMockBackend::new(Duration::from_secs(1));
        backend.queue_reply(ChatReply::text("Only one answer."));
        backend.queue_reply(ChatReply::text("Should never be used."));
        let mut session = TestSession::builder()
            .backend(backend)
            .build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("a").await;
        session.send_message("b").await;

        let snapshot = session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        let contents: Vec<&str> = snapshot.turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents[1], "a");
        assert_eq!(contents[2], "Only one answer.");
        assert_eq!(session.backend.recorded_requests().len(), 1);

        // Still idle and nothing else queued up behind the first request
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.snapshot().turns.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_flag_tracks_request() {
        let backend = DelayedMockBackend::new(Duration::from_secs(1));
        backend.queue_reply(ChatReply::text("done"));
        let mut session = TestSession::builder()
            .backend(backend)
            .build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("hello").await;
        let busy = session.wait_for_snapshot(|s| s.busy, WAIT).await.unwrap();
        assert_eq!(busy.turns.len(), 2);
        assert_eq!(busy.turns[1].role, Role::User);

        session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
    }

    /// Empty input: dispatcher never invoked, store unchanged
    #[tokio::test(start_paused = true)]
    async fn test_blank_input_ignored() {
        let mut session = TestSession::builder().build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("   ").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(session.backend.recorded_requests().is_empty());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.turns.len(), 1);
        assert!(!snapshot.busy);
    }

    /// Teardown mid-reveal: no completion and no further mutation
    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_reveal() {
        let mut session = TestSession::builder()
            .greeting("A fairly long greeting that takes a while to type out.")
            .cadence(1, Duration::from_millis(50))
            .build();

        session
            .wait_for_event(|e| matches!(e, SessionEvent::RevealFrame { .. }), WAIT)
            .await
            .unwrap();
        session.teardown().await;
        session
            .wait_for_event(|e| matches!(e, SessionEvent::Closed), WAIT)
            .await
            .unwrap();

        let at_close = session.snapshot();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(session.drain_events().is_empty());
        let after = session.snapshot();
        assert_eq!(after.turns, at_close.turns);
        assert_eq!(after.turns[0].reveal_state, RevealState::Revealing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_excludes_fallback() {
        let backend = MockBackend::new();
        backend.queue_error(DispatchError::server("HTTP 500").with_status(500));
        backend.queue_reply(ChatReply::text("Second time lucky."));
        let mut session = TestSession::builder().backend(backend).build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("first").await;
        session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        session.send_message("second").await;
        session.wait_for_snapshot(settled(5), WAIT).await.unwrap();

        let requests = session.backend.recorded_requests();
        assert_eq!(requests.len(), 2);
        let history = &requests[1].conversation_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[1].content, "first");
        assert_eq!(requests[1].message, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_yields_apology_without_request() {
        let backend = MockBackend::new();
        backend.queue_reply(ChatReply::text("unused"));
        let mut session = TestSession::builder()
            .backend(backend)
            .credential(StaticCredential::absent())
            .build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("Show my profile").await;

        let snapshot = session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        assert_eq!(snapshot.turns[2].content, FALLBACK_APOLOGY);
        assert!(session.backend.recorded_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_supersedes_running_greeting() {
        let backend = MockBackend::new();
        backend.queue_reply(ChatReply::text("Quick answer."));
        let mut session = TestSession::builder()
            .backend(backend)
            .greeting("A slow greeting that is still typing when the reply lands.")
            .cadence(1, Duration::from_millis(50))
            .build();

        session.send_message("hi").await;

        let snapshot = session
            .wait_for_snapshot(|s| s.turns.len() == 3, WAIT)
            .await
            .unwrap();
        assert_eq!(snapshot.turns[0].reveal_state, RevealState::Complete);
        assert_eq!(snapshot.turns[2].reveal_state, RevealState::Revealing);

        let snapshot = session.wait_for_snapshot(settled(3), WAIT).await.unwrap();
        assert_eq!(snapshot.turns[2].content, "Quick answer.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_reveal() {
        let backend = MockBackend::new();
        backend.queue_reply(ChatReply {
            response_text: "A long reply that will be cleared before it finishes.".to_string(),
            citations: vec![Citation::new(CitationSource::Project, "Portfolio site")],
            suggested_actions: vec![],
            intent: None,
        });
        let mut session = TestSession::builder()
            .backend(backend)
            .cadence(1, Duration::from_millis(50))
            .build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("Show my projects").await;
        session
            .wait_for_event(|e| matches!(e, SessionEvent::RevealFrame { index: 2, .. }), WAIT)
            .await
            .unwrap();
        session.clear().await;

        session
            .wait_for_event(|e| matches!(e, SessionEvent::Cleared), WAIT)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let events = session.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::TurnCompleted { .. } | SessionEvent::RevealFrame { .. })));
        assert!(session.snapshot().turns.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_while_awaiting_discards_reply() {
        let backend = DelayedMockBackend::new(Duration::from_secs(1));
        backend.queue_reply(ChatReply::text("Answer to the second question."));
        let mut session = TestSession::builder()
            .backend(backend)
            .build();
        session.wait_for_snapshot(settled(1), WAIT).await.unwrap();

        session.send_message("first question").await;
        session.wait_for_snapshot(|s| s.busy, WAIT).await.unwrap();
        session.clear().await;

        let cleared = session
            .wait_for_snapshot(|s| !s.busy && s.turns.is_empty(), WAIT)
            .await
            .unwrap();
        assert!(cleared.turns.is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.snapshot().turns.is_empty());

        session.send_message("second question").await;
        let snapshot = session.wait_for_snapshot(settled(2), WAIT).await.unwrap();
        assert_eq!(snapshot.turns[0].content, "second question");
        assert_eq!(snapshot.turns[1].content, "Answer to the second question.");
    }
}
