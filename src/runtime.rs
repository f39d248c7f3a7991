//! Runtime for executing chat sessions
//!
//! Each mounted session runs as one tokio task that owns its store, reveal
//! engine and gate. Handles talk to it through channels only.

mod session;

#[cfg(test)]
pub mod testing;

pub use session::{ChatSession, SessionContext};

use crate::auth::CredentialStore;
use crate::backend::ChatBackend;
use crate::conversation::TurnView;
use crate::dispatcher::MessageDispatcher;
use crate::reveal::RevealCadence;
use crate::state_machine::Event;
use crate::suggestion::InputBuffer;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Backend shared by every session of the process
pub type SharedBackend = Arc<dyn ChatBackend>;

/// Type alias for the production manager with concrete collaborators
pub type ProductionManager = SessionManager<SharedBackend, CredentialStore>;

const EVENT_CHANNEL_CAPACITY: usize = 32;
const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// Lower bound on how often the reaper sweeps
const MIN_REAP_PERIOD: Duration = Duration::from_secs(1);

/// Events sent to subscribed clients
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TurnAppended { index: usize, turn: TurnView },
    RevealFrame { index: usize, visible: String },
    TurnCompleted { index: usize, turn: TurnView },
    BusyChanged { busy: bool },
    InputPrefilled { input: InputBuffer },
    Cleared,
    Closed,
    Error { message: String },
}

/// Everything a freshly attached renderer needs
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub turns: Vec<TurnView>,
    pub busy: bool,
    pub pending_input: InputBuffer,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| format!("Session {} is no longer running", self.session_id))
    }
}

/// A session plus the last time a renderer was seen attached to it
struct MountedSession {
    handle: SessionHandle,
    last_attached: Instant,
}

/// Manager for all mounted chat sessions
pub struct SessionManager<B, A>
where
    B: crate::backend::ChatBackend + 'static,
    A: crate::auth::SessionAuthBridge + 'static,
{
    dispatcher: Arc<MessageDispatcher<B, A>>,
    greeting: String,
    cadence: RevealCadence,
    sessions: RwLock<HashMap<String, MountedSession>>,
}

impl<B, A> SessionManager<B, A>
where
    B: crate::backend::ChatBackend + 'static,
    A: crate::auth::SessionAuthBridge + 'static,
{
    pub fn new(
        dispatcher: MessageDispatcher<B, A>,
        greeting: impl Into<String>,
        cadence: RevealCadence,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            greeting: greeting.into(),
            cadence,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn dispatcher(&self) -> &MessageDispatcher<B, A> {
        &self.dispatcher
    }

    /// Mount a new session: seed the greeting and start its runtime
    pub async fn create(&self) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            session_id: session_id.clone(),
            ..SessionSnapshot::default()
        });

        let context = SessionContext::new(&session_id, self.greeting.clone(), self.cadence);
        let session = ChatSession::new(
            context,
            self.dispatcher.clone(),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
            snapshot_tx,
        );

        let handle = SessionHandle {
            session_id: session_id.clone(),
            event_tx,
            broadcast_tx,
            snapshot_rx,
        };

        self.sessions.write().await.insert(
            session_id.clone(),
            MountedSession {
                handle: handle.clone(),
                last_attached: Instant::now(),
            },
        );

        tokio::spawn(session.run());
        tracing::info!(session_id = %session_id, "Chat session mounted");

        handle
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|m| m.handle.clone())
    }

    /// Unmount a session. Returns false if it was not mounted.
    pub async fn destroy(&self, session_id: &str) -> bool {
        let Some(mounted) = self.sessions.write().await.remove(session_id) else {
            return false;
        };
        Self::teardown(&mounted.handle).await;
        tracing::info!(session_id = %session_id, "Chat session unmounted");
        true
    }

    /// Unmount every session nobody has streamed for at least `grace`.
    ///
    /// A session counts as attached while it has a live event subscriber.
    /// Returns the ids that were unmounted.
    pub async fn reap_abandoned(&self, grace: Duration) -> Vec<String> {
        let now = Instant::now();
        let abandoned: Vec<MountedSession> = {
            let mut sessions = self.sessions.write().await;
            for mounted in sessions.values_mut() {
                if mounted.handle.broadcast_tx.receiver_count() > 0 {
                    mounted.last_attached = now;
                }
            }
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, m)| now.duration_since(m.last_attached) >= grace)
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect()
        };

        let mut reaped = Vec::with_capacity(abandoned.len());
        for mounted in abandoned {
            Self::teardown(&mounted.handle).await;
            tracing::info!(
                session_id = %mounted.handle.session_id,
                "Abandoned chat session unmounted"
            );
            reaped.push(mounted.handle.session_id);
        }
        reaped
    }

    /// Periodically unmount abandoned sessions until the manager is dropped
    pub fn spawn_reaper(self: &Arc<Self>, grace: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let period = (grace / 2).max(MIN_REAP_PERIOD);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let reaped = manager.reap_abandoned(grace).await;
                if !reaped.is_empty() {
                    tracing::debug!(count = reaped.len(), "Reaped abandoned sessions");
                }
            }
        })
    }

    async fn teardown(handle: &SessionHandle) {
        if let Err(e) = handle.send(Event::Teardown).await {
            tracing::debug!(session_id = %handle.session_id, error = %e, "Session already stopped");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
