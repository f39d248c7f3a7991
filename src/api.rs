//! HTTP API for hosted chat sessions

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::auth::CredentialStore;
use crate::runtime::ProductionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ProductionManager>,
    /// Same store the sessions' dispatcher reads from
    pub credentials: CredentialStore,
}

impl AppState {
    pub fn new(sessions: ProductionManager, credentials: CredentialStore) -> Self {
        Self {
            sessions: Arc::new(sessions),
            credentials,
        }
    }
}
