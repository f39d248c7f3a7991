//! Bearer credential access for outgoing backend requests

use std::sync::{Arc, RwLock};

/// Supplies the bearer credential for backend calls
pub trait SessionAuthBridge: Send + Sync {
    /// Current bearer token, or `None` when nobody is signed in
    fn credential(&self) -> Option<String>;
}

impl<T: SessionAuthBridge + ?Sized> SessionAuthBridge for Arc<T> {
    fn credential(&self) -> Option<String> {
        (**self).credential()
    }
}

/// Process-wide credential written by the dashboard's login layer.
///
/// Chat sessions only ever read it.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(initial.filter(|t| !t.trim().is_empty()))),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut guard = self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(token).filter(|t| !t.trim().is_empty());
    }

    pub fn clear(&self) {
        let mut guard = self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }
}

impl SessionAuthBridge for CredentialStore {
    fn credential(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
