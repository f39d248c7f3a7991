//! Analytics/AI backend client
//!
//! The backend computes chat replies; this module only speaks its HTTP
//! contract and classifies failures.

mod error;
mod http;
mod types;

pub use error::{DispatchError, DispatchErrorKind};
pub use http::HttpChatBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one chat request authenticated with `credential`
    async fn chat(&self, credential: &str, request: &ChatRequest)
        -> Result<ChatReply, DispatchError>;

    /// Probe backend health
    async fn health(&self) -> Result<BackendHealth, DispatchError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, DispatchError> {
        (**self).chat(credential, request).await
    }

    async fn health(&self) -> Result<BackendHealth, DispatchError> {
        (**self).health().await
    }
}

/// Logging wrapper for chat backends
pub struct LoggingBackend<B> {
    inner: B,
}

impl<B: ChatBackend> LoggingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: ChatBackend> ChatBackend for LoggingBackend<B> {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, DispatchError> {
        let start = std::time::Instant::now();
        let result = self.inner.chat(credential, request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    history_len = request.conversation_history.len(),
                    citations = reply.citations.len(),
                    suggestions = reply.suggested_actions.len(),
                    intent = reply.intent.as_deref().unwrap_or("none"),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    status = e.status,
                    error = %e.message,
                    "Chat request failed"
                );
            }
        }

        result
    }

    async fn health(&self) -> Result<BackendHealth, DispatchError> {
        let result = self.inner.health().await;
        if let Err(e) = &result {
            tracing::warn!(kind = %e.kind, error = %e.message, "Backend health probe failed");
        }
        result
    }
}
