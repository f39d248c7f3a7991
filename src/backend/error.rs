//! Dispatch error types

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure of a chat dispatch, with classification.
///
/// The message is for logs only; users see a fixed apology instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Server, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Auth, message)
    }
}

/// Error classification for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    /// No response received (connect failure, timeout, dropped body)
    Network,
    /// Response received with a non-2xx status, or an unusable body
    Server,
    /// Credential absent, or rejected with 401/403
    Auth,
}

impl DispatchErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Server => "server",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for DispatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
