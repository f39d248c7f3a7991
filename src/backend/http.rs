//! reqwest-backed chat backend

use super::types::{BackendHealth, ChatReply, ChatRequest, ErrorBody};
use super::{ChatBackend, DispatchError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Longest raw (non-JSON) error body kept for logs
const MAX_LOGGED_BODY_CHARS: usize = 200;

/// HTTP client for the analytics/AI backend
pub struct HttpChatBackend {
    client: Client,
    chat_url: String,
    health_url: String,
}

impl HttpChatBackend {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let base = base_url.trim_end_matches('/');
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            chat_url: format!("{base}/chat"),
            health_url: format!("{base}/health"),
        })
    }

    fn classify_error(status: StatusCode, body: &str) -> DispatchError {
        let message = server_message(body);
        match status.as_u16() {
            401 | 403 => DispatchError::auth(format!("Authentication rejected: {message}")),
            _ => DispatchError::server(format!("HTTP {status}: {message}")),
        }
        .with_status(status.as_u16())
    }

    fn transport_error(e: &reqwest::Error) -> DispatchError {
        if e.is_timeout() {
            DispatchError::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            DispatchError::network(format!("Connection failed: {e}"))
        } else {
            DispatchError::network(format!("Request failed: {e}"))
        }
    }
}

/// Extract the server-provided message for logging
fn server_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(error) }) => error,
        _ => body.chars().take(MAX_LOGGED_BODY_CHARS).collect(),
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, DispatchError> {
        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(credential)
            .json(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            DispatchError::server(format!("Failed to parse response: {e}"))
                .with_status(status.as_u16())
        })
    }

    async fn health(&self) -> Result<BackendHealth, DispatchError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| DispatchError::server(format!("Failed to parse health: {e}")))
    }
}
