//! Environment-driven configuration

use crate::reveal::{RevealCadence, DEFAULT_INTERVAL, DEFAULT_STEP_CHARS};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SESSION_GRACE: Duration = Duration::from_secs(30);
pub const DEFAULT_GREETING: &str = "Hi! I'm your career assistant. Ask me about your skills, \
     projects, or which roles fit you best.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backend_url: String,
    /// Initial bearer credential; the login layer may replace it later
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    /// How long a session may go without a stream subscriber before it is unmounted
    pub session_grace: Duration,
    pub cadence: RevealCadence,
    pub greeting: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_grace: DEFAULT_SESSION_GRACE,
            cadence: RevealCadence::default(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse(&var, "COMPASS_PORT", "port number")?.unwrap_or(DEFAULT_PORT);
        let timeout_secs: Option<u64> =
            parse(&var, "COMPASS_REQUEST_TIMEOUT_SECS", "number of seconds")?;
        let grace_secs: Option<u64> =
            parse(&var, "COMPASS_SESSION_GRACE_SECS", "number of seconds")?;
        let step_chars: Option<usize> =
            parse(&var, "COMPASS_REVEAL_STEP_CHARS", "character count")?;
        let interval_ms: Option<u64> =
            parse(&var, "COMPASS_REVEAL_INTERVAL_MS", "number of milliseconds")?;

        Ok(Self {
            port,
            backend_url: var("COMPASS_BACKEND_URL")
                .map_or_else(|| DEFAULT_BACKEND_URL.to_string(), |u| u.trim().to_string()),
            api_token: var("COMPASS_API_TOKEN"),
            request_timeout: timeout_secs.map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            session_grace: grace_secs.map_or(DEFAULT_SESSION_GRACE, Duration::from_secs),
            cadence: RevealCadence::new(
                step_chars.unwrap_or(DEFAULT_STEP_CHARS),
                interval_ms.map_or(DEFAULT_INTERVAL, Duration::from_millis),
            ),
            greeting: var("COMPASS_GREETING").unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        })
    }
}

fn parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            })
        })
        .transpose()
}
