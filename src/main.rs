//! Career Compass chat service
//!
//! Hosts conversational assistant sessions for the career dashboard and
//! streams their progressively revealed replies to the front end.

mod api;
mod auth;
mod backend;
mod config;
mod conversation;
mod dispatcher;
mod reveal;
mod runtime;
mod state_machine;
mod suggestion;

use api::{create_router, AppState};
use auth::CredentialStore;
use backend::{HttpChatBackend, LoggingBackend};
use config::AppConfig;
use dispatcher::MessageDispatcher;
use runtime::{ProductionManager, SharedBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "career_compass_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    let credentials = CredentialStore::new(config.api_token.clone());
    if config.api_token.is_none() {
        tracing::warn!("No COMPASS_API_TOKEN set; chat requests fail until a credential is provided");
    }

    // Backend client
    let http = HttpChatBackend::new(&config.backend_url, config.request_timeout)?;
    let backend: SharedBackend = Arc::new(LoggingBackend::new(http));
    tracing::info!(
        backend_url = %config.backend_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Chat backend configured"
    );

    // Create application state
    let sessions = ProductionManager::new(
        MessageDispatcher::new(backend, credentials.clone()),
        config.greeting.clone(),
        config.cadence,
    );
    let state = AppState::new(sessions, credentials);
    state.sessions.spawn_reaper(config.session_grace);
    tracing::info!(
        grace_secs = config.session_grace.as_secs(),
        "Abandoned session reaper started"
    );

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Career Compass chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
