pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, CredentialHasher};
pub use db::{DbOperations, NewUser, UserStore};
pub use websocket::{ConnectionRegistry, FanOutEngine, WebSocketServer};

use websocket::BroadcastSender;

/// Health check endpoint handler
/// Returns server status, a timestamp and the current connection counts
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "connections": state.registry.connection_count().await,
        "authenticated": state.registry.authenticated_count().await,
    }))
}

/// Process-wide context shared by every session and the fan-out engine
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcast: BroadcastSender,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Builds the state around `store`. The returned engine is the only one
    /// for this state and has to be spawned by the caller.
    pub fn new(config: Settings, store: Arc<dyn UserStore>) -> Result<(Self, FanOutEngine)> {
        let hasher = CredentialHasher::new(&config.hashing)?;
        let registry = Arc::new(ConnectionRegistry::new());
        let (broadcast, receivers) = websocket::broadcast::channels();
        let engine = FanOutEngine::new(registry.clone(), receivers);

        let state = Self {
            config: Arc::new(config),
            registry,
            broadcast,
            auth_service: Arc::new(AuthService::new(store, hasher)),
        };

        Ok((state, engine))
    }

    /// Like [`AppState::new`], backed by the PostgreSQL user store from
    /// `config.database`.
    pub async fn connect(config: Settings) -> Result<(Self, FanOutEngine)> {
        let hasher = CredentialHasher::new(&config.hashing)?;
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
            hasher,
        )
        .await?;

        Self::new(config, Arc::new(db))
    }
}
