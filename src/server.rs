//!
//! account HTTP server
//! -------------------
//! Axum router exposing registration, login and identity lookup.
//!
//! Responsibilities:
//! - Build the credential store, token codec and identity registry from `ServerConfig`.
//! - Run every request through `authn::authenticate` (attach identity from a bearer
//!   token, never reject) and then `authn::authorize` (route policy).
//! - Map `AppError` into uniform JSON error bodies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::identity::{IdentityRegistry, RoutePolicy, TokenCodec};
use crate::storage::{FileStore, MemoryStore, SharedCredentialStore};

pub mod authn;
pub mod handlers;

/// Shared server state injected into all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<IdentityRegistry>,
    /// Same keys as the registry's codec; used by the middleware to verify tokens.
    pub codec: TokenCodec,
    pub policy: RoutePolicy,
}

impl AppState {
    pub fn new(store: SharedCredentialStore, config: &ServerConfig) -> Self {
        let codec = TokenCodec::new(&config.token);
        let registry = IdentityRegistry::new(store, codec.clone(), config.display_name_policy);
        Self { registry: Arc::new(registry), codec, policy: RoutePolicy }
    }

    /// Pick the store named by the configuration.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let store: SharedCredentialStore = match &config.db_folder {
            Some(dir) => Arc::new(
                FileStore::open(dir).with_context(|| format!("While opening credential store under {}", dir.display()))?,
            ),
            None => {
                warn!(target: "account::startup", "ACCOUNT_DB_FOLDER unset; identities are kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, config))
    }
}

pub fn router(state: AppState) -> Router {
    // Layers run outermost-last: authenticate, then authorize, then the handler.
    Router::new()
        .route("/", get(handlers::health))
        .route("/account/register", post(handlers::register))
        .route("/account/login", post(handlers::login))
        .route("/account/me", get(handlers::me))
        .route("/account/users/{id}", get(handlers::user_by_id))
        .layer(middleware::from_fn_with_state(state.clone(), authn::authorize))
        .layer(middleware::from_fn_with_state(state.clone(), authn::authenticate))
        .with_state(state)
}

/// Serve on an already-bound listener until the listener fails.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "account::startup",
        "account starting: http_port={}, db_folder={:?}, token_ttl_secs={}, display_name_policy={:?}",
        config.http_port, config.db_folder, config.token.ttl_secs, config.display_name_policy
    );
    if config.uses_dev_secret() {
        warn!(target: "account::startup", "using the development signing secret; set ACCOUNT_JWT_SECRET");
    }
    let state = AppState::from_config(&config)?;
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    info!(target: "account::startup", "Starting server on {}", addr);
    serve(listener, state).await
}
