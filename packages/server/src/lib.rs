//! HTTP server for the numbers discussion tree
//!
//! This crate exposes the `numtree-core` services as a JSON REST API.
//!
//! # Architecture
//!
//! The router is organized into modular endpoint modules merged in
//! [`create_router`]:
//! - `auth_endpoints`: registration and login
//! - `tree_endpoints`: tree list, tree detail, root and reply creation
//!
//! Write endpoints resolve their author through an [`AccessGate`].
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin numtree-server
//! ```

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use numtree_core::db::{DatabaseService, NodeStore, TursoStore};
use numtree_core::{NodeService, SummaryService, TreeService, UserService};

pub mod access_gate;
mod auth_endpoints;
pub mod config;
mod http_error;
mod tree_endpoints;

pub use access_gate::{AccessGate, AuthUser, JwtGate};
pub use auth_endpoints::AuthResponse;
pub use config::{ConfigError, JwtSecret, ServerConfig};
pub use http_error::HttpError;

/// Application state shared across all endpoints
///
/// Every service shares one store handle; cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NodeStore>,
    pub nodes: NodeService,
    pub trees: TreeService,
    pub summaries: SummaryService,
    pub users: UserService,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    /// Services over `store`, guarded by tokens signed with `jwt_secret`
    pub fn new(store: Arc<dyn NodeStore>, summary_page_size: u64, jwt_secret: &JwtSecret) -> Self {
        let users = UserService::new(store.clone());
        let gate: Arc<dyn AccessGate> = Arc::new(JwtGate::new(users, jwt_secret.as_bytes()));
        Self::with_gate(store, summary_page_size, gate)
    }

    pub fn with_gate(
        store: Arc<dyn NodeStore>,
        summary_page_size: u64,
        gate: Arc<dyn AccessGate>,
    ) -> Self {
        let nodes = NodeService::new(store.clone());
        Self {
            trees: TreeService::new(nodes.clone()),
            summaries: SummaryService::new(store.clone()).with_max_page_size(summary_page_size),
            users: UserService::new(store.clone()),
            nodes,
            store,
            gate,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint
///
/// Reports `degraded` (still 200) when the store cannot be read.
async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let (status, database) = match state.store.count_nodes().await {
        Ok(_) => ("ok", "connected"),
        Err(e) => {
            tracing::warn!("health check could not read store: {}", e);
            ("degraded", "unavailable")
        }
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}

/// Create the main application router with all endpoint modules
///
/// CORS is not applied here; see [`cors_layer`].
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        .with_state(state.clone())
        .merge(auth_endpoints::routes(state.clone()))
        .merge(tree_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Create the CORS layer for the configured browser origins
pub fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, ConfigError> {
    Ok(CorsLayer::new()
        .allow_origin(config.origin_headers()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(false))
}

/// Open the store, serve until Ctrl-C, then close the store
///
/// # Errors
///
/// Returns error if the database cannot be opened, or the server fails to
/// bind or start.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("📦 Database: {}", config.db_path.display());
    let db = Arc::new(DatabaseService::new(config.db_path.clone()).await?);
    let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));

    let state = AppState::new(store.clone(), config.summary_page_size, &config.jwt_secret);
    let app = create_router(state).layer(cors_layer(&config)?);

    let addr = config.bind_addr();
    tracing::info!("🚀 HTTP server starting on http://{}", addr);
    tracing::info!("📡 CORS enabled for {}", config.cors_origins.join(", "));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("🛑 Shutting down, closing database");
    store.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
