//! REST API of the collector
//!
//! Agents push snapshots here and dashboards poll the derived views.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Registry handle** for every read and write; handlers hold no state
//!
//! ## Endpoints
//!
//! - `POST /api/v1/nodes` - Ingest an agent snapshot
//! - `GET /api/v1/nodes` - List nodes with derived status
//! - `GET /api/v1/nodes/:name` - Single node
//! - `DELETE /api/v1/nodes/:name` - Remove a node and its connections
//! - `GET /api/v1/connections` - List connections with coordinates
//! - `GET /api/v1/connections/:source/:target` - Single connection
//! - `GET /api/v1/stats` - Cluster statistics
//! - `POST /api/v1/gc` - Force a garbage collection sweep
//! - `GET /api/v1/health` - Health check

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{ConnectionsResponse, HealthResponse, IngestResponse, NodesResponse, RemoveNodeResponse};

use std::net::{Ipv4Addr, SocketAddr};

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Permissive CORS so browser dashboards on other origins can poll
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
            enable_cors: true,
        }
    }
}

/// Build the router with all routes and middleware
pub fn router(state: ApiState, config: &ApiConfig) -> Router {
    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/nodes",
            get(routes::nodes::list_nodes).post(routes::nodes::ingest_node),
        )
        .route(
            "/api/v1/nodes/:name",
            get(routes::nodes::get_node).delete(routes::nodes::remove_node),
        )
        .route(
            "/api/v1/connections",
            get(routes::connections::list_connections),
        )
        .route(
            "/api/v1/connections/:source/:target",
            get(routes::connections::get_connection),
        )
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route("/api/v1/gc", post(routes::gc::run_gc))
        .with_state(state);

    let cors = config.enable_cors.then(|| {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    });

    // trace outermost so CORS preflights are logged too
    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .option_layer(cors),
    )
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
