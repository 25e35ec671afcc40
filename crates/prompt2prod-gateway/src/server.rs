//! HTTP API server, Axum-based

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use prompt2prod_core::{
    Dispatcher, GenerationRequest, GenerationResult, ModelCatalog, ModelListing,
};

use crate::error::ApiError;
use crate::protocol::{APP_NAME, HealthStatus, RootStatus};

/// Default request body ceiling (2 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared, read-only state for every request
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub catalog: Arc<ModelCatalog>,
    pub app_name: String,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, catalog: ModelCatalog) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            catalog: Arc::new(catalog),
            app_name: APP_NAME.to_string(),
        }
    }
}

/// The API server
pub struct GatewayServer {
    state: AppState,
    bind: SocketAddr,
    max_body_bytes: usize,
}

impl GatewayServer {
    /// Create a new server
    pub fn new(bind: SocketAddr, state: AppState) -> Self {
        Self {
            state,
            bind,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Override the request body ceiling
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/generate", post(generate_handler))
            .route("/models", get(models_handler))
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let router = self.router();
        info!("API listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("API server stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

// ── HTTP Handlers ──

async fn root_handler(State(state): State<AppState>) -> Json<RootStatus> {
    Json(RootStatus::running(&state.app_name))
}

/// No upstream dependency: liveness must not wait on a model server
async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}

async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected /generate body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    let result = state.dispatcher.generate(request).await?;
    Ok(Json(result))
}

async fn models_handler(State(state): State<AppState>) -> Json<ModelListing> {
    Json(state.catalog.listing().await)
}
