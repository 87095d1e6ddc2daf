use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ragline_core::{DocumentStats, IndexOrigin, QueryResult, RagError, RagPipeline, Settings};
use thiserror::Error;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::protocol::{ErrorBody, HealthResponse, QueryRequest};

/// Browser origins of the bundled front-end dev servers.
pub const ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when the pipeline could not be constructed at startup.
    pub pipeline: Option<Arc<RagPipeline>>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self { pipeline: Some(Arc::new(pipeline)) }
    }

    fn require_pipeline(&self) -> Result<&RagPipeline, ApiError> {
        self.pipeline.as_deref().ok_or(ApiError::NotInitialized)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

impl ServerConfig {
    /// Read `RAGLINE_HOST` and `RAGLINE_PORT`, falling back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let host = std::env::var("RAGLINE_HOST").unwrap_or(defaults.host);
        let port = match std::env::var("RAGLINE_PORT") {
            Ok(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid RAGLINE_PORT '{value}'"))?,
            Err(_) => defaults.port,
        };
        Ok(Self { host, port })
    }
}

/// Errors returned by handlers, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("RAG system not initialized")]
    NotInitialized,
    #[error("Error processing query: {0}")]
    Query(RagError),
    #[error("Error getting documents: {0}")]
    Documents(RagError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query(_) | Self::Documents(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(ALLOWED_ORIGINS.map(HeaderValue::from_static)))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/documents", get(documents))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Assemble the pipeline from `settings` and load or build its index.
///
/// An invalid configuration is returned as an error. Later failures, such as
/// an embedding model that cannot be loaded or an index that cannot be read,
/// are logged and leave the server running in a degraded state.
pub async fn initialize(settings: &Settings) -> anyhow::Result<AppState> {
    let mut pipeline = match settings.pipeline() {
        Ok(pipeline) => pipeline,
        Err(e @ RagError::Config(_)) => {
            return Err(e).context("invalid ragline configuration");
        }
        Err(e) => {
            error!(error = %e, "failed to initialize RAG system");
            return Ok(AppState::default());
        }
    };

    match pipeline.open_or_build(&settings.index_path, &settings.documents_dir).await {
        Ok(IndexOrigin::Loaded) => {
            info!(path = %settings.index_path.display(), "loaded existing index");
        }
        Ok(IndexOrigin::Built { chunk_count }) => {
            info!(
                chunk_count,
                documents = %settings.documents_dir.display(),
                path = %settings.index_path.display(),
                "built and saved new index"
            );
        }
        Ok(IndexOrigin::Missing) => {
            warn!(
                documents = %settings.documents_dir.display(),
                "no saved index and no .txt documents found; add documents and restart, \
                 or run `ragline index`"
            );
        }
        Err(e) => error!(error = %e, "failed to prepare index"),
    }

    Ok(AppState::new(pipeline))
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for ragline server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ragline listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let index_loaded = match &state.pipeline {
        Some(pipeline) => pipeline.is_ready().await,
        None => false,
    };
    Json(HealthResponse {
        status: "healthy".to_string(),
        rag_initialized: state.pipeline.is_some(),
        index_loaded,
    })
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let pipeline = state.require_pipeline()?;
    match pipeline.query(&request.question).await {
        Ok(result) => Ok(Json(result)),
        Err(RagError::NotReady) => Err(ApiError::NotInitialized),
        Err(e) => Err(ApiError::Query(e)),
    }
}

async fn documents(State(state): State<AppState>) -> Result<Json<DocumentStats>, ApiError> {
    let pipeline = state.require_pipeline()?;
    pipeline.document_stats().await.map(Json).map_err(ApiError::Documents)
}
