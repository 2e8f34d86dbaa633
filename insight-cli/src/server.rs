use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use insight_rag::{AnswerResult, InsightPipeline, ProcessReport, RagError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cli::DEFAULT_PORT;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InsightPipeline>,
}

impl AppState {
    pub fn new(pipeline: InsightPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: DEFAULT_PORT }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// A [`RagError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(error: RagError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_input_error() {
            return StatusCode::BAD_REQUEST;
        }
        match &self.0 {
            RagError::IndexNotFound { .. } => StatusCode::NOT_FOUND,
            RagError::EmbeddingModelMismatch { .. } => StatusCode::CONFLICT,
            RagError::Fetch { .. } | RagError::Embedding { .. } | RagError::Generation { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, %status, "request failed");
        } else {
            warn!(error = %self.0, %status, "request rejected");
        }
        let body = ErrorBody { error: self.0.kind().to_string(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/process", post(process_urls))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("insight listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let index_ready = state.pipeline.store().exists().await;
    Json(json!({"status": "ok", "service": "insight", "index_ready": index_ready}))
}

async fn process_urls(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessReport>, ApiError> {
    let report = state.pipeline.process_urls(&request.urls).await?;
    Ok(Json(report))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    let answer = state.pipeline.ask(&request.question).await?;
    Ok(Json(answer))
}
