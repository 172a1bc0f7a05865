//! HTTP transport for the pipeline

use crate::cache::ResultCache;
use crate::config::ServerConfig;
use crate::error::VolumeError;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::simulation::{SimulationConfig, Simulator};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const SERVICE_NAME: &str = "Microsim Simulation API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}

/// Error response carrying a status and `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<VolumeError> for ApiError {
    fn from(err: VolumeError) -> Self {
        let status = if err.kind().is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        VolumeError::InvalidInput(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "request failed");
        } else {
            warn!(status = %self.status, detail = %self.detail, "request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub simulation: SimulationConfig,
}

/// Build the router with all routes, CORS and request tracing
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/schema/simulation", get(simulation_schema))
        .route("/simulate", post(simulate))
        .route("/data/chunk/:c/:z", get(get_chunk))
        .route("/data/info", get(data_info))
        .route("/test-data", get(test_data))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: ServerConfig, simulator: Arc<dyn Simulator>) -> anyhow::Result<()> {
    let options = PipelineOptions {
        include_payload: !config.no_export,
        ..PipelineOptions::default()
    };
    let cache = Arc::new(ResultCache::default());
    let pipeline = Arc::new(Pipeline::with_options(simulator, cache, options));
    let app = router(AppState::new(pipeline), &config.allowed_origins);

    let addr = config.bind_addr()?;
    info!(
        "listening on http://{} (export_payload={}, origins={})",
        addr,
        !config.no_export,
        config.allowed_origins.join(",")
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "message": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "docs": "/docs",
        "health": "/health",
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Microsim API is running" }))
}

async fn simulation_schema(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.simulator().schema())
}

async fn simulate(
    State(state): State<AppState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let pipeline = Arc::clone(&state.pipeline);
    // The cycle is pure computation; keep it off the async workers.
    let response = tokio::task::spawn_blocking(move || pipeline.simulate(&request.simulation))
        .await
        .map_err(|e| ApiError::internal(format!("Simulation failed: {e}")))??;
    Ok(Json(response).into_response())
}

async fn get_chunk(
    State(state): State<AppState>,
    AxumPath((c, z)): AxumPath<(usize, usize)>,
) -> Result<Response, ApiError> {
    let bytes = state.pipeline.fetch_slice(c, z)?;
    let len = bytes.len();
    let mut resp = Response::new(bytes.into());
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(resp)
}

async fn data_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.describe_current())
}

async fn test_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.pipeline.fallback_preview_stats())
}
