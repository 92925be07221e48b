//! Axum routes for the edge forest service.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::EdgeError;
use crate::store::EdgeStore;
use crate::types::{DepthBudget, Edge, NodeId, TreeView};

use super::middleware::{metrics_middleware, record_mutation, record_tree_metrics};
use super::openapi::openapi_document;
use super::state::ServiceState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of create and delete requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRequest {
    /// Parent node id.
    pub from_id: i64,
    /// Child node id.
    pub to_id: i64,
}

impl EdgeRequest {
    /// Check positivity and the self-loop rule.
    pub fn validate(&self) -> Result<Edge, EdgeError> {
        Edge::try_from_raw(self.from_id, self.to_id)
    }
}

/// Query string of subtree fetches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    /// Hop budget; the configured default when absent.
    pub max_depth: Option<i64>,
}

impl TreeQuery {
    /// Check that a given budget is at least 1.
    pub fn validate(&self) -> Result<Option<DepthBudget>, EdgeError> {
        self.max_depth
            .map(|raw| {
                u32::try_from(raw)
                    .map_err(|_| EdgeError::Validation(format!("maxDepth out of range: [{raw}]")))
                    .and_then(DepthBudget::new)
            })
            .transpose()
    }
}

/// Confirmation of a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    /// Crate version.
    pub version: String,
    /// "postgres" or "memory".
    pub store_backend: String,
    /// Whether the store answered a ping.
    pub store_connected: bool,
    /// Configured cycle check budget.
    pub max_cycle_depth: u32,
    /// Configured default subtree budget.
    pub default_tree_depth: u32,
    /// Largest subtree budget a caller may request.
    pub max_tree_depth: u32,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take traffic.
    pub ready: bool,
    /// Whether the store answered a ping.
    pub store: bool,
    /// Failure reason when not ready.
    pub details: Option<String>,
}

/// Structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// An [`EdgeError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub EdgeError);

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EdgeError::Validation(_)
            | EdgeError::NodeAlreadyHasParent { .. }
            | EdgeError::CycleDetected { .. }
            | EdgeError::CycleUndecidable { .. } => StatusCode::BAD_REQUEST,
            EdgeError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EdgeError::EdgeNotFound { .. } | EdgeError::NodeNotFound(_) => StatusCode::NOT_FOUND,
            EdgeError::Store(_) | EdgeError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EdgeError> for ApiError {
    fn from(err: EdgeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(EdgeError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(EdgeError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(EdgeError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if self.0.is_internal() {
            // Store details stay in the logs
            tracing::error!(code = self.0.code(), error = %self.0, "Internal error");
            ErrorResponse::new(self.0.code(), "Internal server error")
        } else {
            tracing::warn!(code = self.0.code(), error = %self.0, "Request error");
            ErrorResponse::new(self.0.code(), self.0.to_string())
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Create an edge.
async fn create_edge_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
    payload: Result<Json<EdgeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::info!(from = request.from_id, to = request.to_id, "Request to create edge");
    let edge = request.validate()?;

    let result = state.editor.create_edge(edge.from, edge.to).await;
    record_mutation("create", result.as_ref().err().map_or("OK", EdgeError::code));
    result?;

    Ok(Json(MessageResponse {
        message: format!("Edge from [{}] to [{}] created successfully", edge.from, edge.to),
    }))
}

/// Delete an edge.
async fn delete_edge_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
    payload: Result<Json<EdgeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::info!(from = request.from_id, to = request.to_id, "Request to delete edge");
    let edge = request.validate()?;

    let result = state.editor.delete_edge(edge.from, edge.to).await;
    record_mutation("delete", result.as_ref().err().map_or("OK", EdgeError::code));
    result?;

    Ok(Json(MessageResponse {
        message: format!("Edge from [{}] to [{}] deleted successfully", edge.from, edge.to),
    }))
}

/// Fetch the subtree below a node.
async fn get_tree_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
    node_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> Result<Json<TreeView>, ApiError> {
    let Path(raw_node) = node_id?;
    let Query(query) = query?;
    tracing::info!(node = raw_node, max_depth = ?query.max_depth, "Request to fetch tree");

    let node = NodeId::new(raw_node)?;
    let max_depth = query.validate()?;

    let start = Instant::now();
    let view = state.editor.get_tree(node, max_depth).await?;
    record_tree_metrics(view.count_nodes, view.depth, start.elapsed().as_millis() as u64);

    Ok(Json(view))
}

/// Health check endpoint (detailed).
async fn health_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let connected = state.editor.store().ping().await.is_ok();
    let config = state.editor.config();

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store_backend: state.backend.to_string(),
        store_connected: connected,
        max_cycle_depth: config.max_cycle_depth.get(),
        default_tree_depth: config.default_tree_depth.get(),
        max_tree_depth: config.max_tree_depth.get(),
    })
}

/// OpenAPI document for the edge routes.
async fn openapi_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<serde_json::Value> {
    Json(openapi_document(state.editor.config()))
}

/// Liveness check endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness check endpoint.
///
/// Returns 200 if the store answers, 503 otherwise.
async fn readiness_handler<S: EdgeStore>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.editor.store().ping().await {
        Ok(()) => Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some(format!("Store unavailable: {e}")),
            }),
        )),
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the edge forest service.
pub fn create_router<S: EdgeStore>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Edge operations
        .route(
            "/api/edges",
            axum::routing::post(create_edge_handler::<S>).delete(delete_edge_handler::<S>),
        )
        .route("/api/edges/:node_id", get(get_tree_handler::<S>))
        .route("/api-docs/openapi.json", get(openapi_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
