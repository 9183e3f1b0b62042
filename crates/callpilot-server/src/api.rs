//! HTTP handlers: readiness check and one-shot assist.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callpilot_graph::{GraphError, ProcessingState};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Request body for `POST /api/assist`.
#[derive(Debug, Deserialize)]
pub struct AssistRequest {
    /// Utterance text to run through the graph.
    pub transcript: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("orchestration graph is not available")]
    Unavailable,
    #[error("processing failed: {0}")]
    Upstream(#[from] GraphError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Handler for `GET /health`.
///
/// `graph_ready` reports whether the orchestration graphs were constructed.
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "graph_ready": state.graphs_ready()
    }))
}

/// Handler for `POST /api/assist`.
///
/// Runs one graph invocation and returns the final processing state.
pub async fn assist_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AssistRequest>,
) -> Result<Json<ProcessingState>, ApiError> {
    let transcript = payload.transcript.trim();
    if transcript.is_empty() {
        return Err(ApiError::BadRequest("transcript must not be empty".to_string()));
    }

    let graph = state.graph.as_ref().ok_or(ApiError::Unavailable)?;
    let result = graph.invoke(ProcessingState::new(transcript)).await;

    match result {
        Ok(final_state) => Ok(Json(final_state)),
        Err(e) => {
            tracing::warn!(node = e.node().unwrap_or("-"), error = %e, "assist invocation failed");
            Err(ApiError::Upstream(e))
        }
    }
}
