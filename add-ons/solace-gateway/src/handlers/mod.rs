//! HTTP handlers for the check-in gateway.

pub mod chat;
pub mod reports;

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Request-level failures. Signal-source failures never reach this type.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<solace_core::CheckinError> for ApiError {
    fn from(e: solace_core::CheckinError) -> Self {
        tracing::error!(target: "solace::gateway", error = %e, "archive read failed");
        ApiError::Internal(e.to_string())
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "live_sessions": state.orchestrator.sessions().len(),
        "llm_configured": state.config.has_llm_key(),
    }))
}
