use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{instrument, warn};

use crate::handlers::errors::{ApiError, error_response};
use crate::schemas::{AppState, ErrorResponse, HealthResponse};

/// Health check endpoint
///
/// Reports 503 when the database cannot be reached, since no ledger
/// operation can succeed without it.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if let Err(e) = state.db.ping().await {
        warn!("Health check failed, database unreachable: {}", e);
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "DATABASE_UNAVAILABLE",
            "Database is not reachable",
            None,
        ));
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: "connected".to_string(),
    }))
}
