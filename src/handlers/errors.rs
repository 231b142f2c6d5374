use axum::{http::StatusCode, response::Json};
use compute::{ComputeError, ErrorKind};
use sea_orm::DbErr;
use tracing::{error, warn};

use crate::schemas::ErrorResponse;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, code: &str, error: impl Into<String>, field: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            field,
            success: false,
        }),
    )
}

pub fn not_found(entity: &str, id: i32) -> ApiError {
    warn!("{} {} not found", entity, id);
    error_response(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{entity} {id} not found"), None)
}

pub fn database_error(context: &str, err: DbErr) -> ApiError {
    error!("Database error while {}: {}", context, err);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DATABASE_ERROR",
        format!("Database error while {context}"),
        None,
    )
}

/// Maps an engine error onto its HTTP status and error code.
pub fn compute_error(err: ComputeError) -> ApiError {
    let field = err.field().map(str::to_string);
    let (status, code) = match err.kind() {
        ErrorKind::OverAllocation => (StatusCode::UNPROCESSABLE_ENTITY, "OVER_ALLOCATION"),
        ErrorKind::InvalidRecipient => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_RECIPIENT"),
        ErrorKind::InvalidAmount => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_AMOUNT"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::ConcurrencyTimeout => (StatusCode::SERVICE_UNAVAILABLE, "CONCURRENCY_TIMEOUT"),
        ErrorKind::InvalidEventData => (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_EVENT_DATA"),
        ErrorKind::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    };

    if status.is_server_error() && !err.is_retryable() {
        error!(code, "Request failed: {}", err);
    } else {
        warn!(code, "Request rejected: {}", err);
    }

    error_response(status, code, err.to_string(), field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_over_allocation_maps_to_unprocessable() {
        let (status, Json(body)) = compute_error(ComputeError::OverAllocation {
            income_amount: Decimal::new(10000, 2),
            distributed: Decimal::new(11000, 2),
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "OVER_ALLOCATION");
        assert_eq!(body.field.as_deref(), Some("distributions"));
        assert!(!body.success);
    }

    #[test]
    fn test_timeout_is_service_unavailable() {
        let (status, Json(body)) = compute_error(ComputeError::ConcurrencyTimeout {
            fund_id: 1,
            waited_ms: 5000,
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, "CONCURRENCY_TIMEOUT");
    }

    #[test]
    fn test_storage_and_event_data_are_internal() {
        let (status, _) = compute_error(ComputeError::InvalidEventData("negative amount".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, Json(body)) = compute_error(ComputeError::Database(DbErr::Custom("boom".to_string())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DATABASE_ERROR");
    }
}
