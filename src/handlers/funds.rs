use crate::handlers::errors::{ApiError, compute_error};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::{CacheCheckDto, FundReportDto, FundStatsDto, RecomputeDto};
use compute::coordinator::{FundChanges, NewFund};
use compute::money::to_cent_scale;
use compute::report::recompute_dto;
use model::entities::fund;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a new fund
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateFundRequest {
    /// Fund name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// ISO 4217 settlement currency (e.g. EUR)
    #[validate(length(equal = 3))]
    pub currency_code: String,
    /// Money already in the fund before the first recorded event (default: 0, may be negative)
    pub opening_balance: Option<Decimal>,
}

/// Request body for updating a fund
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateFundRequest {
    /// Fund name
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// New opening balance. Changing it replays the fund.
    pub opening_balance: Option<Decimal>,
}

/// Fund response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FundResponse {
    pub id: i32,
    pub name: String,
    pub currency_code: String,
    pub opening_balance: Decimal,
    /// Figures of the replay that accompanied the request
    pub stats: FundStatsDto,
}

impl FundResponse {
    fn new(model: fund::Model, stats: FundStatsDto) -> Self {
        Self {
            id: model.id,
            name: model.name,
            currency_code: model.currency_code,
            opening_balance: to_cent_scale(model.opening_balance),
            stats,
        }
    }
}

/// Create a new fund
#[utoipa::path(
    post,
    path = "/api/v1/funds",
    tag = "funds",
    request_body = CreateFundRequest,
    responses(
        (status = 201, description = "Fund created successfully", body = ApiResponse<FundResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Unknown currency or invalid opening balance", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_fund(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateFundRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<FundResponse>>), ApiError> {
    trace!("Entering create_fund function");
    debug!("Creating fund '{}' in {}", request.name, request.currency_code);

    let replayed = state
        .coordinator
        .create_fund(NewFund {
            name: request.name,
            currency_code: request.currency_code,
            opening_balance: request.opening_balance.unwrap_or(Decimal::ZERO),
        })
        .await
        .map_err(compute_error)?;

    info!("Fund created successfully with ID: {}", replayed.value.id);
    let response = ApiResponse {
        data: FundResponse::new(replayed.value, (&replayed.settlement.stats).into()),
        message: "Fund created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a fund with its current figures
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}",
    tag = "funds",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    responses(
        (status = 200, description = "Fund retrieved successfully", body = ApiResponse<FundResponse>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_fund(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FundResponse>>, ApiError> {
    trace!("Entering get_fund function for fund_id: {}", fund_id);

    let report = state.coordinator.report(fund_id).await.map_err(compute_error)?;
    let stats = (&report.settlement.stats).into();

    debug!("Retrieved fund {} (from cache: {})", fund_id, report.from_cache);
    let response = ApiResponse {
        data: FundResponse::new(report.fund, stats),
        message: "Fund retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update a fund's name or opening balance
#[utoipa::path(
    put,
    path = "/api/v1/funds/{fund_id}",
    tag = "funds",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    request_body = UpdateFundRequest,
    responses(
        (status = 200, description = "Fund updated successfully", body = ApiResponse<FundResponse>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 422, description = "Invalid opening balance", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_fund(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateFundRequest>>,
) -> Result<Json<ApiResponse<FundResponse>>, ApiError> {
    trace!("Entering update_fund function for fund_id: {}", fund_id);

    let replayed = state
        .coordinator
        .update_fund(
            fund_id,
            FundChanges {
                name: request.name,
                opening_balance: request.opening_balance,
            },
        )
        .await
        .map_err(compute_error)?;

    info!("Fund {} updated successfully", fund_id);
    let response = ApiResponse {
        data: FundResponse::new(replayed.value, (&replayed.settlement.stats).into()),
        message: "Fund updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Settlement report of a fund: figures and the paid state of every group cost
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/report",
    tag = "funds",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    responses(
        (status = 200, description = "Report retrieved successfully", body = ApiResponse<FundReportDto>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_fund_report(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<FundReportDto>>, ApiError> {
    trace!("Entering get_fund_report function for fund_id: {}", fund_id);

    let report = state.coordinator.report(fund_id).await.map_err(compute_error)?;
    let report = FundReportDto::from(report);

    debug!(
        "Report for fund {}: balance {}, {} allocations",
        fund_id,
        report.stats.balance,
        report.allocations.len()
    );
    let response = ApiResponse {
        data: report,
        message: "Report retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Rebuild the settlement cache of a fund from its event log
#[utoipa::path(
    post,
    path = "/api/v1/funds/{fund_id}/recompute",
    tag = "funds",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    responses(
        (status = 200, description = "Fund recomputed successfully", body = ApiResponse<RecomputeDto>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn recompute_fund(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RecomputeDto>>, ApiError> {
    trace!("Entering recompute_fund function for fund_id: {}", fund_id);

    let settlement = state.coordinator.recompute(fund_id).await.map_err(compute_error)?;

    info!("Fund {} recomputed", fund_id);
    let response = ApiResponse {
        data: recompute_dto(fund_id, &settlement),
        message: "Fund recomputed successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Compare the settlement cache of a fund against a fresh replay
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/verify",
    tag = "funds",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    responses(
        (status = 200, description = "Cache verified", body = ApiResponse<CacheCheckDto>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn verify_fund(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CacheCheckDto>>, ApiError> {
    trace!("Entering verify_fund function for fund_id: {}", fund_id);

    let check = CacheCheckDto::from(state.coordinator.verify(fund_id).await.map_err(compute_error)?);
    let message = if check.consistent {
        "Settlement cache is consistent"
    } else {
        "Settlement cache differs from replay"
    };

    debug!("Fund {} cache consistent: {}", fund_id, check.consistent);
    let response = ApiResponse {
        data: check,
        message: message.to_string(),
        success: true,
    };
    Ok(Json(response))
}
