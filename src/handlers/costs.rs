use crate::handlers::errors::{ApiError, compute_error, database_error, not_found};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PageQuery, deserialize_nullable};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use common::{FundStatsDto, ManualOverrideDto};
use compute::coordinator::Replayed;
use compute::ledger::{CostChanges, NewCost};
use compute::money::to_cent_scale;
use compute::settlement::ManualOverride;
use model::entities::{cost_allocation, fund, group_cost};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for recording a group cost
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCostRequest {
    /// Cost type ID
    pub cost_type_id: i32,
    /// Date the cost was incurred; determines its settlement order
    pub cost_date: NaiveDate,
    /// Non-negative amount with at most two decimal places
    pub amount: Decimal,
    /// Free text notes
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Paid override (default: unset)
    pub manual_override: Option<ManualOverrideDto>,
}

/// Request body for updating a group cost
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateCostRequest {
    /// Cost type ID
    pub cost_type_id: Option<i32>,
    /// Date the cost was incurred
    pub cost_date: Option<NaiveDate>,
    /// Non-negative amount with at most two decimal places
    pub amount: Option<Decimal>,
    /// Free text notes; `null` clears them
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 2000))]
    pub notes: Option<Option<String>>,
    /// Paid override; `unset` returns the cost to automatic FIFO settlement
    pub manual_override: Option<ManualOverrideDto>,
}

/// Group cost response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CostResponse {
    pub id: i32,
    pub fund_id: i32,
    pub cost_type_id: i32,
    pub cost_date: NaiveDate,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub manual_override: ManualOverrideDto,
    /// Settled part of the amount, absent until the fund has been replayed
    pub paid_amount: Option<Decimal>,
    pub is_paid: Option<bool>,
    /// Fund figures after the write, only present on mutations
    pub fund_stats: Option<FundStatsDto>,
}

impl CostResponse {
    fn new(model: group_cost::Model, allocation: Option<cost_allocation::Model>) -> Self {
        Self {
            id: model.id,
            fund_id: model.fund_id,
            cost_type_id: model.cost_type_id,
            cost_date: model.cost_date,
            amount: to_cent_scale(model.amount),
            notes: model.notes,
            manual_override: ManualOverride::from(model.manual_paid_override).into(),
            paid_amount: allocation.as_ref().map(|a| to_cent_scale(a.paid_amount)),
            is_paid: allocation.map(|a| a.is_paid),
            fund_stats: None,
        }
    }

    fn replayed(replayed: Replayed<group_cost::Model>) -> Self {
        let allocation = replayed.settlement.allocation(replayed.value.id).copied();
        let mut response = Self::new(replayed.value, None);
        if let Some(allocation) = allocation {
            response.paid_amount = Some(allocation.paid_amount.to_decimal());
            response.is_paid = Some(allocation.is_paid);
        }
        response.fund_stats = Some((&replayed.settlement.stats).into());
        response
    }
}

/// Response of a cost deletion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedCostResponse {
    pub id: i32,
    pub fund_id: i32,
    pub fund_stats: FundStatsDto,
}

/// Record a group cost against a fund
#[utoipa::path(
    post,
    path = "/api/v1/funds/{fund_id}/costs",
    tag = "costs",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    request_body = CreateCostRequest,
    responses(
        (status = 201, description = "Cost created successfully", body = ApiResponse<CostResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Fund or cost type not found", body = ErrorResponse),
        (status = 422, description = "Invalid amount", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_cost(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateCostRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CostResponse>>), ApiError> {
    trace!("Entering create_cost function for fund_id: {}", fund_id);
    debug!("Creating cost of {} on {}", request.amount, request.cost_date);

    let replayed = state
        .coordinator
        .create_cost(
            fund_id,
            NewCost {
                cost_type_id: request.cost_type_id,
                cost_date: request.cost_date,
                amount: request.amount,
                notes: request.notes,
                manual_override: request.manual_override.unwrap_or_default().into(),
            },
        )
        .await
        .map_err(compute_error)?;

    info!("Cost created successfully with ID: {}", replayed.value.id);
    let response = ApiResponse {
        data: CostResponse::replayed(replayed),
        message: "Cost created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the group costs of a fund in settlement order
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/costs",
    tag = "costs",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Costs retrieved successfully", body = ApiResponse<Vec<CostResponse>>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_fund_costs(
    Path(fund_id): Path<i32>,
    Valid(Query(query)): Valid<Query<PageQuery>>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CostResponse>>>, ApiError> {
    trace!("Entering get_fund_costs function for fund_id: {}", fund_id);

    match fund::Entity::find_by_id(fund_id).one(&state.db).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found("fund", fund_id)),
        Err(e) => return Err(database_error("looking up fund", e)),
    }

    let (page, limit) = query.resolve();
    debug!("Fetching costs - page index: {}, limit: {}", page, limit);

    match group_cost::Entity::find()
        .find_also_related(cost_allocation::Entity)
        .filter(group_cost::Column::FundId.eq(fund_id))
        .order_by_asc(group_cost::Column::CostDate)
        .order_by_asc(group_cost::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await
    {
        Ok(rows) => {
            debug!("Found {} costs for fund {}", rows.len(), fund_id);
            let response = ApiResponse {
                data: rows
                    .into_iter()
                    .map(|(cost, allocation)| CostResponse::new(cost, allocation))
                    .collect(),
                message: "Costs retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(e) => Err(database_error("listing costs", e)),
    }
}

/// Get a group cost with its settled amount
#[utoipa::path(
    get,
    path = "/api/v1/costs/{cost_id}",
    tag = "costs",
    params(
        ("cost_id" = i32, Path, description = "Cost ID"),
    ),
    responses(
        (status = 200, description = "Cost retrieved successfully", body = ApiResponse<CostResponse>),
        (status = 404, description = "Cost not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_cost(
    Path(cost_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CostResponse>>, ApiError> {
    trace!("Entering get_cost function for cost_id: {}", cost_id);

    match group_cost::Entity::find_by_id(cost_id)
        .find_also_related(cost_allocation::Entity)
        .one(&state.db)
        .await
    {
        Ok(Some((cost, allocation))) => {
            let response = ApiResponse {
                data: CostResponse::new(cost, allocation),
                message: "Cost retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Ok(None) => Err(not_found("group cost", cost_id)),
        Err(e) => Err(database_error("looking up cost", e)),
    }
}

/// Update a group cost and replay its fund
#[utoipa::path(
    put,
    path = "/api/v1/costs/{cost_id}",
    tag = "costs",
    params(
        ("cost_id" = i32, Path, description = "Cost ID"),
    ),
    request_body = UpdateCostRequest,
    responses(
        (status = 200, description = "Cost updated successfully", body = ApiResponse<CostResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Cost or cost type not found", body = ErrorResponse),
        (status = 422, description = "Invalid amount", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_cost(
    Path(cost_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateCostRequest>>,
) -> Result<Json<ApiResponse<CostResponse>>, ApiError> {
    trace!("Entering update_cost function for cost_id: {}", cost_id);

    let changes = CostChanges {
        cost_type_id: request.cost_type_id,
        cost_date: request.cost_date,
        amount: request.amount,
        notes: request.notes,
        manual_override: request.manual_override.map(Into::into),
    };

    let replayed = state
        .coordinator
        .update_cost(cost_id, changes)
        .await
        .map_err(compute_error)?;

    info!("Cost {} updated successfully", cost_id);
    let response = ApiResponse {
        data: CostResponse::replayed(replayed),
        message: "Cost updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete a group cost and replay its fund
#[utoipa::path(
    delete,
    path = "/api/v1/costs/{cost_id}",
    tag = "costs",
    params(
        ("cost_id" = i32, Path, description = "Cost ID"),
    ),
    responses(
        (status = 200, description = "Cost deleted successfully", body = ApiResponse<DeletedCostResponse>),
        (status = 404, description = "Cost not found", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_cost(
    Path(cost_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DeletedCostResponse>>, ApiError> {
    trace!("Entering delete_cost function for cost_id: {}", cost_id);

    let replayed = state.coordinator.delete_cost(cost_id).await.map_err(compute_error)?;

    info!("Cost {} deleted successfully", cost_id);
    let response = ApiResponse {
        data: DeletedCostResponse {
            id: replayed.value.id,
            fund_id: replayed.value.fund_id,
            fund_stats: (&replayed.settlement.stats).into(),
        },
        message: "Cost deleted successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
