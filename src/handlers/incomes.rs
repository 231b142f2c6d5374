use crate::handlers::errors::{ApiError, compute_error, database_error, not_found};
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PageQuery, deserialize_nullable};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use common::{DistributionLine, FundStatsDto};
use compute::coordinator::{IncomeChanges, IncomeWithDistributions, NewIncome, Replayed};
use compute::money::to_cent_scale;
use compute::report::distribution_line;
use model::entities::{distribution, fund, income};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for recording an income
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateIncomeRequest {
    /// Positive amount with at most two decimal places
    pub amount: Decimal,
    /// ISO 4217 currency; must match the fund's currency
    #[validate(length(equal = 3))]
    pub currency_code: String,
    /// Date the payment was received; dates the fund's share as an inflow
    pub received_date: NaiveDate,
    /// Free text description (e.g. the gig)
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Initial distribution set (default: empty)
    #[serde(default)]
    pub distributions: Vec<DistributionLine>,
}

/// Request body for updating an income
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateIncomeRequest {
    /// New amount; the existing distributions must still fit
    pub amount: Option<Decimal>,
    /// New received date
    pub received_date: Option<NaiveDate>,
    /// New description; `null` clears it
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 2000))]
    pub description: Option<Option<String>>,
}

/// Request body replacing the whole distribution set of an income
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReplaceDistributionsRequest {
    pub distributions: Vec<DistributionLine>,
}

/// Request body for an equal split over the fund's active members
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct EqualSplitRequest {
    /// Whether the mutual fund takes a share (and the rounding remainder)
    pub include_fund: bool,
}

/// Income response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncomeResponse {
    pub id: i32,
    pub fund_id: i32,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency_code: String,
    pub received_date: NaiveDate,
    pub distributions: Vec<DistributionLine>,
    /// Part of the amount not assigned to any recipient
    pub undistributed: Decimal,
    /// Fund figures after the write, only present on mutations
    pub fund_stats: Option<FundStatsDto>,
}

impl IncomeResponse {
    fn new(model: income::Model, distributions: &[distribution::Model]) -> Self {
        let distributed: Decimal = distributions.iter().map(|line| line.amount).sum();
        Self {
            id: model.id,
            fund_id: model.fund_id,
            description: model.description,
            undistributed: to_cent_scale(model.amount - distributed),
            amount: to_cent_scale(model.amount),
            currency_code: model.currency_code,
            received_date: model.received_date,
            distributions: distributions.iter().map(distribution_line).collect(),
            fund_stats: None,
        }
    }

    fn replayed(replayed: Replayed<IncomeWithDistributions>) -> Self {
        let mut response = Self::new(replayed.value.income, &replayed.value.distributions);
        response.fund_stats = Some((&replayed.settlement.stats).into());
        response
    }
}

/// Response of an income deletion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedIncomeResponse {
    pub id: i32,
    pub fund_id: i32,
    pub fund_stats: FundStatsDto,
}

/// Record an income with its initial distributions
#[utoipa::path(
    post,
    path = "/api/v1/funds/{fund_id}/incomes",
    tag = "incomes",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    request_body = CreateIncomeRequest,
    responses(
        (status = 201, description = "Income created successfully", body = ApiResponse<IncomeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 422, description = "Over-allocation, invalid recipient or invalid amount", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_income(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateIncomeRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<IncomeResponse>>), ApiError> {
    trace!("Entering create_income function for fund_id: {}", fund_id);
    debug!(
        "Creating income of {} {} with {} distribution lines",
        request.amount,
        request.currency_code,
        request.distributions.len()
    );

    let replayed = state
        .coordinator
        .create_income(
            fund_id,
            NewIncome {
                amount: request.amount,
                currency_code: request.currency_code,
                received_date: request.received_date,
                description: request.description,
                distributions: request.distributions.into_iter().map(Into::into).collect(),
            },
        )
        .await
        .map_err(compute_error)?;

    info!("Income created successfully with ID: {}", replayed.value.income.id);
    let response = ApiResponse {
        data: IncomeResponse::replayed(replayed),
        message: "Income created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the incomes of a fund, newest first
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/incomes",
    tag = "incomes",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Incomes retrieved successfully", body = ApiResponse<Vec<IncomeResponse>>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_fund_incomes(
    Path(fund_id): Path<i32>,
    Valid(Query(query)): Valid<Query<PageQuery>>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<IncomeResponse>>>, ApiError> {
    trace!("Entering get_fund_incomes function for fund_id: {}", fund_id);

    match fund::Entity::find_by_id(fund_id).one(&state.db).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found("fund", fund_id)),
        Err(e) => return Err(database_error("looking up fund", e)),
    }

    let (page, limit) = query.resolve();
    debug!("Fetching incomes - page index: {}, limit: {}", page, limit);

    let incomes = income::Entity::find()
        .filter(income::Column::FundId.eq(fund_id))
        .order_by_desc(income::Column::ReceivedDate)
        .order_by_desc(income::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page)
        .await
        .map_err(|e| database_error("listing incomes", e))?;

    let income_ids: Vec<i32> = incomes.iter().map(|income| income.id).collect();
    let lines = distribution::Entity::find()
        .filter(distribution::Column::IncomeId.is_in(income_ids))
        .order_by_asc(distribution::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| database_error("listing distributions", e))?;

    debug!("Found {} incomes with {} distribution lines", incomes.len(), lines.len());
    let data = incomes
        .into_iter()
        .map(|income| {
            let own: Vec<distribution::Model> =
                lines.iter().filter(|line| line.income_id == income.id).cloned().collect();
            IncomeResponse::new(income, &own)
        })
        .collect();

    let response = ApiResponse {
        data,
        message: "Incomes retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Get an income with its distributions
#[utoipa::path(
    get,
    path = "/api/v1/incomes/{income_id}",
    tag = "incomes",
    params(
        ("income_id" = i32, Path, description = "Income ID"),
    ),
    responses(
        (status = 200, description = "Income retrieved successfully", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_income(
    Path(income_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    trace!("Entering get_income function for income_id: {}", income_id);

    let income_model = match income::Entity::find_by_id(income_id).one(&state.db).await {
        Ok(Some(income)) => income,
        Ok(None) => return Err(not_found("income", income_id)),
        Err(e) => return Err(database_error("looking up income", e)),
    };

    let lines = distribution::Entity::find()
        .filter(distribution::Column::IncomeId.eq(income_id))
        .order_by_asc(distribution::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| database_error("listing distributions", e))?;

    let response = ApiResponse {
        data: IncomeResponse::new(income_model, &lines),
        message: "Income retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Update an income and replay its fund
#[utoipa::path(
    put,
    path = "/api/v1/incomes/{income_id}",
    tag = "incomes",
    params(
        ("income_id" = i32, Path, description = "Income ID"),
    ),
    request_body = UpdateIncomeRequest,
    responses(
        (status = 200, description = "Income updated successfully", body = ApiResponse<IncomeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 422, description = "Existing distributions exceed the new amount, or invalid amount", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_income(
    Path(income_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateIncomeRequest>>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    trace!("Entering update_income function for income_id: {}", income_id);

    let changes = IncomeChanges {
        amount: request.amount,
        received_date: request.received_date,
        description: request.description,
    };

    let replayed = state
        .coordinator
        .update_income(income_id, changes)
        .await
        .map_err(compute_error)?;

    info!("Income {} updated successfully", income_id);
    let response = ApiResponse {
        data: IncomeResponse::replayed(replayed),
        message: "Income updated successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Delete an income with its distributions and replay its fund
#[utoipa::path(
    delete,
    path = "/api/v1/incomes/{income_id}",
    tag = "incomes",
    params(
        ("income_id" = i32, Path, description = "Income ID"),
    ),
    responses(
        (status = 200, description = "Income deleted successfully", body = ApiResponse<DeletedIncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_income(
    Path(income_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DeletedIncomeResponse>>, ApiError> {
    trace!("Entering delete_income function for income_id: {}", income_id);

    let replayed = state.coordinator.delete_income(income_id).await.map_err(compute_error)?;

    info!("Income {} deleted successfully", income_id);
    let response = ApiResponse {
        data: DeletedIncomeResponse {
            id: replayed.value.id,
            fund_id: replayed.value.fund_id,
            fund_stats: (&replayed.settlement.stats).into(),
        },
        message: "Income deleted successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Replace the whole distribution set of an income
#[utoipa::path(
    put,
    path = "/api/v1/incomes/{income_id}/distributions",
    tag = "incomes",
    params(
        ("income_id" = i32, Path, description = "Income ID"),
    ),
    request_body = ReplaceDistributionsRequest,
    responses(
        (status = 200, description = "Distributions replaced successfully", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 422, description = "Over-allocation, invalid recipient or invalid amount", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn replace_distributions(
    Path(income_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<ReplaceDistributionsRequest>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    trace!("Entering replace_distributions function for income_id: {}", income_id);
    debug!("Replacing with {} distribution lines", request.distributions.len());

    let proposed = request.distributions.into_iter().map(Into::into).collect();
    let replayed = state
        .coordinator
        .replace_distributions(income_id, proposed)
        .await
        .map_err(compute_error)?;

    info!("Distributions of income {} replaced", income_id);
    let response = ApiResponse {
        data: IncomeResponse::replayed(replayed),
        message: "Distributions replaced successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}

/// Split an income evenly over the fund's active members
#[utoipa::path(
    post,
    path = "/api/v1/incomes/{income_id}/distributions/equal-split",
    tag = "incomes",
    params(
        ("income_id" = i32, Path, description = "Income ID"),
    ),
    request_body = EqualSplitRequest,
    responses(
        (status = 200, description = "Income split successfully", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 422, description = "No recipients to split between", body = ErrorResponse),
        (status = 503, description = "Fund ledger busy, retry later", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn equal_split(
    Path(income_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<EqualSplitRequest>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    trace!("Entering equal_split function for income_id: {}", income_id);

    let replayed = state
        .coordinator
        .equal_split(income_id, request.include_fund)
        .await
        .map_err(compute_error)?;

    info!("Income {} split into {} lines", income_id, replayed.value.distributions.len());
    let response = ApiResponse {
        data: IncomeResponse::replayed(replayed),
        message: "Income split successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
