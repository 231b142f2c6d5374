use std::sync::Arc;

use common::{
    CacheCheckDto, CostAllocationDto, DistributionLine, FundReportDto, FundStatsDto,
    ManualOverrideDto, RecipientKind, RecomputeDto,
};
use compute::RecomputeCoordinator;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use validator::Validate;

use crate::handlers::cost_types::{CostTypeResponse, CreateCostTypeRequest};
use crate::handlers::costs::{CostResponse, CreateCostRequest, DeletedCostResponse, UpdateCostRequest};
use crate::handlers::funds::{CreateFundRequest, FundResponse, UpdateFundRequest};
use crate::handlers::incomes::{
    CreateIncomeRequest, DeletedIncomeResponse, EqualSplitRequest, IncomeResponse,
    ReplaceDistributionsRequest, UpdateIncomeRequest,
};
use crate::handlers::members::{CreateMemberRequest, MemberResponse, UpdateMemberRequest};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection used by read-only handlers
    pub db: DatabaseConnection,
    /// Owner of every write that touches a fund ledger
    pub coordinator: Arc<RecomputeCoordinator>,
}

impl AppState {
    pub fn new(coordinator: RecomputeCoordinator) -> Self {
        Self {
            db: coordinator.db().clone(),
            coordinator: Arc::new(coordinator),
        }
    }
}

/// Field deserializer for partial updates that can clear a value.
///
/// Combined with `#[serde(default)]`: an absent field stays `None` (unchanged),
/// an explicit `null` becomes `Some(None)` (clear).
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query parameters shared by list endpoints
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct PageQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    /// Page size (default: 100)
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Zero based page index and page size.
    pub fn resolve(&self) -> (u64, u64) {
        (self.page.unwrap_or(1) - 1, self.limit.unwrap_or(100))
    }
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Request field the error refers to, e.g. `distributions[2].amount`
    pub field: Option<String>,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::funds::create_fund,
        crate::handlers::funds::get_fund,
        crate::handlers::funds::update_fund,
        crate::handlers::funds::get_fund_report,
        crate::handlers::funds::recompute_fund,
        crate::handlers::funds::verify_fund,
        crate::handlers::members::create_member,
        crate::handlers::members::get_fund_members,
        crate::handlers::members::update_member,
        crate::handlers::incomes::create_income,
        crate::handlers::incomes::get_fund_incomes,
        crate::handlers::incomes::get_income,
        crate::handlers::incomes::update_income,
        crate::handlers::incomes::delete_income,
        crate::handlers::incomes::replace_distributions,
        crate::handlers::incomes::equal_split,
        crate::handlers::cost_types::create_cost_type,
        crate::handlers::cost_types::get_cost_types,
        crate::handlers::costs::create_cost,
        crate::handlers::costs::get_fund_costs,
        crate::handlers::costs::get_cost,
        crate::handlers::costs::update_cost,
        crate::handlers::costs::delete_cost,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            PageQuery,
            CreateFundRequest,
            UpdateFundRequest,
            FundResponse,
            CreateMemberRequest,
            UpdateMemberRequest,
            MemberResponse,
            CreateIncomeRequest,
            UpdateIncomeRequest,
            ReplaceDistributionsRequest,
            EqualSplitRequest,
            IncomeResponse,
            DeletedIncomeResponse,
            CreateCostTypeRequest,
            CostTypeResponse,
            CreateCostRequest,
            UpdateCostRequest,
            CostResponse,
            DeletedCostResponse,
            DistributionLine,
            RecipientKind,
            ManualOverrideDto,
            FundStatsDto,
            CostAllocationDto,
            FundReportDto,
            RecomputeDto,
            CacheCheckDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "funds", description = "Mutual fund and settlement report endpoints"),
        (name = "members", description = "Band member endpoints"),
        (name = "incomes", description = "Income and distribution endpoints"),
        (name = "cost-types", description = "Cost type endpoints"),
        (name = "costs", description = "Group cost endpoints"),
    ),
    info(
        title = "Bandfund API",
        description = "Mutual fund settlement for bands - income distribution, group costs and FIFO cost settlement",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
