use crate::handlers::errors::{ApiError, database_error, error_response};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use model::entities::cost_type;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a cost type
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCostTypeRequest {
    /// Unique cost type name (e.g. "Rehearsal room")
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Cost type response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CostTypeResponse {
    pub id: i32,
    pub name: String,
}

impl From<cost_type::Model> for CostTypeResponse {
    fn from(model: cost_type::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Create a cost type
#[utoipa::path(
    post,
    path = "/api/v1/cost-types",
    tag = "cost-types",
    request_body = CreateCostTypeRequest,
    responses(
        (status = 201, description = "Cost type created successfully", body = ApiResponse<CostTypeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Cost type name already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_cost_type(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateCostTypeRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CostTypeResponse>>), ApiError> {
    trace!("Entering create_cost_type function");

    match cost_type::Entity::find()
        .filter(cost_type::Column::Name.eq(request.name.as_str()))
        .one(&state.db)
        .await
    {
        Ok(Some(_)) => {
            warn!("Cost type '{}' already exists", request.name);
            return Err(error_response(
                StatusCode::CONFLICT,
                "DUPLICATE_NAME",
                format!("Cost type '{}' already exists", request.name),
                Some("name".to_string()),
            ));
        }
        Ok(None) => {}
        Err(e) => return Err(database_error("looking up cost type", e)),
    }

    let new_cost_type = cost_type::ActiveModel {
        name: Set(request.name),
        ..Default::default()
    };

    match new_cost_type.insert(&state.db).await {
        Ok(model) => {
            info!("Cost type created successfully with ID: {}", model.id);
            let response = ApiResponse {
                data: CostTypeResponse::from(model),
                message: "Cost type created successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => Err(database_error("creating cost type", e)),
    }
}

/// List all cost types
#[utoipa::path(
    get,
    path = "/api/v1/cost-types",
    tag = "cost-types",
    responses(
        (status = 200, description = "Cost types retrieved successfully", body = ApiResponse<Vec<CostTypeResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_cost_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CostTypeResponse>>>, ApiError> {
    trace!("Entering get_cost_types function");

    match cost_type::Entity::find()
        .order_by_asc(cost_type::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(cost_types) => {
            debug!("Found {} cost types", cost_types.len());
            let response = ApiResponse {
                data: cost_types.into_iter().map(CostTypeResponse::from).collect(),
                message: "Cost types retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(e) => Err(database_error("listing cost types", e)),
    }
}
