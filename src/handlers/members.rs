use crate::handlers::errors::{ApiError, database_error, not_found};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::{fund, member};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for adding a member to a fund
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateMemberRequest {
    /// Member name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Request body for updating a member
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Default)]
pub struct UpdateMemberRequest {
    /// Member name
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// Inactive members keep their existing distributions but cannot receive new ones
    pub is_active: Option<bool>,
}

/// Member response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub id: i32,
    pub fund_id: i32,
    pub name: String,
    pub is_active: bool,
}

impl From<member::Model> for MemberResponse {
    fn from(model: member::Model) -> Self {
        Self {
            id: model.id,
            fund_id: model.fund_id,
            name: model.name,
            is_active: model.is_active,
        }
    }
}

async fn ensure_fund(state: &AppState, fund_id: i32) -> Result<(), ApiError> {
    match fund::Entity::find_by_id(fund_id).one(&state.db).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(not_found("fund", fund_id)),
        Err(e) => Err(database_error("looking up fund", e)),
    }
}

/// Add a member to a fund
#[utoipa::path(
    post,
    path = "/api/v1/funds/{fund_id}/members",
    tag = "members",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    request_body = CreateMemberRequest,
    responses(
        (status = 201, description = "Member created successfully", body = ApiResponse<MemberResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_member(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateMemberRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<MemberResponse>>), ApiError> {
    trace!("Entering create_member function for fund_id: {}", fund_id);
    ensure_fund(&state, fund_id).await?;

    let new_member = member::ActiveModel {
        fund_id: Set(fund_id),
        name: Set(request.name),
        is_active: Set(true),
        ..Default::default()
    };

    match new_member.insert(&state.db).await {
        Ok(member_model) => {
            info!("Member created successfully with ID: {}", member_model.id);
            let response = ApiResponse {
                data: MemberResponse::from(member_model),
                message: "Member created successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(e) => Err(database_error("creating member", e)),
    }
}

/// List the members of a fund
#[utoipa::path(
    get,
    path = "/api/v1/funds/{fund_id}/members",
    tag = "members",
    params(
        ("fund_id" = i32, Path, description = "Fund ID"),
    ),
    responses(
        (status = 200, description = "Members retrieved successfully", body = ApiResponse<Vec<MemberResponse>>),
        (status = 404, description = "Fund not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_fund_members(
    Path(fund_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MemberResponse>>>, ApiError> {
    trace!("Entering get_fund_members function for fund_id: {}", fund_id);
    ensure_fund(&state, fund_id).await?;

    match member::Entity::find()
        .filter(member::Column::FundId.eq(fund_id))
        .order_by_asc(member::Column::Id)
        .all(&state.db)
        .await
    {
        Ok(members) => {
            debug!("Found {} members for fund {}", members.len(), fund_id);
            let response = ApiResponse {
                data: members.into_iter().map(MemberResponse::from).collect(),
                message: "Members retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(e) => Err(database_error("listing members", e)),
    }
}

/// Rename or (de)activate a member
#[utoipa::path(
    put,
    path = "/api/v1/members/{member_id}",
    tag = "members",
    params(
        ("member_id" = i32, Path, description = "Member ID"),
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated successfully", body = ApiResponse<MemberResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Member not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_member(
    Path(member_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateMemberRequest>>,
) -> Result<Json<ApiResponse<MemberResponse>>, ApiError> {
    trace!("Entering update_member function for member_id: {}", member_id);

    let existing_member = match member::Entity::find_by_id(member_id).one(&state.db).await {
        Ok(Some(member)) => member,
        Ok(None) => return Err(not_found("member", member_id)),
        Err(e) => return Err(database_error("looking up member", e)),
    };

    let mut member_active: member::ActiveModel = existing_member.into();
    if let Some(name) = request.name {
        member_active.name = Set(name);
    }
    if let Some(is_active) = request.is_active {
        debug!("Setting member {} active flag to {}", member_id, is_active);
        member_active.is_active = Set(is_active);
    }

    match member_active.update(&state.db).await {
        Ok(updated_member) => {
            info!("Member {} updated successfully", member_id);
            let response = ApiResponse {
                data: MemberResponse::from(updated_member),
                message: "Member updated successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(e) => Err(database_error("updating member", e)),
    }
}
