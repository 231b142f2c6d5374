use crate::handlers::{
    cost_types::{create_cost_type, get_cost_types},
    costs::{create_cost, delete_cost, get_cost, get_fund_costs, update_cost},
    funds::{create_fund, get_fund, get_fund_report, recompute_fund, update_fund, verify_fund},
    health::health_check,
    incomes::{
        create_income, delete_income, equal_split, get_fund_incomes, get_income,
        replace_distributions, update_income,
    },
    members::{create_member, get_fund_members, update_member},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
///
/// The request timeout sits above the ledger mutation deadline so a slow
/// mutation reports its own timeout instead of being cut off mid-response.
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.coordinator.settings().lock_timeout
        + state.coordinator.settings().mutation_timeout
        + Duration::from_secs(5);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Fund routes
        .route("/api/v1/funds", post(create_fund))
        .route("/api/v1/funds/:fund_id", get(get_fund).put(update_fund))
        .route("/api/v1/funds/:fund_id/report", get(get_fund_report))
        .route("/api/v1/funds/:fund_id/recompute", post(recompute_fund))
        .route("/api/v1/funds/:fund_id/verify", get(verify_fund))
        // Member routes
        .route("/api/v1/funds/:fund_id/members", post(create_member).get(get_fund_members))
        .route("/api/v1/members/:member_id", put(update_member))
        // Income and distribution routes
        .route("/api/v1/funds/:fund_id/incomes", post(create_income).get(get_fund_incomes))
        .route(
            "/api/v1/incomes/:income_id",
            get(get_income).put(update_income).delete(delete_income),
        )
        .route("/api/v1/incomes/:income_id/distributions", put(replace_distributions))
        .route("/api/v1/incomes/:income_id/distributions/equal-split", post(equal_split))
        // Cost type routes
        .route("/api/v1/cost-types", post(create_cost_type).get(get_cost_types))
        // Group cost routes
        .route("/api/v1/funds/:fund_id/costs", post(create_cost).get(get_fund_costs))
        .route(
            "/api/v1/costs/:cost_id",
            get(get_cost).put(update_cost).delete(delete_cost),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
