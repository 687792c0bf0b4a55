use crate::auth::AuthenticatedUser;
use crate::services::cart::CartSummary;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, message = "Code cannot be empty"))]
    #[schema(example = "WELCOME10")]
    pub code: String,
}

/// Apply a coupon code to the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/coupon",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Coupon applied", body = crate::ApiResponse<CartSummary>),
        (status = 400, description = "Empty code", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown coupon, or no active order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ApplyCouponRequest>,
) -> ApiResult<CartSummary> {
    request.validate()?;

    let summary = state
        .coupon_service()
        .apply(user.user_id, request.code.trim())
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        summary,
        "Successfully added coupon",
    )))
}

/// Coupon routes, mounted under the cart
pub fn coupon_routes() -> Router<AppState> {
    Router::new().route("/coupon", post(apply_coupon))
}
