use crate::auth::AuthenticatedUser;
use crate::services::checkout::{CheckoutInput, CheckoutReceipt};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json, routing::post, Router};
use validator::Validate;

/// Submit the checkout form for the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutInput,
    responses(
        (status = 200, description = "Billing address attached; response names the payment route", body = crate::ApiResponse<CheckoutReceipt>),
        (status = 400, description = "Invalid address fields or payment option", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn submit_checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<CheckoutInput>,
) -> ApiResult<CheckoutReceipt> {
    input.validate()?;

    let receipt = state.checkout_service().submit(user.user_id, input).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// Checkout routes, including the payment subroute
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_checkout))
        .merge(super::payments::payment_routes())
}
