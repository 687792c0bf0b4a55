use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::services::checkout::PaymentRoute;
use crate::services::payments::PaymentReceipt;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChargeRequest {
    /// Opaque payment token collected client-side
    #[validate(length(min = 1, message = "Source token cannot be empty"))]
    #[schema(example = "tok_visa")]
    pub source_token: String,
}

/// Charge the caller's cart through the chosen provider
#[utoipa::path(
    post,
    path = "/api/v1/checkout/payment/{provider}",
    params(
        ("provider" = String, Path, description = "Payment route: stripe or paypal")
    ),
    request_body = ChargeRequest,
    responses(
        (status = 200, description = "Order finalized", body = crate::ApiResponse<PaymentReceipt>),
        (status = 400, description = "Unknown provider, empty token, or missing billing address", body = crate::errors::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 402, description = "Card declined", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active order", body = crate::errors::ErrorResponse),
        (status = 502, description = "Gateway failure", body = crate::errors::ErrorResponse),
        (status = 503, description = "Gateway rate limit", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn charge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(provider): Path<String>,
    Json(request): Json<ChargeRequest>,
) -> ApiResult<PaymentReceipt> {
    request.validate()?;

    let route = PaymentRoute::from_provider(&provider).ok_or_else(|| {
        ServiceError::ValidationError("Invalid payment option selected.".to_string())
    })?;

    let receipt = state
        .payment_service()
        .charge(user.user_id, route, &request.source_token)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        receipt,
        "Your order was successful!",
    )))
}

/// Payment routes, mounted under checkout
pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/payment/:provider", post(charge))
}
