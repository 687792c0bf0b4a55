use crate::services::refunds::{RefundInput, RefundReceipt};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json, routing::post, Router};
use validator::Validate;

/// File a refund request for a finalized order
#[utoipa::path(
    post,
    path = "/api/v1/refunds",
    request_body = RefundInput,
    responses(
        (status = 200, description = "Request recorded", body = crate::ApiResponse<RefundReceipt>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown reference code", body = crate::errors::ErrorResponse)
    ),
    tag = "Refunds"
)]
pub async fn request_refund(
    State(state): State<AppState>,
    Json(input): Json<RefundInput>,
) -> ApiResult<RefundReceipt> {
    input.validate()?;

    let receipt = state.refund_service().request_refund(input).await?;
    Ok(Json(ApiResponse::success_with_message(
        receipt,
        "Your request was received.",
    )))
}

/// Refund intake routes
pub fn refund_routes() -> Router<AppState> {
    Router::new().route("/", post(request_refund))
}
