use crate::auth::AuthenticatedUser;
use crate::services::cart::CartSummary;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};

/// Get the caller's cart
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Current cart with priced lines", body = crate::ApiResponse<CartSummary>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "No active order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<CartSummary> {
    let summary = state.cart_service().summary(user.user_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Add one unit of an item to the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/items/{slug}",
    params(
        ("slug" = String, Path, description = "Item URL slug")
    ),
    responses(
        (status = 200, description = "Item added or quantity bumped", body = crate::ApiResponse<CartSummary>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> ApiResult<CartSummary> {
    let mutation = state.cart_service().add_item(user.user_id, &slug).await?;
    Ok(Json(ApiResponse::success_with_message(
        mutation.summary,
        mutation.notice.message(),
    )))
}

/// Remove an item from the cart entirely
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{slug}",
    params(
        ("slug" = String, Path, description = "Item URL slug")
    ),
    responses(
        (status = 200, description = "Line removed", body = crate::ApiResponse<CartSummary>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not in cart, or no active order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> ApiResult<CartSummary> {
    let mutation = state.cart_service().remove_item(user.user_id, &slug).await?;
    Ok(Json(ApiResponse::success_with_message(
        mutation.summary,
        mutation.notice.message(),
    )))
}

/// Drop one unit of an item from the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/items/{slug}/decrement",
    params(
        ("slug" = String, Path, description = "Item URL slug")
    ),
    responses(
        (status = 200, description = "Quantity lowered, or line removed at one unit", body = crate::ApiResponse<CartSummary>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not in cart, or no active order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn decrement_cart_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(slug): Path<String>,
) -> ApiResult<CartSummary> {
    let mutation = state
        .cart_service()
        .decrement_item(user.user_id, &slug)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        mutation.summary,
        mutation.notice.message(),
    )))
}

/// Cart routes, including the coupon subroute
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items/:slug", post(add_cart_item).delete(remove_cart_item))
        .route("/items/:slug/decrement", post(decrement_cart_item))
        .merge(super::coupons::coupon_routes())
}
