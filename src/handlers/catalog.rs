use super::common::PaginationParams;
use crate::entities::item::Model as ItemModel;
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog item as served to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    #[schema(example = "blue-shirt")]
    pub slug: String,
    #[schema(example = "Blue shirt")]
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[schema(example = "shirts")]
    pub category: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ItemModel> for ItemResponse {
    fn from(model: ItemModel) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            title: model.title,
            description: model.description,
            price: model.price,
            discount_price: model.discount_price,
            category: model.category,
            label: model.label,
            created_at: model.created_at,
        }
    }
}

/// List catalog items, newest first
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(PaginationParams),
    responses(
        (status = 200, description = "One page of the catalog", body = crate::ApiResponse<crate::PaginatedResponse<ItemResponse>>)
    ),
    tag = "Catalog"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ItemResponse>> {
    let (page, limit) = pagination.resolve(&state.config);

    let (records, total) = state.catalog_service().list_items(page, limit).await?;
    let items: Vec<ItemResponse> = records.into_iter().map(ItemResponse::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

/// Get a single catalog item by slug
#[utoipa::path(
    get,
    path = "/api/v1/items/{slug}",
    params(
        ("slug" = String, Path, description = "Item URL slug")
    ),
    responses(
        (status = 200, description = "Item detail", body = crate::ApiResponse<ItemResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Catalog"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<ItemResponse> {
    let item = state.catalog_service().get_item(&slug).await?;
    Ok(Json(ApiResponse::success(ItemResponse::from(item))))
}

/// Catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/:slug", get(get_item))
}
