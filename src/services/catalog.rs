use crate::{
    entities::{item, Item, ItemModel},
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;

/// Read side of the product catalog.
///
/// Items are managed out of band (seed data, back office); this service only
/// lists and resolves them, so it carries no event sender.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns one page of the catalog, newest first, plus the total count.
    ///
    /// `page` is 1-based; page 0 is treated as page 1.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ItemModel>, u64), ServiceError> {
        let paginator = Item::find()
            .order_by_desc(item::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Resolves a single item by its URL slug.
    #[instrument(skip(self))]
    pub async fn get_item(&self, slug: &str) -> Result<ItemModel, ServiceError> {
        Item::find()
            .filter(item::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", slug)))
    }
}
