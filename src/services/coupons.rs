use crate::{
    entities::{coupon, order, Coupon},
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart::{build_cart_summary, require_active_order, CartSummary},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Applies discount codes to open orders.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Attaches the coupon named by `code` to the caller's open order.
    ///
    /// An order can hold one coupon; applying a second replaces the first
    /// (last write wins, no stacking). The order check runs before the code
    /// lookup, so a user with no cart hears about the cart, not the code.
    ///
    /// # Returns
    ///
    /// * `Ok(CartSummary)` - The repriced cart
    /// * `Err(ServiceError::NoActiveOrder)` - No cart is open
    /// * `Err(ServiceError::NotFound)` - No coupon has this code
    #[instrument(skip(self))]
    pub async fn apply(&self, user_id: Uuid, code: &str) -> Result<CartSummary, ServiceError> {
        let txn = self.db.begin().await?;

        let order = require_active_order(&txn, user_id).await?;

        let coupon = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("This coupon does not exist".to_string()))?;

        let coupon_id = coupon.id;
        let mut order: order::ActiveModel = order.into();
        order.coupon_id = Set(Some(coupon_id));
        order.updated_at = Set(Some(Utc::now()));
        let order = order.update(&txn).await?;

        let summary = build_cart_summary(&txn, &order).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                order_id: order.id,
                coupon_id,
            })
            .await;

        info!("Applied coupon {} to order {}", coupon_id, order.id);
        Ok(summary)
    }
}
