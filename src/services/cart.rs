use crate::{
    entities::{active_order, item, order, order_item, ActiveOrder, Coupon, Item, Order, OrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user shopping cart operations.
///
/// A cart is an `orders` row with `ordered = false`. The `active_orders`
/// table maps each user to at most one such row; every mutation here resolves
/// the caller's cart through it, creating the order lazily on first add.
/// Cart lines are `order_items` rows scoped to (user, item): removing a line
/// detaches it (`order_id = NULL`) instead of deleting it, and a later re-add
/// reclaims the detached row at quantity 1.
///
/// All mutations run inside a transaction and publish domain events after
/// commit.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    /// Creates a new `CartService` instance.
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the caller's current cart.
    ///
    /// # Returns
    ///
    /// * `Ok(CartSummary)` - Priced lines plus any applied coupon
    /// * `Err(ServiceError::NoActiveOrder)` - No cart is open
    #[instrument(skip(self))]
    pub async fn summary(&self, user_id: Uuid) -> Result<CartSummary, ServiceError> {
        let order = require_active_order(&*self.db, user_id).await?;
        build_cart_summary(&*self.db, &order).await
    }

    /// Adds one unit of `slug` to the caller's cart.
    ///
    /// Opens a cart first if none exists. A line already in the cart has its
    /// quantity incremented; a detached line left over from an earlier remove
    /// is re-attached at quantity 1; otherwise a fresh line is inserted.
    ///
    /// Two concurrent first-adds can race on cart creation; the loser hits
    /// the `active_orders` primary key, rolls back, and retries against the
    /// winner's cart.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The authenticated caller
    /// * `slug` - URL slug of the catalog item
    ///
    /// # Returns
    ///
    /// * `Ok(CartMutation)` - The notice to display plus the updated summary
    /// * `Err(ServiceError::NotFound)` - No catalog item has this slug
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: Uuid, slug: &str) -> Result<CartMutation, ServiceError> {
        match self.try_add_item(user_id, slug).await {
            Err(ServiceError::DatabaseError(err))
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.try_add_item(user_id, slug).await
            }
            other => other,
        }
    }

    async fn try_add_item(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<CartMutation, ServiceError> {
        let txn = self.db.begin().await?;

        let item = Item::find()
            .filter(item::Column::Slug.eq(slug))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", slug)))?;

        let (order, order_created) = match find_active_order(&txn, user_id).await? {
            Some(order) => (order, false),
            None => (create_active_order(&txn, user_id).await?, true),
        };

        // Any unordered line for (user, item), attached to this cart or
        // detached from an earlier one.
        let existing = OrderItem::find()
            .filter(order_item::Column::UserId.eq(user_id))
            .filter(order_item::Column::ItemId.eq(item.id))
            .filter(order_item::Column::Ordered.eq(false))
            .one(&txn)
            .await?;

        let (line, notice) = match existing {
            Some(line) if line.order_id == Some(order.id) => {
                let quantity = line.quantity + 1;
                let mut line: order_item::ActiveModel = line.into();
                line.quantity = Set(quantity);
                line.updated_at = Set(Some(Utc::now()));
                (line.update(&txn).await?, CartNotice::QuantityUpdated)
            }
            Some(line) => {
                let mut line: order_item::ActiveModel = line.into();
                line.order_id = Set(Some(order.id));
                line.quantity = Set(1);
                line.updated_at = Set(Some(Utc::now()));
                (line.update(&txn).await?, CartNotice::ItemAdded)
            }
            None => {
                let line = order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    item_id: Set(item.id),
                    order_id: Set(Some(order.id)),
                    quantity: Set(1),
                    ordered: Set(false),
                    ..Default::default()
                };
                (line.insert(&txn).await?, CartNotice::ItemAdded)
            }
        };

        let summary = build_cart_summary(&txn, &order).await?;
        txn.commit().await?;

        if order_created {
            self.event_sender
                .send_or_log(Event::OrderCreated(order.id))
                .await;
        }
        let event = match notice {
            CartNotice::QuantityUpdated => Event::CartItemQuantityChanged {
                order_id: order.id,
                item_id: item.id,
                quantity: line.quantity,
            },
            _ => Event::CartItemAdded {
                order_id: order.id,
                item_id: item.id,
                quantity: line.quantity,
            },
        };
        self.event_sender.send_or_log(event).await;

        info!(
            "Cart add: item {} x{} on order {}",
            item.id, line.quantity, order.id
        );
        Ok(CartMutation { notice, summary })
    }

    /// Removes the `slug` line from the caller's cart entirely.
    ///
    /// The row is detached and its quantity reset to 1, not deleted, so a
    /// later re-add starts clean.
    ///
    /// # Returns
    ///
    /// * `Ok(CartMutation)` - Notice plus the updated summary
    /// * `Err(ServiceError::NotFound)` - Unknown slug, or the item is not in
    ///   the cart
    /// * `Err(ServiceError::NoActiveOrder)` - No cart is open
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<CartMutation, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, line) = find_cart_line(&txn, user_id, slug).await?;
        let item_id = line.item_id;

        let mut line: order_item::ActiveModel = line.into();
        line.order_id = Set(None);
        line.quantity = Set(1);
        line.updated_at = Set(Some(Utc::now()));
        line.update(&txn).await?;

        let summary = build_cart_summary(&txn, &order).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                order_id: order.id,
                item_id,
            })
            .await;

        info!("Cart remove: item {} off order {}", item_id, order.id);
        Ok(CartMutation {
            notice: CartNotice::ItemRemoved,
            summary,
        })
    }

    /// Drops one unit of `slug` from the caller's cart.
    ///
    /// At quantity 1 the line is detached instead. The notice reads
    /// "quantity updated" in both cases.
    #[instrument(skip(self))]
    pub async fn decrement_item(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<CartMutation, ServiceError> {
        let txn = self.db.begin().await?;

        let (order, line) = find_cart_line(&txn, user_id, slug).await?;
        let item_id = line.item_id;
        let detach = line.quantity <= 1;
        let quantity = if detach { 1 } else { line.quantity - 1 };

        let mut line: order_item::ActiveModel = line.into();
        if detach {
            line.order_id = Set(None);
        } else {
            line.quantity = Set(quantity);
        }
        line.updated_at = Set(Some(Utc::now()));
        line.update(&txn).await?;

        let summary = build_cart_summary(&txn, &order).await?;
        txn.commit().await?;

        let event = if detach {
            Event::CartItemRemoved {
                order_id: order.id,
                item_id,
            }
        } else {
            Event::CartItemQuantityChanged {
                order_id: order.id,
                item_id,
                quantity,
            }
        };
        self.event_sender.send_or_log(event).await;

        Ok(CartMutation {
            notice: CartNotice::QuantityUpdated,
            summary,
        })
    }
}

/// Looks up the caller's open order through the `active_orders` keyed row.
pub(crate) async fn find_active_order(
    conn: &impl ConnectionTrait,
    user_id: Uuid,
) -> Result<Option<order::Model>, ServiceError> {
    let active = match ActiveOrder::find_by_id(user_id).one(conn).await? {
        Some(active) => active,
        None => return Ok(None),
    };

    let order = Order::find_by_id(active.order_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "active_orders points at missing order {}",
                active.order_id
            ))
        })?;

    Ok(Some(order))
}

/// Like [`find_active_order`], but a missing cart is an error.
pub(crate) async fn require_active_order(
    conn: &impl ConnectionTrait,
    user_id: Uuid,
) -> Result<order::Model, ServiceError> {
    find_active_order(conn, user_id)
        .await?
        .ok_or(ServiceError::NoActiveOrder)
}

/// Opens a fresh order and claims the caller's `active_orders` slot.
///
/// The primary key on `active_orders.user_id` is the arbiter for concurrent
/// cart creation: exactly one insert survives, the other surfaces a unique
/// constraint violation and the caller retries against the winner's row.
pub(crate) async fn create_active_order(
    conn: &impl ConnectionTrait,
    user_id: Uuid,
) -> Result<order::Model, ServiceError> {
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        ordered: Set(false),
        refund_requested: Set(false),
        ..Default::default()
    };
    let order = order.insert(conn).await?;

    let active = active_order::ActiveModel {
        user_id: Set(user_id),
        order_id: Set(order.id),
        created_at: Set(Utc::now()),
    };
    active.insert(conn).await?;

    Ok(order)
}

/// Resolves `slug` to the matching line in the caller's open cart.
async fn find_cart_line(
    conn: &impl ConnectionTrait,
    user_id: Uuid,
    slug: &str,
) -> Result<(order::Model, order_item::Model), ServiceError> {
    let item = Item::find()
        .filter(item::Column::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", slug)))?;

    let order = require_active_order(conn, user_id).await?;

    let line = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .filter(order_item::Column::ItemId.eq(item.id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("This item is not in your cart".to_string()))?;

    Ok((order, line))
}

/// Prices an open order: attached lines at their effective unit price, minus
/// any applied coupon.
pub(crate) async fn build_cart_summary(
    conn: &impl ConnectionTrait,
    order: &order::Model,
) -> Result<CartSummary, ServiceError> {
    let rows = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .find_also_related(Item)
        .order_by_asc(order_item::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    let mut total = Decimal::ZERO;
    for (line, item) in rows {
        let item = item.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "order item {} references a missing item",
                line.id
            ))
        })?;
        let unit_price = item.effective_price();
        let line_total = unit_price * Decimal::from(line.quantity);
        total += line_total;
        lines.push(CartLine {
            item_id: item.id,
            slug: item.slug,
            title: item.title,
            quantity: line.quantity,
            unit_price,
            line_total,
        });
    }

    let coupon = match order.coupon_id {
        Some(coupon_id) => Coupon::find_by_id(coupon_id).one(conn).await?,
        None => None,
    };
    // Fixed-amount discount, applied to the whole order. The total is allowed
    // to go negative, matching the storefront's historical behavior.
    if let Some(ref coupon) = coupon {
        total -= coupon.amount;
    }

    Ok(CartSummary {
        order_id: order.id,
        lines,
        coupon: coupon.map(|c| AppliedCoupon {
            code: c.code,
            amount: c.amount,
        }),
        total,
    })
}

/// User-facing outcome of a cart mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartNotice {
    ItemAdded,
    QuantityUpdated,
    ItemRemoved,
}

impl CartNotice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ItemAdded => "This item was added to your cart",
            Self::QuantityUpdated => "This item quantity was updated",
            Self::ItemRemoved => "This item was removed from your cart",
        }
    }
}

/// One priced line of the cart.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub item_id: Uuid,
    #[schema(example = "blue-shirt")]
    pub slug: String,
    #[schema(example = "Blue shirt")]
    pub title: String,
    #[schema(example = 2)]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Coupon currently attached to the order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedCoupon {
    #[schema(example = "WELCOME10")]
    pub code: String,
    pub amount: Decimal,
}

/// Snapshot of the caller's cart after pricing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartSummary {
    pub order_id: Uuid,
    pub lines: Vec<CartLine>,
    pub coupon: Option<AppliedCoupon>,
    pub total: Decimal,
}

/// A cart mutation's outcome: what to tell the user, and the cart afterwards.
#[derive(Debug, Clone)]
pub struct CartMutation {
    pub notice: CartNotice,
    pub summary: CartSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notice_messages_match_storefront_strings() {
        assert_eq!(
            CartNotice::ItemAdded.message(),
            "This item was added to your cart"
        );
        assert_eq!(
            CartNotice::QuantityUpdated.message(),
            "This item quantity was updated"
        );
        assert_eq!(
            CartNotice::ItemRemoved.message(),
            "This item was removed from your cart"
        );
    }

    #[test]
    fn cart_summary_serializes_decimal_totals_as_strings() {
        let summary = CartSummary {
            order_id: Uuid::new_v4(),
            lines: vec![CartLine {
                item_id: Uuid::new_v4(),
                slug: "blue-shirt".to_string(),
                title: "Blue shirt".to_string(),
                quantity: 2,
                unit_price: dec!(20.00),
                line_total: dec!(40.00),
            }],
            coupon: None,
            total: dec!(40.00),
        };

        let json = serde_json::to_value(&summary).expect("serialization should succeed");
        assert_eq!(json["total"], "40.00");
        assert_eq!(json["lines"][0]["line_total"], "40.00");
        assert!(json["coupon"].is_null());
    }

    #[test]
    fn applied_coupon_rides_the_summary() {
        let summary = CartSummary {
            order_id: Uuid::new_v4(),
            lines: vec![],
            coupon: Some(AppliedCoupon {
                code: "WELCOME10".to_string(),
                amount: dec!(10.00),
            }),
            total: dec!(-10.00),
        };

        let json = serde_json::to_value(&summary).expect("serialization should succeed");
        assert_eq!(json["coupon"]["code"], "WELCOME10");
        assert_eq!(json["total"], "-10.00");
    }
}
