use crate::{
    entities::{order, order_item, payment, ActiveOrder, OrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::PaymentGateway,
    services::cart::{build_cart_summary, require_active_order},
    services::checkout::PaymentRoute,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const REFERENCE_CODE_LEN: usize = 20;

/// Charges open orders and finalizes them.
///
/// The gateway call happens outside any transaction; the finalization writes
/// (payment record, `ordered` flags, reference code, active-order release)
/// happen in one transaction only after the gateway reports success. A
/// gateway failure therefore leaves the order exactly as it was.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            currency,
        }
    }

    /// Charges the caller's open order through the configured gateway.
    ///
    /// Requires a billing address on the order; the check runs before any
    /// gateway traffic. Both payment routes resolve to the same charge
    /// operation.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The authenticated caller
    /// * `route` - Which provider segment the client called
    /// * `source_token` - Opaque client-side payment token
    ///
    /// # Returns
    ///
    /// * `Ok(PaymentReceipt)` - The order is finalized and carries its
    ///   reference code
    /// * `Err(ServiceError::NoActiveOrder)` - No cart is open
    /// * `Err(ServiceError::BillingAddressMissing)` - Checkout was skipped
    /// * `Err(ServiceError::Gateway)` - Classified gateway failure; the
    ///   order is untouched
    #[instrument(skip(self, source_token))]
    pub async fn charge(
        &self,
        user_id: Uuid,
        route: PaymentRoute,
        source_token: &str,
    ) -> Result<PaymentReceipt, ServiceError> {
        let order = require_active_order(&*self.db, user_id).await?;
        if order.billing_address_id.is_none() {
            return Err(ServiceError::BillingAddressMissing);
        }

        let summary = build_cart_summary(&*self.db, &order).await?;
        let amount_minor = to_minor_units(summary.total)?;

        let charge = match self
            .gateway
            .charge(amount_minor, &self.currency, source_token)
            .await
        {
            Ok(charge) => charge,
            Err(err) => {
                warn!(
                    "Charge failed for order {} via {}: {}",
                    order.id,
                    route.as_str(),
                    err
                );
                self.event_sender
                    .send_or_log(Event::PaymentFailed {
                        order_id: order.id,
                        kind: err.kind().to_string(),
                    })
                    .await;
                return Err(err.into());
            }
        };

        let reference_code = generate_reference_code();

        let txn = self.db.begin().await?;

        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            charge_id: Set(charge.charge_id),
            user_id: Set(user_id),
            amount: Set(summary.total),
            created_at: Set(Utc::now()),
        };
        let payment = payment.insert(&txn).await?;

        let lines = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await?;
        for line in lines {
            let mut line: order_item::ActiveModel = line.into();
            line.ordered = Set(true);
            line.updated_at = Set(Some(Utc::now()));
            line.update(&txn).await?;
        }

        let order_id = order.id;
        let mut order: order::ActiveModel = order.into();
        order.ordered = Set(true);
        order.payment_id = Set(Some(payment.id));
        order.reference_code = Set(Some(reference_code.clone()));
        order.updated_at = Set(Some(Utc::now()));
        order.update(&txn).await?;

        ActiveOrder::delete_by_id(user_id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentCaptured {
                order_id,
                payment_id: payment.id,
            })
            .await;
        self.event_sender
            .send_or_log(Event::OrderFinalized {
                order_id,
                reference_code: reference_code.clone(),
            })
            .await;

        info!(
            "Captured {} {} for order {} via {}",
            summary.total,
            self.currency,
            order_id,
            route.as_str()
        );
        Ok(PaymentReceipt {
            order_id,
            payment_id: payment.id,
            reference_code,
            amount: summary.total,
        })
    }
}

/// Converts a major-unit decimal amount to the gateway's integer minor units.
fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InternalError(format!("order total {} overflows minor units", amount))
        })
}

/// 20 random characters, lowercase alphanumeric.
fn generate_reference_code() -> String {
    let code: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_CODE_LEN)
        .map(char::from)
        .collect();
    code.to_lowercase()
}

/// Outcome of a successful charge.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentReceipt {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    #[schema(example = "x1k3j4h5g6f7d8s9a0q1")]
    pub reference_code: String,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_are_cents() {
        assert_eq!(to_minor_units(dec!(50.00)).unwrap(), 5000);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(-10.00)).unwrap(), -1000);
    }

    #[test]
    fn minor_units_round_fractional_cents() {
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(10.006)).unwrap(), 1001);
    }

    #[test]
    fn minor_units_reject_amounts_beyond_i64() {
        let huge = dec!(100000000000000000000);
        assert!(to_minor_units(huge).is_err());
    }

    #[test]
    fn reference_codes_are_twenty_lowercase_alphanumerics() {
        let code = generate_reference_code();
        assert_eq!(code.len(), REFERENCE_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn reference_codes_do_not_repeat() {
        assert_ne!(generate_reference_code(), generate_reference_code());
    }
}
