use crate::{
    entities::{order, refund, Order},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Refund request intake.
///
/// This is a durable log, not a workflow: requests are recorded with
/// `accepted = false` and nothing in this service ever flips the flag.
#[derive(Clone)]
pub struct RefundService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl RefundService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Files a refund request against the order named by its reference code.
    ///
    /// Marks the order `refund_requested` and appends a refund record. The
    /// order is located by reference code alone; whether it is finalized is
    /// not checked.
    ///
    /// # Returns
    ///
    /// * `Ok(RefundReceipt)` - Request recorded
    /// * `Err(ServiceError::NotFound)` - No order carries this code
    #[instrument(skip(self, input))]
    pub async fn request_refund(&self, input: RefundInput) -> Result<RefundReceipt, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find()
            .filter(order::Column::ReferenceCode.eq(input.reference_code.trim()))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("This order does not exist".to_string()))?;

        let order_id = order.id;
        let mut order: order::ActiveModel = order.into();
        order.refund_requested = Set(true);
        order.updated_at = Set(Some(Utc::now()));
        order.update(&txn).await?;

        let refund = refund::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            email: Set(input.email.trim().to_string()),
            reason: Set(input.reason),
            accepted: Set(false),
            created_at: Set(Utc::now()),
        };
        let refund = refund.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::RefundRequested {
                order_id,
                refund_id: refund.id,
            })
            .await;

        info!("Refund requested for order {}", order_id);
        Ok(RefundReceipt {
            order_id,
            refund_id: refund.id,
        })
    }
}

/// Refund request payload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefundInput {
    #[validate(length(min = 1))]
    #[schema(example = "x1k3j4h5g6f7d8s9a0q1")]
    pub reference_code: String,
    #[validate(length(min = 1))]
    #[schema(example = "Arrived damaged")]
    pub reason: String,
    #[validate(email)]
    #[schema(example = "jo@example.com")]
    pub email: String,
}

/// Acknowledgement of a recorded refund request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefundReceipt {
    pub order_id: Uuid,
    pub refund_id: Uuid,
}
