use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

// Define the various events that can occur in the checkout workflow.
// Emitted after the owning transaction commits, never before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    OrderCreated(Uuid),
    CartItemAdded {
        order_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    CartItemQuantityChanged {
        order_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    CartItemRemoved {
        order_id: Uuid,
        item_id: Uuid,
    },

    // Checkout events
    CouponApplied {
        order_id: Uuid,
        coupon_id: Uuid,
    },
    BillingAddressAttached {
        order_id: Uuid,
        billing_address_id: Uuid,
    },

    // Payment events
    PaymentCaptured {
        order_id: Uuid,
        payment_id: Uuid,
    },
    PaymentFailed {
        order_id: Uuid,
        kind: String,
    },
    OrderFinalized {
        order_id: Uuid,
        reference_code: String,
    },

    // Refund events
    RefundRequested {
        order_id: Uuid,
        refund_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging the failure instead of surfacing it.
    /// Used after a commit, where the mutation must not be reported as
    /// failed just because the event channel is down.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

// Function to process incoming events. Today every handler is a structured
// log line; notification fan-out would hang off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "Cart opened");
            }
            Event::CartItemAdded {
                order_id,
                item_id,
                quantity,
            } => {
                info!(%order_id, %item_id, quantity, "Cart item added");
            }
            Event::CartItemQuantityChanged {
                order_id,
                item_id,
                quantity,
            } => {
                info!(%order_id, %item_id, quantity, "Cart item quantity changed");
            }
            Event::CartItemRemoved { order_id, item_id } => {
                info!(%order_id, %item_id, "Cart item removed");
            }
            Event::CouponApplied {
                order_id,
                coupon_id,
            } => {
                info!(%order_id, %coupon_id, "Coupon applied");
            }
            Event::BillingAddressAttached {
                order_id,
                billing_address_id,
            } => {
                info!(%order_id, %billing_address_id, "Billing address attached");
            }
            Event::PaymentCaptured {
                order_id,
                payment_id,
            } => {
                info!(%order_id, %payment_id, "Payment captured");
            }
            Event::PaymentFailed { order_id, kind } => {
                warn!(%order_id, kind, "Payment attempt failed");
            }
            Event::OrderFinalized {
                order_id,
                reference_code,
            } => {
                info!(%order_id, reference_code, "Order finalized");
            }
            Event::RefundRequested {
                order_id,
                refund_id,
            } => {
                info!(%order_id, %refund_id, "Refund requested");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(got)) => assert_eq!(got, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out
        sender.send_or_log(Event::OrderCreated(Uuid::new_v4())).await;
    }
}
