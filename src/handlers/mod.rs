pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod coupons;
pub mod payments;
pub mod refunds;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::{
    CartService, CatalogService, CheckoutService, CouponService, PaymentService, RefundService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub coupons: Arc<CouponService>,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentService>,
    pub refunds: Arc<RefundService>,
}

impl AppServices {
    /// Wires every service against the shared pool, event channel and gateway.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db_pool.clone()));
        let cart = Arc::new(CartService::new(db_pool.clone(), event_sender.clone()));
        let coupons = Arc::new(CouponService::new(db_pool.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(db_pool.clone(), event_sender.clone()));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            event_sender.clone(),
            gateway,
            currency,
        ));
        let refunds = Arc::new(RefundService::new(db_pool, event_sender));

        Self {
            catalog,
            cart,
            coupons,
            checkout,
            payments,
            refunds,
        }
    }
}
