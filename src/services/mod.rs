// Storefront read side
pub mod catalog;

// Cart and discount mutations
pub mod cart;
pub mod coupons;

// Order finalization pipeline
pub mod checkout;
pub mod payments;

// Post-purchase
pub mod refunds;

// Re-export services for convenience
pub use cart::{AppliedCoupon, CartLine, CartMutation, CartNotice, CartService, CartSummary};
pub use catalog::CatalogService;
pub use checkout::{CheckoutInput, CheckoutReceipt, CheckoutService, PaymentRoute};
pub use coupons::CouponService;
pub use payments::{PaymentReceipt, PaymentService};
pub use refunds::{RefundInput, RefundReceipt, RefundService};
