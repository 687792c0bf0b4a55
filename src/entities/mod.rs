pub mod active_order;
pub mod billing_address;
pub mod coupon;
pub mod item;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod refund;

// Re-export entities
pub use active_order::{Entity as ActiveOrder, Model as ActiveOrderModel};
pub use billing_address::{Entity as BillingAddress, Model as BillingAddressModel};
pub use coupon::{Entity as Coupon, Model as CouponModel};
pub use item::{Entity as Item, Model as ItemModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment::{Entity as Payment, Model as PaymentModel};
pub use refund::{Entity as Refund, Model as RefundModel};
