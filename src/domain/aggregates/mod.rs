//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartLine};
pub use coupon::{Coupon, CouponChanges};
pub use order::{Order, OrderError, OrderStatus, OrderStatusPolicy, PaymentMethod, ShippingAddress, StatusChange};
pub use product::{Product, ProductError, StockAdjustment};
