//! Shared identifiers and value types for the marketplace.

mod kinds;
mod money;
mod status;
mod types;

pub use kinds::{NotificationKind, Role, Unit};
pub use money::{AmountError, Money, Quantity};
pub use status::OrderStatus;
pub use types::{CategoryId, NotificationId, OrderId, ProductId, UserId};
