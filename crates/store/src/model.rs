//! Persistent records.

use chrono::{DateTime, Utc};
use common::{
    CategoryId, Money, NotificationId, NotificationKind, OrderId, OrderStatus, ProductId,
    Quantity, Role, Unit, UserId,
};
use serde::{Deserialize, Serialize};

/// Identity record for a buyer or seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A shared product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A listed product, owned by exactly one seller.
///
/// Availability is never stored directly: it is derived from two independent
/// reasons a product can be off sale (stock ran out, or the seller disabled
/// it). Restoring stock therefore never overrides a seller's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub stock: Quantity,
    pub unit: Unit,
    pub seller_disabled: bool,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// True when stock has reached zero.
    pub fn is_stock_exhausted(&self) -> bool {
        self.stock.is_zero()
    }

    /// Externally visible availability.
    pub fn is_available(&self) -> bool {
        !self.seller_disabled && !self.is_stock_exhausted()
    }
}

/// An order for a quantity of one product.
///
/// `seller_id` and `total_price` are snapshots taken at creation; they do not
/// follow later changes to the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only user-facing event. Only `is_read` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: Option<OrderId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Append-only analytics entry written each time a product page is viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
    pub viewed_at: DateTime<Utc>,
}

/// What a category deletion took with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRemoval {
    pub removed_products: Vec<ProductId>,
    pub removed_orders: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: Quantity, seller_disabled: bool) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            seller_id: UserId::new(),
            category_id: CategoryId::new(),
            name: "Fresh Corn".to_string(),
            slug: "fresh-corn".to_string(),
            description: "Sweet corn".to_string(),
            price: Money::from_cents(250),
            stock,
            unit: Unit::Kilograms,
            seller_disabled,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn availability_combines_both_reasons() {
        assert!(product(Quantity::from_units(1), false).is_available());
        assert!(!product(Quantity::zero(), false).is_available());
        assert!(!product(Quantity::from_units(1), true).is_available());
        assert!(!product(Quantity::zero(), true).is_available());
    }
}
