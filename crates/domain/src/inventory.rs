//! Inventory ledger: stock reservation and release under a row lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{ProductId, Quantity};
use store::{MarketStore, Product, StoreError, UnitOfWork};
use tracing::{debug, instrument};

use crate::{DomainError, Rejection, Result};

/// Locks one product row, waiting at most `wait`.
///
/// Lock timeouts are counted and surface as retryable contention.
pub(crate) async fn lock_product(
    uow: &mut dyn UnitOfWork,
    product_id: ProductId,
    wait: Duration,
) -> Result<Product> {
    match uow.lock_product(product_id, wait).await {
        Ok(Some(product)) => Ok(product),
        Ok(None) => Err(DomainError::not_found("product", product_id)),
        Err(e @ StoreError::LockTimeout { .. }) => {
            metrics::counter!("stock_contention_total").increment(1);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Computes the product after reserving `quantity`.
///
/// Availability is derived from stock, so reaching zero takes the product
/// off sale in the same write.
pub fn reserve_from(
    product: &Product,
    quantity: Quantity,
    now: DateTime<Utc>,
) -> std::result::Result<Product, Rejection> {
    if !product.is_available() {
        return Err(Rejection::ProductUnavailable);
    }
    let remaining = product
        .stock
        .checked_sub(quantity)
        .ok_or(Rejection::InsufficientStock {
            requested: quantity,
            available: product.stock,
        })?;

    let mut updated = product.clone();
    updated.stock = remaining;
    updated.updated_at = now;
    Ok(updated)
}

/// Computes the product after returning `quantity` to stock.
///
/// Only the stock-exhaustion reason clears; a seller's own disable flag is
/// left alone.
pub fn release_to(product: &Product, quantity: Quantity, now: DateTime<Utc>) -> Result<Product> {
    let restored = product
        .stock
        .checked_add(quantity)
        .ok_or_else(|| DomainError::validation("stock would overflow"))?;

    let mut updated = product.clone();
    updated.stock = restored;
    updated.updated_at = now;
    Ok(updated)
}

/// Atomic stock decrement and increment tied to the order lifecycle.
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn MarketStore>,
    lock_timeout: Duration,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn MarketStore>, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    /// Reserves stock inside an existing unit of work.
    ///
    /// The row lock is held by `uow` until it commits or drops.
    pub async fn reserve_in(
        &self,
        uow: &mut dyn UnitOfWork,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Product> {
        if !quantity.is_positive() {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        let product = lock_product(uow, product_id, self.lock_timeout).await?;
        let updated = reserve_from(&product, quantity, Utc::now())?;
        uow.update_product(&updated).await?;
        debug!(%product_id, remaining = %updated.stock, "Stock reserved");
        Ok(updated)
    }

    /// Returns stock inside an existing unit of work.
    pub async fn release_in(
        &self,
        uow: &mut dyn UnitOfWork,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Product> {
        let product = lock_product(uow, product_id, self.lock_timeout).await?;
        let updated = release_to(&product, quantity, Utc::now())?;
        uow.update_product(&updated).await?;
        debug!(%product_id, restored = %updated.stock, "Stock released");
        Ok(updated)
    }

    /// Reserves stock in a transaction of its own.
    #[instrument(skip(self))]
    pub async fn reserve(&self, product_id: ProductId, quantity: Quantity) -> Result<Product> {
        let mut uow = self.store.begin().await?;
        let updated = self.reserve_in(uow.as_mut(), product_id, quantity).await?;
        uow.commit().await?;
        Ok(updated)
    }

    /// Returns stock in a transaction of its own.
    #[instrument(skip(self))]
    pub async fn release(&self, product_id: ProductId, quantity: Quantity) -> Result<Product> {
        let mut uow = self.store.begin().await?;
        let updated = self.release_in(uow.as_mut(), product_id, quantity).await?;
        uow.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CategoryId, Money, Unit, UserId};

    fn product(stock: i64, seller_disabled: bool) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(),
            seller_id: UserId::new(),
            category_id: CategoryId::new(),
            name: "Potatoes".to_string(),
            slug: "potatoes".to_string(),
            description: String::new(),
            price: Money::from_cents(120),
            stock: Quantity::from_units(stock),
            unit: Unit::Kilograms,
            seller_disabled,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reserving_everything_takes_product_off_sale() {
        let p = product(3, false);
        let after = reserve_from(&p, Quantity::from_units(3), Utc::now()).unwrap();
        assert!(after.stock.is_zero());
        assert!(!after.is_available());
    }

    #[test]
    fn reserving_more_than_stock_is_rejected() {
        let p = product(4, false);
        assert_eq!(
            reserve_from(&p, Quantity::from_units(5), Utc::now()),
            Err(Rejection::InsufficientStock {
                requested: Quantity::from_units(5),
                available: Quantity::from_units(4),
            })
        );
    }

    #[test]
    fn unavailable_products_cannot_be_reserved() {
        assert_eq!(
            reserve_from(&product(0, false), Quantity::from_units(1), Utc::now()),
            Err(Rejection::ProductUnavailable)
        );
        assert_eq!(
            reserve_from(&product(9, true), Quantity::from_units(1), Utc::now()),
            Err(Rejection::ProductUnavailable)
        );
    }

    #[test]
    fn release_restores_stock_driven_availability_only() {
        let exhausted = product(0, false);
        let restored = release_to(&exhausted, Quantity::from_units(3), Utc::now()).unwrap();
        assert!(restored.is_available());

        let disabled = product(0, true);
        let restored = release_to(&disabled, Quantity::from_units(3), Utc::now()).unwrap();
        assert_eq!(restored.stock, Quantity::from_units(3));
        assert!(!restored.is_available());
    }
}
