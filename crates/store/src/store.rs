use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, NotificationId, OrderId, OrderStatus, ProductId, UserId};

use crate::{
    Category, CategoryRemoval, Notification, Order, OrderQuery, Page, Product, ProductQuery,
    ProductView, Result, User,
};

/// Core trait for marketplace storage.
///
/// Single-row reads and writes are exposed directly. Anything that must read
/// and then write consistently goes through [`MarketStore::begin`].
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Starts a unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Stores a user identity record.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Stores a category. Fails with a unique violation on duplicate name or slug.
    async fn insert_category(&self, category: &Category) -> Result<()>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Lists categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Deletes a category and, in the same transaction, every product in it
    /// together with those products' orders and views.
    ///
    /// Returns `None` if the category does not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<Option<CategoryRemoval>>;

    /// Inserts a product.
    ///
    /// Slug uniqueness and (seller, category, name) uniqueness are checked
    /// atomically with the insert, so two concurrent inserts can never both
    /// claim the same slug.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// Fetches several products at once. Missing ids are skipped; the result
    /// order is unspecified.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Lists products newest first.
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>>;

    /// Appends a view entry and increments the product's view counter in one
    /// atomic step. Returns the updated product, or `None` if it is gone.
    async fn record_view(&self, view: &ProductView) -> Result<Option<Product>>;

    async fn count_views(&self, product_id: ProductId) -> Result<u64>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders newest first.
    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>>;

    /// Appends a notification outside any unit of work.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Lists a recipient's notifications, newest first.
    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>>;

    /// Flips the read flag. Returns false if no such notification belongs to
    /// the recipient.
    async fn mark_notification_read(&self, id: NotificationId, recipient: UserId)
    -> Result<bool>;

    /// Marks all of a recipient's notifications read, returning how many changed.
    async fn mark_all_notifications_read(&self, recipient: UserId) -> Result<u64>;
}

/// An explicit transaction.
///
/// Locks acquired through `lock_*` are held until [`UnitOfWork::commit`]
/// returns or the unit of work is dropped. Dropping without committing rolls
/// back every write made through it, on every exit path.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Locks a single product row, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` if the product does not exist and
    /// [`StoreError::LockTimeout`](crate::StoreError::LockTimeout) if the wait
    /// expires. Unrelated products are never blocked.
    async fn lock_product(&mut self, id: ProductId, wait: Duration) -> Result<Option<Product>>;

    /// Writes the mutable fields of a product previously locked in this unit.
    async fn update_product(&mut self, product: &Product) -> Result<()>;

    /// True if the buyer has a pending or confirmed order on the product.
    async fn has_active_order(&mut self, buyer: UserId, product: ProductId) -> Result<bool>;

    /// Locks a single order row, waiting at most `wait`.
    async fn lock_order(&mut self, id: OrderId, wait: Duration) -> Result<Option<Order>>;

    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Changes the status of an order previously locked in this unit.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_notification(&mut self, notification: &Notification) -> Result<()>;

    /// Makes every write visible atomically and releases all locks.
    async fn commit(self: Box<Self>) -> Result<()>;
}
