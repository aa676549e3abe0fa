use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, NotificationId, OrderId, OrderStatus, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Category, CategoryRemoval, Constraint, Notification, Order, OrderQuery, Page, Product,
    ProductQuery, ProductView, Result, StoreError, User,
    store::{MarketStore, UnitOfWork},
};

/// Per-row exclusive locks, created lazily on first use and dropped again
/// once nobody holds or waits on them.
type RowLocks<K> = Arc<SyncMutex<HashMap<K, Arc<Mutex<()>>>>>;

async fn acquire_row<K>(
    locks: &RowLocks<K>,
    key: K,
    wait: Duration,
    entity: &'static str,
) -> Result<OwnedMutexGuard<()>>
where
    K: Eq + Hash + Copy + std::fmt::Display,
{
    let row = locks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_default()
        .clone();
    let acquired = tokio::time::timeout(wait, row.lock_owned()).await;
    match acquired {
        Ok(guard) => Ok(guard),
        Err(_) => {
            prune_idle(locks, [key]);
            Err(StoreError::LockTimeout {
                entity,
                id: key.to_string(),
            })
        }
    }
}

/// Forgets the given rows unless someone still holds or awaits them.
///
/// Every holder and waiter owns a clone of the row's `Arc`, and clones are
/// only taken under the map lock, so a count of one means idle.
fn prune_idle<K: Eq + Hash>(locks: &RowLocks<K>, keys: impl IntoIterator<Item = K>) {
    let mut rows = locks.lock().unwrap_or_else(PoisonError::into_inner);
    for key in keys {
        if rows.get(&key).is_some_and(|row| Arc::strong_count(row) == 1) {
            rows.remove(&key);
        }
    }
}

/// Row guards held by one unit of work.
struct HeldRows<K: Eq + Hash + Copy> {
    locks: RowLocks<K>,
    guards: HashMap<K, OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Copy + std::fmt::Display> HeldRows<K> {
    fn new(locks: RowLocks<K>) -> Self {
        Self {
            locks,
            guards: HashMap::new(),
        }
    }

    fn holds(&self, key: &K) -> bool {
        self.guards.contains_key(key)
    }

    /// Re-entrant: a row already held is not locked twice.
    async fn acquire(&mut self, key: K, wait: Duration, entity: &'static str) -> Result<()> {
        if !self.holds(&key) {
            let guard = acquire_row(&self.locks, key, wait, entity).await?;
            self.guards.insert(key, guard);
        }
        Ok(())
    }
}

impl<K: Eq + Hash + Copy> Drop for HeldRows<K> {
    fn drop(&mut self) {
        let keys: Vec<K> = self.guards.drain().map(|(key, _guard)| key).collect();
        prune_idle(&self.locks, keys);
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    notifications: Vec<Notification>,
    views: Vec<ProductView>,
}

impl MemoryState {
    fn check_product_unique(&self, product: &Product) -> Result<()> {
        for other in self.products.values().filter(|p| p.id != product.id) {
            if other.slug == product.slug {
                return Err(StoreError::UniqueViolation(Constraint::ProductSlug));
            }
            if other.seller_id == product.seller_id
                && other.category_id == product.category_id
                && other.name == product.name
            {
                return Err(StoreError::UniqueViolation(Constraint::ProductName));
            }
        }
        Ok(())
    }

    fn has_active_order(&self, buyer: UserId, product: ProductId) -> bool {
        self.orders
            .values()
            .any(|o| o.buyer_id == buyer && o.product_id == product && o.status.is_active())
    }
}

/// In-memory store implementation for tests and single-process deployments.
///
/// Row locks are per-key async mutexes acquired with a bounded wait. Writes
/// made through a unit of work are staged and applied under a single write
/// lock on commit, so readers never observe a half-applied transaction.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<MemoryState>>,
    product_locks: RowLocks<ProductId>,
    order_locks: RowLocks<OrderId>,
}

impl InMemoryMarketStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of products stored.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns how many row locks are currently tracked.
    pub fn row_lock_count(&self) -> usize {
        let products = self
            .product_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let orders = self
            .order_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        products + orders
    }

    /// Returns the total number of notifications stored.
    pub async fn notification_count(&self) -> usize {
        self.state.read().await.notifications.len()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(MemoryUnitOfWork {
            state: self.state.clone(),
            held_products: HeldRows::new(self.product_locks.clone()),
            held_orders: HeldRows::new(self.order_locks.clone()),
            staged_products: HashMap::new(),
            staged_orders: Vec::new(),
            staged_statuses: HashMap::new(),
            staged_notifications: Vec::new(),
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(Constraint::Username));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        for other in state.categories.values() {
            if other.name == category.name {
                return Err(StoreError::UniqueViolation(Constraint::CategoryName));
            }
            if other.slug == category.slug {
                return Err(StoreError::UniqueViolation(Constraint::CategorySlug));
            }
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Option<CategoryRemoval>> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Ok(None);
        }

        let removed_products: Vec<ProductId> = state
            .products
            .values()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        let doomed: HashSet<ProductId> = removed_products.iter().copied().collect();

        state.products.retain(|pid, _| !doomed.contains(pid));
        let orders_before = state.orders.len();
        state.orders.retain(|_, o| !doomed.contains(&o.product_id));
        let removed_orders = (orders_before - state.orders.len()) as u64;
        state.views.retain(|v| !doomed.contains(&v.product_id));

        Ok(Some(CategoryRemoval {
            removed_products,
            removed_orders,
        }))
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&product.category_id) {
            return Err(StoreError::MissingReference("category"));
        }
        if !state.users.contains_key(&product.seller_id) {
            return Err(StoreError::MissingReference("user"));
        }
        state.check_product_unique(product)?;
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| {
                if let Some(seller) = query.seller_id
                    && p.seller_id != seller
                {
                    return false;
                }
                if let Some(category) = query.category_id
                    && p.category_id != category
                {
                    return false;
                }
                if let Some(available) = query.available
                    && p.is_available() != available
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = products.len() as u64;

        let offset = query.offset.unwrap_or(0);
        let items = products
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(Page { items, total })
    }

    async fn record_view(&self, view: &ProductView) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        let Some(product) = state.products.get_mut(&view.product_id) else {
            return Ok(None);
        };
        product.views += 1;
        let updated = product.clone();
        state.views.push(view.clone());
        Ok(Some(updated))
    }

    async fn count_views(&self, product_id: ProductId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .views
            .iter()
            .filter(|v| v.product_id == product_id)
            .count() as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| {
                if let Some(user) = query.participant
                    && o.buyer_id != user
                    && o.seller_id != user
                {
                    return false;
                }
                if let Some(buyer) = query.buyer_id
                    && o.buyer_id != buyer
                {
                    return false;
                }
                if let Some(seller) = query.seller_id
                    && o.seller_id != seller
                {
                    return false;
                }
                if let Some(product) = query.product_id
                    && o.product_id != product
                {
                    return false;
                }
                if let Some(status) = query.status
                    && o.status != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&notification.recipient_id) {
            return Err(StoreError::MissingReference("user"));
        }
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        // Newest first; insertion order breaks timestamp ties.
        let mut notifications: Vec<_> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, recipient: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient && !n.is_read)
        {
            notification.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

/// Unit of work over [`InMemoryMarketStore`].
///
/// Holds row guards until it is committed or dropped; staged writes are
/// discarded on drop.
pub struct MemoryUnitOfWork {
    state: Arc<RwLock<MemoryState>>,
    held_products: HeldRows<ProductId>,
    held_orders: HeldRows<OrderId>,
    staged_products: HashMap<ProductId, Product>,
    staged_orders: Vec<Order>,
    staged_statuses: HashMap<OrderId, (OrderStatus, DateTime<Utc>)>,
    staged_notifications: Vec<Notification>,
}

impl MemoryUnitOfWork {
    fn effective_status(&self, order: &Order) -> OrderStatus {
        self.staged_statuses
            .get(&order.id)
            .map(|(status, _)| *status)
            .unwrap_or(order.status)
    }

    fn with_staged_status(&self, mut order: Order) -> Order {
        if let Some((status, at)) = self.staged_statuses.get(&order.id) {
            order.status = *status;
            order.updated_at = *at;
        }
        order
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_product(&mut self, id: ProductId, wait: Duration) -> Result<Option<Product>> {
        self.held_products.acquire(id, wait, "product").await?;
        if let Some(staged) = self.staged_products.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn update_product(&mut self, product: &Product) -> Result<()> {
        if !self.held_products.holds(&product.id) {
            return Err(StoreError::LockNotHeld {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        self.staged_products.insert(product.id, product.clone());
        Ok(())
    }

    async fn has_active_order(&mut self, buyer: UserId, product: ProductId) -> Result<bool> {
        let staged = self.staged_orders.iter().any(|o| {
            o.buyer_id == buyer && o.product_id == product && self.effective_status(o).is_active()
        });
        if staged {
            return Ok(true);
        }
        let state = self.state.read().await;
        Ok(state.orders.values().any(|o| {
            o.buyer_id == buyer && o.product_id == product && self.effective_status(o).is_active()
        }))
    }

    async fn lock_order(&mut self, id: OrderId, wait: Duration) -> Result<Option<Order>> {
        if let Some(order) = self.staged_orders.iter().find(|o| o.id == id).cloned() {
            return Ok(Some(self.with_staged_status(order)));
        }
        self.held_orders.acquire(id, wait, "order").await?;
        let committed = self.state.read().await.orders.get(&id).cloned();
        Ok(committed.map(|order| self.with_staged_status(order)))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.staged_orders.push(order.clone());
        Ok(())
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let staged_new = self.staged_orders.iter().any(|o| o.id == id);
        if !staged_new && !self.held_orders.holds(&id) {
            return Err(StoreError::LockNotHeld {
                entity: "order",
                id: id.to_string(),
            });
        }
        self.staged_statuses.insert(id, (status, updated_at));
        Ok(())
    }

    async fn insert_notification(&mut self, notification: &Notification) -> Result<()> {
        self.staged_notifications.push(notification.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        let shared = Arc::clone(&this.state);
        let mut state = shared.write().await;

        // Validate everything before touching anything.
        for product in this.staged_products.values() {
            if !state.products.contains_key(&product.id) {
                return Err(StoreError::RowNotFound {
                    entity: "product",
                    id: product.id.to_string(),
                });
            }
            state.check_product_unique(product)?;
        }
        for order in &this.staged_orders {
            if !state.products.contains_key(&order.product_id) {
                return Err(StoreError::MissingReference("product"));
            }
            if !state.users.contains_key(&order.buyer_id)
                || !state.users.contains_key(&order.seller_id)
            {
                return Err(StoreError::MissingReference("user"));
            }
            if order.status.is_active() && state.has_active_order(order.buyer_id, order.product_id)
            {
                return Err(StoreError::UniqueViolation(Constraint::ActiveOrder));
            }
        }
        for id in this.staged_statuses.keys() {
            let exists =
                state.orders.contains_key(id) || this.staged_orders.iter().any(|o| o.id == *id);
            if !exists {
                return Err(StoreError::RowNotFound {
                    entity: "order",
                    id: id.to_string(),
                });
            }
        }
        for notification in &this.staged_notifications {
            if !state.users.contains_key(&notification.recipient_id) {
                return Err(StoreError::MissingReference("user"));
            }
        }

        for (id, mut product) in this.staged_products {
            // The view counter is bumped without the row lock.
            if let Some(existing) = state.products.get(&id) {
                product.views = existing.views;
            }
            state.products.insert(id, product);
        }
        for order in this.staged_orders {
            state.orders.insert(order.id, order);
        }
        for (id, (status, updated_at)) in this.staged_statuses {
            if let Some(order) = state.orders.get_mut(&id) {
                order.status = status;
                order.updated_at = updated_at;
            }
        }
        state.notifications.extend(this.staged_notifications);

        Ok(())
    }
}
