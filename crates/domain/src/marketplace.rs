//! Wiring of the marketplace services over one store and one search index.

use std::sync::Arc;

use chrono::Utc;
use common::{Role, UserId};
use search::SearchIndex;
use store::{MarketStore, User};
use tracing::info;

use crate::catalog::CatalogService;
use crate::config::MarketplaceConfig;
use crate::delivery::{DeliveryDispatcher, NotificationDelivery};
use crate::inventory::InventoryLedger;
use crate::notification::NotificationSink;
use crate::order::OrderService;
use crate::product_search::ProductSearch;
use crate::search_sync::SearchSync;
use crate::{DomainError, Result};

/// Entry point to the domain.
///
/// Cheap to clone; every service shares the same store handle.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn MarketStore>,
    catalog: CatalogService,
    ledger: InventoryLedger,
    orders: OrderService,
    notifications: NotificationSink,
    search: ProductSearch,
    search_sync: SearchSync,
}

impl Marketplace {
    pub fn new(
        store: Arc<dyn MarketStore>,
        index: Arc<dyn SearchIndex>,
        delivery: Arc<dyn NotificationDelivery>,
        config: MarketplaceConfig,
    ) -> Self {
        let search_sync = SearchSync::new(store.clone(), index.clone());
        let notifications = NotificationSink::new(store.clone(), DeliveryDispatcher::new(delivery));
        let ledger = InventoryLedger::new(store.clone(), config.lock_timeout);
        let catalog = CatalogService::new(store.clone(), search_sync.clone(), config.lock_timeout);
        let orders = OrderService::new(
            store.clone(),
            ledger.clone(),
            notifications.clone(),
            search_sync.clone(),
            config.lock_timeout,
        );
        let search = ProductSearch::new(store.clone(), index);

        Self {
            store,
            catalog,
            ledger,
            orders,
            notifications,
            search,
            search_sync,
        }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn notifications(&self) -> &NotificationSink {
        &self.notifications
    }

    pub fn search(&self) -> &ProductSearch {
        &self.search
    }

    /// Stores an identity record for a user authenticated elsewhere.
    pub async fn register_user(&self, username: &str, email: &str, role: Role) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            email: email.trim().to_string(),
            role,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, role = role.as_str(), "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    /// Indexes every stored product; returns how many were indexed.
    pub async fn rebuild_search_index(&self) -> Result<usize> {
        let indexed = self.search_sync.rebuild().await?;
        info!(indexed, backend = %self.search.backend(), "Search index rebuilt");
        Ok(indexed)
    }
}
