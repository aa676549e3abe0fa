//! Domain layer for the marketplace.
//!
//! This crate provides the services that keep orders and inventory
//! consistent:
//! - Catalog service for categories, products, slugs and views
//! - Inventory ledger reserving and releasing stock under a row lock
//! - Order state machine with placement, transitions and the read side
//! - Notification sink with fire-and-forget delivery
//! - Product search over a pluggable index

pub mod catalog;
pub mod config;
pub mod delivery;
pub mod error;
pub mod inventory;
pub mod marketplace;
pub mod notification;
pub mod order;
pub mod paging;
pub mod principal;
pub mod product_search;
pub mod search_sync;
pub mod slug;

pub use catalog::{CatalogService, NewProduct, ProductChanges, ProductFilter};
pub use config::MarketplaceConfig;
pub use delivery::{
    DeliveryDispatcher, DeliveryError, InMemoryDelivery, LogDelivery, NotificationDelivery,
};
pub use error::{DomainError, ErrorKind, Rejection, Result};
pub use inventory::InventoryLedger;
pub use marketplace::Marketplace;
pub use notification::NotificationSink;
pub use order::{OrderRole, OrderService};
pub use paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, Paged};
pub use principal::Principal;
pub use product_search::{ProductSearch, SearchRequest};
pub use search_sync::SearchSync;
