//! Transactional persistence for the marketplace.
//!
//! The [`MarketStore`] trait is the port the domain talks to. Multi-step
//! writes go through a [`UnitOfWork`]: row locks taken inside it are held
//! until it is committed or dropped, and dropping without commit discards
//! every staged write.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Constraint, Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use model::{Category, CategoryRemoval, Notification, Order, Product, ProductView, User};
pub use postgres::PostgresMarketStore;
pub use query::{OrderQuery, Page, ProductQuery};
pub use store::{MarketStore, UnitOfWork};
