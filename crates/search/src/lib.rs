//! Product search.
//!
//! [`SearchIndex`] is implemented three ways: a weighted in-process index,
//! PostgreSQL full-text ranking, and a substring matcher used as degraded
//! mode. [`select_backend`] picks one at startup; callers never branch on
//! which is active.

pub mod document;
pub mod error;
pub mod index;
pub mod postgres;
pub mod query;
pub mod ranked;
pub mod select;
pub mod substring;
pub mod tokenize;

pub use document::{SearchDocument, SearchHit};
pub use error::{Result, SearchError};
pub use index::{Backend, SearchIndex};
pub use postgres::PostgresSearchIndex;
pub use query::SearchFilters;
pub use ranked::RankedIndex;
pub use select::select_backend;
pub use substring::SubstringIndex;
