use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use common::ProductId;

use crate::{Result, SearchDocument, SearchFilters, SearchHit};

/// Which implementation is serving queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Weighted inverted index kept in process.
    Ranked,
    /// Native PostgreSQL full-text ranking.
    Postgres,
    /// Case-insensitive substring match, recency order only.
    Substring,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ranked => "ranked",
            Backend::Postgres => "postgres",
            Backend::Substring => "substring",
        }
    }

    /// True for backends that order by text relevance.
    pub fn is_ranked(&self) -> bool {
        !matches!(self, Backend::Substring)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ranked" => Ok(Backend::Ranked),
            "postgres" => Ok(Backend::Postgres),
            "substring" => Ok(Backend::Substring),
            other => Err(format!("unknown search backend: {other}")),
        }
    }
}

/// A queryable product index.
///
/// All backends return the same hit shape so callers never branch on which
/// one is active.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    fn backend(&self) -> Backend;

    /// Checks that the backend can serve queries.
    async fn probe(&self) -> Result<()>;

    /// Inserts or replaces a product's entry.
    async fn reindex(&self, doc: SearchDocument) -> Result<()>;

    /// Drops a product's entry. Unknown ids are ignored.
    async fn remove(&self, product_id: ProductId) -> Result<()>;

    /// Runs a query.
    ///
    /// Blank text matches every document that passes the filters, ordered
    /// by recency.
    async fn query(&self, text: &str, filters: &SearchFilters) -> Result<Vec<SearchHit>>;
}
