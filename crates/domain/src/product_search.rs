//! Product search over the selected index backend.

use std::collections::HashMap;
use std::sync::Arc;

use common::Money;
use search::{Backend, SearchFilters, SearchIndex};
use store::{MarketStore, Product};
use tracing::{debug, instrument};

use crate::paging::{PageRequest, Paged};
use crate::{DomainError, Result};

/// A search as the caller phrases it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free text; blank lists everything that passes the filters, newest first.
    pub text: String,
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub available: Option<bool>,
    pub page: PageRequest,
}

impl SearchRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Runs queries against the index and loads the matching products.
#[derive(Clone)]
pub struct ProductSearch {
    store: Arc<dyn MarketStore>,
    index: Arc<dyn SearchIndex>,
}

impl ProductSearch {
    pub fn new(store: Arc<dyn MarketStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// The backend chosen at startup.
    pub fn backend(&self) -> Backend {
        self.index.backend()
    }

    /// Returns one page of products ranked by relevance, then recency.
    ///
    /// An unknown category slug matches nothing.
    #[instrument(skip(self, request), fields(backend = %self.index.backend()))]
    pub async fn search(&self, request: SearchRequest) -> Result<Paged<Product>> {
        if let (Some(min), Some(max)) = (request.min_price, request.max_price)
            && min > max
        {
            return Err(DomainError::validation(
                "min_price must not exceed max_price",
            ));
        }

        let mut filters = SearchFilters::new();
        if let Some(slug) = request.category.as_deref() {
            match self.store.get_category_by_slug(slug).await? {
                Some(category) => filters = filters.category(category.id),
                None => return Ok(Paged::new(Vec::new(), 0, request.page)),
            }
        }
        if let Some(min) = request.min_price {
            filters = filters.min_price(min);
        }
        if let Some(max) = request.max_price {
            filters = filters.max_price(max);
        }
        if let Some(available) = request.available {
            filters = filters.available(available);
        }

        let backend = self.index.backend();
        metrics::counter!("search_queries_total", "backend" => backend.as_str()).increment(1);
        let hits = self.index.query(&request.text, &filters).await?;

        // The index may lag behind the catalog, so filters are applied again
        // to the loaded rows; hits deleted since indexing drop out here too.
        let ids: Vec<_> = hits.iter().map(|h| h.product_id).collect();
        let mut found: HashMap<_, _> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let matching: Vec<_> = ids
            .iter()
            .filter_map(|id| found.remove(id))
            .filter(|p| filters.accepts(p.category_id, p.price, p.is_available()))
            .collect();
        let total = matching.len() as u64;
        let items: Vec<_> = matching
            .into_iter()
            .skip(request.page.offset())
            .take(request.page.page_size())
            .collect();

        debug!(total, returned = items.len(), "Search completed");
        Ok(Paged::new(items, total, request.page))
    }
}
