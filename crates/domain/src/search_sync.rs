//! Keeps the search index in step with the catalog.
//!
//! Every method here is best-effort: failures are logged and counted, and
//! never undo the write that triggered them.

use std::collections::HashMap;
use std::sync::Arc;

use common::ProductId;
use search::{SearchDocument, SearchIndex};
use store::{MarketStore, ProductQuery};
use tracing::{debug, warn};

use crate::{DomainError, Result};

#[derive(Clone)]
pub struct SearchSync {
    store: Arc<dyn MarketStore>,
    index: Arc<dyn SearchIndex>,
}

impl SearchSync {
    pub fn new(store: Arc<dyn MarketStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { store, index }
    }

    /// Re-reads a product and replaces its index entry.
    pub async fn refresh(&self, product_id: ProductId) {
        if let Err(e) = self.try_refresh(product_id).await {
            metrics::counter!("search_reindex_failures_total").increment(1);
            warn!(product_id = %product_id, error = %e, "Search reindex failed");
        }
    }

    async fn try_refresh(&self, product_id: ProductId) -> Result<()> {
        let Some(product) = self.store.get_product(product_id).await? else {
            self.index.remove(product_id).await?;
            return Ok(());
        };
        let category = self
            .store
            .get_category(product.category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", product.category_id))?;

        self.index
            .reindex(SearchDocument::new(&product, &category))
            .await?;
        debug!(product_id = %product_id, "Product reindexed");
        Ok(())
    }

    /// Drops deleted products from the index.
    pub async fn forget(&self, product_ids: &[ProductId]) {
        for id in product_ids {
            if let Err(e) = self.index.remove(*id).await {
                metrics::counter!("search_reindex_failures_total").increment(1);
                warn!(product_id = %id, error = %e, "Search removal failed");
            }
        }
    }

    /// Indexes every stored product. Run at startup.
    pub async fn rebuild(&self) -> Result<usize> {
        let categories: HashMap<_, _> = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let products = self.store.list_products(&ProductQuery::new()).await?;

        let mut indexed = 0;
        for product in &products.items {
            if let Some(category) = categories.get(&product.category_id) {
                self.index
                    .reindex(SearchDocument::new(product, category))
                    .await?;
                indexed += 1;
            }
        }
        Ok(indexed)
    }
}
