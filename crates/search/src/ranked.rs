//! In-process weighted inverted index.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::document::sort_hits;
use crate::index::{Backend, SearchIndex};
use crate::tokenize::terms;
use crate::{Result, SearchDocument, SearchFilters, SearchHit};

/// Weight of a term found in the product name.
pub const NAME_WEIGHT: f32 = 1.0;
/// Weight of a term found in the description.
pub const DESCRIPTION_WEIGHT: f32 = 0.4;
/// Weight of a term found in the category name.
pub const CATEGORY_WEIGHT: f32 = 0.2;

struct Entry {
    doc: SearchDocument,
    weights: HashMap<String, f32>,
}

impl Entry {
    fn new(doc: SearchDocument) -> Self {
        let mut weights: HashMap<String, f32> = HashMap::new();
        for (text, weight) in [
            (&doc.name, NAME_WEIGHT),
            (&doc.description, DESCRIPTION_WEIGHT),
            (&doc.category_name, CATEGORY_WEIGHT),
        ] {
            for term in terms(text) {
                *weights.entry(term).or_default() += weight;
            }
        }
        Self { doc, weights }
    }

    /// Sum of weights over the query terms; `None` unless every term occurs.
    fn score(&self, wanted: &[String]) -> Option<f32> {
        wanted
            .iter()
            .map(|term| self.weights.get(term).copied())
            .sum()
    }
}

/// Ranks products by weighted term frequency: name terms count most,
/// then description, then category name.
///
/// Every query term must occur somewhere in the document for it to match.
#[derive(Clone, Default)]
pub struct RankedIndex {
    entries: Arc<RwLock<HashMap<ProductId, Entry>>>,
}

impl RankedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed products.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SearchIndex for RankedIndex {
    fn backend(&self) -> Backend {
        Backend::Ranked
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    async fn reindex(&self, doc: SearchDocument) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(current) = entries.get(&doc.product_id)
            && !doc.supersedes(&current.doc)
        {
            return Ok(());
        }
        entries.insert(doc.product_id, Entry::new(doc));
        Ok(())
    }

    async fn remove(&self, product_id: ProductId) -> Result<()> {
        self.entries.write().await.remove(&product_id);
        Ok(())
    }

    async fn query(&self, text: &str, filters: &SearchFilters) -> Result<Vec<SearchHit>> {
        let mut wanted = terms(text);
        wanted.sort();
        wanted.dedup();

        let entries = self.entries.read().await;
        let mut hits: Vec<SearchHit> = entries
            .values()
            .filter(|entry| filters.matches(&entry.doc))
            .filter_map(|entry| {
                let rank = if wanted.is_empty() {
                    0.0
                } else {
                    entry.score(&wanted)?
                };
                Some(SearchHit {
                    product_id: entry.doc.product_id,
                    rank,
                    created_at: entry.doc.created_at,
                })
            })
            .collect();

        sort_hits(&mut hits);
        Ok(hits)
    }
}
