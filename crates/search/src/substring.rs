//! Degraded-mode search: case-insensitive substring match, newest first.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::document::sort_hits;
use crate::index::{Backend, SearchIndex};
use crate::{Result, SearchDocument, SearchFilters, SearchHit};

/// Lowercased haystacks kept next to the document.
struct Entry {
    doc: SearchDocument,
    haystacks: [String; 3],
}

/// Matches the query as a substring of name, description or category name.
///
/// Always available; every hit has rank zero, so results come back in
/// recency order.
#[derive(Clone, Default)]
pub struct SubstringIndex {
    entries: Arc<RwLock<HashMap<ProductId, Entry>>>,
}

impl SubstringIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchIndex for SubstringIndex {
    fn backend(&self) -> Backend {
        Backend::Substring
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
        let haystacks = [
            doc.name.to_lowercase(),
            doc.description.to_lowercase(),
            doc.category_name.to_lowercase(),
        ];
        entries.insert(doc.product_id, Entry { doc, haystacks });
        Ok(())
    }

    async fn remove(&self, product_id: ProductId) -> Result<()> {
        self.entries.write().await.remove(&product_id);
        Ok(())
    }

    async fn query(&self, text: &str, filters: &SearchFilters) -> Result<Vec<SearchHit>> {
        let needle = text.trim().to_lowercase();

        let entries = self.entries.read().await;
        let mut hits: Vec<SearchHit> = entries
            .values()
            .filter(|entry| filters.matches(&entry.doc))
            .filter(|entry| needle.is_empty() || entry.haystacks.iter().any(|h| h.contains(&needle)))
            .map(|entry| SearchHit {
                product_id: entry.doc.product_id,
                rank: 0.0,
                created_at: entry.doc.created_at,
            })
            .collect();

        sort_hits(&mut hits);
        Ok(hits)
    }
}
