use std::sync::Arc;

use tracing::{info, warn};

use crate::index::SearchIndex;
use crate::substring::SubstringIndex;

/// Picks the first candidate whose probe succeeds.
///
/// Called once at startup. When every candidate fails the substring index
/// is returned, so search keeps working in degraded mode.
pub async fn select_backend(candidates: Vec<Arc<dyn SearchIndex>>) -> Arc<dyn SearchIndex> {
    for candidate in candidates {
        match candidate.probe().await {
            Ok(()) => {
                info!(backend = %candidate.backend(), "Search backend selected");
                return candidate;
            }
            Err(e) => {
                warn!(backend = %candidate.backend(), error = %e, "Search backend unavailable");
            }
        }
    }

    warn!("No ranked search backend available, using substring matching");
    Arc::new(SubstringIndex::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Backend;
    use crate::{RankedIndex, Result, SearchDocument, SearchError, SearchFilters, SearchHit};
    use async_trait::async_trait;
    use common::ProductId;

    struct DownIndex;

    #[async_trait]
    impl SearchIndex for DownIndex {
        fn backend(&self) -> Backend {
            Backend::Postgres
        }

        async fn probe(&self) -> Result<()> {
            Err(SearchError::Unavailable("no tsvector support".to_string()))
        }

        async fn reindex(&self, _doc: SearchDocument) -> Result<()> {
            Err(SearchError::Unavailable("down".to_string()))
        }

        async fn remove(&self, _product_id: ProductId) -> Result<()> {
            Err(SearchError::Unavailable("down".to_string()))
        }

        async fn query(&self, _text: &str, _filters: &SearchFilters) -> Result<Vec<SearchHit>> {
            Err(SearchError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn first_healthy_candidate_wins() {
        let candidates: Vec<Arc<dyn SearchIndex>> =
            vec![Arc::new(DownIndex), Arc::new(RankedIndex::new())];
        let selected = select_backend(candidates).await;
        assert_eq!(selected.backend(), Backend::Ranked);
    }

    #[tokio::test]
    async fn falls_back_to_substring_when_nothing_probes() {
        let selected = select_backend(vec![Arc::new(DownIndex) as Arc<dyn SearchIndex>]).await;
        assert_eq!(selected.backend(), Backend::Substring);

        let empty = select_backend(Vec::new()).await;
        assert_eq!(empty.backend(), Backend::Substring);
    }
}
