use async_trait::async_trait;
use common::ProductId;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::index::{Backend, SearchIndex};
use crate::{Result, SearchDocument, SearchError, SearchFilters, SearchHit};

/// Native PostgreSQL full-text search over the `products.search_vector`
/// column.
///
/// The vector is built with `setweight` so name terms rank as `A`,
/// description terms as `B` and category name terms as `C`.
#[derive(Clone)]
pub struct PostgresSearchIndex {
    pool: PgPool,
}

impl PostgresSearchIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchIndex for PostgresSearchIndex {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn probe(&self) -> Result<()> {
        sqlx::query(
            "SELECT COUNT(*) FROM products WHERE search_vector @@ plainto_tsquery('english', 'probe')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SearchError::Unavailable(e.to_string()))?;
        Ok(())
    }

    /// Rebuilds the vector from the committed row, so a document built from
    /// an older read can never roll the entry back.
    async fn reindex(&self, doc: SearchDocument) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products p
            SET search_vector = setweight(to_tsvector('english', p.name), 'A')
                             || setweight(to_tsvector('english', p.description), 'B')
                             || setweight(to_tsvector('english', c.name), 'C')
            FROM categories c
            WHERE c.id = p.category_id AND p.id = $1
            "#,
        )
        .bind(doc.product_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, product_id: ProductId) -> Result<()> {
        sqlx::query("UPDATE products SET search_vector = NULL WHERE id = $1")
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, text: &str, filters: &SearchFilters) -> Result<Vec<SearchHit>> {
        let text = text.trim();
        let mut param_count = 0;

        let mut sql = if text.is_empty() {
            String::from("SELECT id, created_at, 0::real AS rank FROM products WHERE 1=1")
        } else {
            param_count += 1;
            String::from(
                "SELECT id, created_at, ts_rank(search_vector, plainto_tsquery('english', $1)) AS rank \
                 FROM products WHERE search_vector @@ plainto_tsquery('english', $1)",
            )
        };

        if filters.category_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if filters.min_price.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND price_cents >= ${param_count}"));
        }
        if filters.max_price.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND price_cents <= ${param_count}"));
        }
        if filters.available.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND is_available = ${param_count}"));
        }
        sql.push_str(" ORDER BY rank DESC, created_at DESC, id DESC");

        let mut q = sqlx::query(&sql);
        if !text.is_empty() {
            q = q.bind(text);
        }
        if let Some(category_id) = filters.category_id {
            q = q.bind(category_id.as_uuid());
        }
        if let Some(min) = filters.min_price {
            q = q.bind(min.cents());
        }
        if let Some(max) = filters.max_price {
            q = q.bind(max.cents());
        }
        if let Some(available) = filters.available {
            q = q.bind(available);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> Result<SearchHit> {
                Ok(SearchHit {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    rank: row.try_get("rank")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
