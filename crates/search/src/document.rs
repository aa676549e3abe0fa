//! What the index knows about a product.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId};
use store::{Category, Product};

/// Indexed projection of a product.
///
/// Text fields carry the three rank weights: name highest, description
/// medium, category name lowest.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDocument {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub price: Money,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    /// Version of the product row this document was built from.
    pub updated_at: DateTime<Utc>,
}

impl SearchDocument {
    pub fn new(product: &Product, category: &Category) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category_id: category.id,
            category_name: category.name.clone(),
            price: product.price,
            available: product.is_available(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }

    /// False when `self` was built from an older product version than
    /// `current`; such a document must not replace it.
    pub fn supersedes(&self, current: &SearchDocument) -> bool {
        self.updated_at >= current.updated_at
    }
}

/// One ranked match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub product_id: ProductId,
    pub rank: f32,
    pub created_at: DateTime<Utc>,
}

/// Sorts hits by relevance descending, then recency descending.
pub(crate) fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.rank
            .total_cmp(&a.rank)
            .then(b.created_at.cmp(&a.created_at))
            .then(b.product_id.cmp(&a.product_id))
    });
}
