use common::{CategoryId, Money};

use crate::SearchDocument;

/// Structured filters applied alongside the text query.
///
/// Price bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub available: Option<bool>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    /// True if the document passes every filter that is set.
    pub fn matches(&self, doc: &SearchDocument) -> bool {
        self.accepts(doc.category_id, doc.price, doc.available)
    }

    /// Applies the filters to raw field values.
    pub fn accepts(&self, category_id: CategoryId, price: Money, available: bool) -> bool {
        if let Some(category) = self.category_id
            && category != category_id
        {
            return false;
        }
        if let Some(min) = self.min_price
            && price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && price > max
        {
            return false;
        }
        if let Some(wanted) = self.available
            && wanted != available
        {
            return false;
        }
        true
    }
}
