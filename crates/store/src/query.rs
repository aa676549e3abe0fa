use common::{CategoryId, OrderStatus, ProductId, UserId};

/// Builder for product listings.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Filter by owning seller.
    pub seller_id: Option<UserId>,

    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Filter by derived availability.
    pub available: Option<bool>,

    /// Maximum number of products to return.
    pub limit: Option<usize>,

    /// Number of products to skip.
    pub offset: Option<usize>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Builder for order listings.
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Orders where this user is either the buyer or the seller.
    pub participant: Option<UserId>,

    pub buyer_id: Option<UserId>,

    pub seller_id: Option<UserId>,

    pub product_id: Option<ProductId>,

    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for every order a user takes part in.
    pub fn for_participant(user_id: UserId) -> Self {
        Self {
            participant: Some(user_id),
            ..Default::default()
        }
    }

    pub fn buyer(mut self, buyer_id: UserId) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn seller(mut self, seller_id: UserId) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Transforms the items, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_query_builder() {
        let seller = UserId::new();
        let query = ProductQuery::new()
            .seller(seller)
            .available(true)
            .limit(20)
            .offset(40);
        assert_eq!(query.seller_id, Some(seller));
        assert_eq!(query.available, Some(true));
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(40));
        assert!(query.category_id.is_none());
    }

    #[test]
    fn order_query_for_participant() {
        let user = UserId::new();
        let query = OrderQuery::for_participant(user).status(OrderStatus::Pending);
        assert_eq!(query.participant, Some(user));
        assert_eq!(query.status, Some(OrderStatus::Pending));
    }

    #[test]
    fn page_map_keeps_total() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 10,
        };
        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 10);
    }
}
