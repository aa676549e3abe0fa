//! Catalog store: categories and products.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{CategoryId, Money, ProductId, Quantity, Unit, UserId};
use store::{
    Category, CategoryRemoval, Constraint, MarketStore, Product, ProductQuery, ProductView,
    StoreError,
};
use tracing::{info, instrument};

use crate::inventory::lock_product;
use crate::paging::{PageRequest, Paged};
use crate::principal::Principal;
use crate::search_sync::SearchSync;
use crate::slug::{candidate, slugify};
use crate::{DomainError, Rejection, Result};

const MAX_NAME_LEN: usize = 200;

/// Upper bound on `-N` suffixes tried for one slug.
const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Input for a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: Quantity,
    pub unit: Unit,
}

/// Partial update of a listing; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<Quantity>,
    pub unit: Option<Unit>,
    pub seller_disabled: Option<bool>,
}

/// Listing filter for the public catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub seller_id: Option<UserId>,
    pub category_id: Option<CategoryId>,
    pub available: Option<bool>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_price(price: Money) -> Result<Money> {
    if !price.is_positive() {
        return Err(DomainError::validation("price must be greater than zero"));
    }
    Ok(price)
}

fn validate_stock(stock: Quantity) -> Result<Quantity> {
    if stock.hundredths() < 0 {
        return Err(DomainError::validation("stock must not be negative"));
    }
    Ok(stock)
}

/// Owns products and categories: slugs, per-seller name uniqueness, and
/// seller edits.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn MarketStore>,
    search: SearchSync,
    lock_timeout: Duration,
}

impl CatalogService {
    pub fn new(store: Arc<dyn MarketStore>, search: SearchSync, lock_timeout: Duration) -> Self {
        Self {
            store,
            search,
            lock_timeout,
        }
    }

    /// Creates a category; the slug is derived from the name.
    #[instrument(skip(self, description))]
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Category> {
        let name = validate_name(name)?;
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(DomainError::validation(
                "name must contain at least one letter or digit",
            ));
        }

        let category = Category {
            id: CategoryId::new(),
            name,
            slug,
            description: description.filter(|d| !d.trim().is_empty()),
            created_at: Utc::now(),
        };
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.store.get_category_by_slug(slug).await?)
    }

    /// Deletes a category together with its products, their orders and views.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<CategoryRemoval> {
        let removal = self
            .store
            .delete_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", id))?;

        info!(
            category_id = %id,
            products = removal.removed_products.len(),
            orders = removal.removed_orders,
            "Category deleted"
        );
        self.search.forget(&removal.removed_products).await;
        Ok(removal)
    }

    /// Lists a product for sale.
    ///
    /// The slug is the slugified name, suffixed `-1`, `-2`, … on collision.
    /// Each candidate is claimed by the insert itself, so two concurrent
    /// creations can never end up with the same slug.
    #[instrument(skip(self, input), fields(seller = %actor.user_id))]
    pub async fn create_product(&self, actor: Principal, input: NewProduct) -> Result<Product> {
        if !actor.is_seller() {
            return Err(Rejection::NotSeller.into());
        }
        let name = validate_name(&input.name)?;
        let price = validate_price(input.price)?;
        let stock = validate_stock(input.stock)?;

        if self.store.get_category(input.category_id).await?.is_none() {
            return Err(DomainError::not_found("category", input.category_id));
        }

        let base = match slugify(&name) {
            s if s.is_empty() => "product".to_string(),
            s => s,
        };
        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(),
            seller_id: actor.user_id,
            category_id: input.category_id,
            name,
            slug: base.clone(),
            description: input.description.trim().to_string(),
            price,
            stock,
            unit: input.unit,
            seller_disabled: false,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 0;
        loop {
            product.slug = candidate(&base, attempt);
            match self.store.insert_product(&product).await {
                Ok(()) => break,
                Err(StoreError::UniqueViolation(Constraint::ProductSlug))
                    if attempt < MAX_SLUG_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(StoreError::UniqueViolation(Constraint::ProductSlug)) => {
                    return Err(DomainError::validation("could not allocate a unique slug"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(product_id = %product.id, slug = %product.slug, "Product created");
        self.search.refresh(product.id).await;
        Ok(product)
    }

    /// Applies a seller's edits under the product row lock.
    ///
    /// The slug stays as first assigned.
    #[instrument(skip(self, actor, changes), fields(actor = %actor.user_id))]
    pub async fn update_product(
        &self,
        actor: Principal,
        product_id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product> {
        let mut uow = self.store.begin().await?;
        let mut product = lock_product(uow.as_mut(), product_id, self.lock_timeout).await?;
        if product.seller_id != actor.user_id {
            return Err(Rejection::NotProductOwner.into());
        }

        if let Some(category_id) = changes.category_id {
            if self.store.get_category(category_id).await?.is_none() {
                return Err(DomainError::not_found("category", category_id));
            }
            product.category_id = category_id;
        }
        if let Some(name) = changes.name {
            product.name = validate_name(&name)?;
        }
        if let Some(description) = changes.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = changes.price {
            product.price = validate_price(price)?;
        }
        if let Some(stock) = changes.stock {
            product.stock = validate_stock(stock)?;
        }
        if let Some(unit) = changes.unit {
            product.unit = unit;
        }
        if let Some(disabled) = changes.seller_disabled {
            product.seller_disabled = disabled;
        }
        product.updated_at = Utc::now();

        uow.update_product(&product).await?;
        uow.commit().await?;

        info!(%product_id, available = product.is_available(), "Product updated");
        self.search.refresh(product_id).await;
        Ok(product)
    }

    /// Fetches a product by slug and records the view.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str, viewer: Option<UserId>) -> Result<Product> {
        let product = self
            .store
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("product", slug))?;

        let view = ProductView {
            product_id: product.id,
            user_id: viewer,
            viewed_at: Utc::now(),
        };
        self.store
            .record_view(&view)
            .await?
            .ok_or_else(|| DomainError::not_found("product", slug))
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))
    }

    /// Lists products newest first.
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<Paged<Product>> {
        let mut query = ProductQuery::new()
            .limit(page.page_size())
            .offset(page.offset());
        query.seller_id = filter.seller_id;
        query.category_id = filter.category_id;
        query.available = filter.available;

        let result = self.store.list_products(&query).await?;
        Ok(Paged::new(result.items, result.total, page))
    }

    /// The actor's own listings, whatever their availability.
    pub async fn seller_products(
        &self,
        actor: Principal,
        page: PageRequest,
    ) -> Result<Paged<Product>> {
        let filter = ProductFilter {
            seller_id: Some(actor.user_id),
            ..Default::default()
        };
        self.list_products(filter, page).await
    }
}
