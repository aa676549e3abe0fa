//! Product listing, search, creation and seller edits.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId, Quantity, Unit, UserId};
use domain::{NewProduct, ProductChanges, ProductFilter, SearchRequest};
use serde::{Deserialize, Serialize};
use store::Product;

use crate::AppState;
use crate::auth::{Actor, Viewer};
use crate::error::ApiError;
use crate::routes::{PageParams, PagedResponse, page_request, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub stock: Quantity,
    #[serde(default)]
    pub unit: Unit,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<Quantity>,
    pub unit: Option<Unit>,
    pub seller_disabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Category slug.
    pub category: Option<String>,
    pub seller: Option<UserId>,
    pub available: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub available: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub seller_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub stock: Quantity,
    pub unit: Unit,
    pub is_available: bool,
    pub seller_disabled: bool,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            is_available: p.is_available(),
            id: p.id,
            seller_id: p.seller_id,
            category_id: p.category_id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price: p.price,
            stock: p.stock,
            unit: p.unit,
            seller_disabled: p.seller_disabled,
            views: p.views,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

fn parse_price(raw: Option<&str>, field: &str) -> Result<Option<Money>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            Money::parse(s).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
        })
        .transpose()
}

// -- Handlers --

/// GET /products — newest first, filterable by category slug, seller and
/// availability.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PagedResponse<ProductResponse>>, ApiError> {
    let page = page_request(params.page, params.page_size)?;
    let catalog = state.market.catalog();

    let mut filter = ProductFilter {
        seller_id: params.seller,
        category_id: None,
        available: params.available,
    };
    if let Some(slug) = params.category.as_deref() {
        match catalog.category_by_slug(slug).await? {
            Some(category) => filter.category_id = Some(category.id),
            None => {
                let empty = domain::Paged::new(Vec::<Product>::new(), 0, page);
                return Ok(Json(PagedResponse::from_paged(empty, ProductResponse::from)));
            }
        }
    }

    let paged = catalog.list_products(filter, page).await?;
    Ok(Json(PagedResponse::from_paged(paged, ProductResponse::from)))
}

/// GET /products/mine — the caller's own listings, whatever their
/// availability.
pub async fn mine(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Query(params): Query<PageParams>,
) -> Result<Json<PagedResponse<ProductResponse>>, ApiError> {
    let paged = state
        .market
        .catalog()
        .seller_products(actor, params.to_request()?)
        .await?;
    Ok(Json(PagedResponse::from_paged(paged, ProductResponse::from)))
}

/// GET /products/search — ranked by relevance, then recency. Only available
/// products are returned unless `available` says otherwise.
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PagedResponse<ProductResponse>>, ApiError> {
    let request = SearchRequest {
        text: params.q,
        category: params.category.filter(|c| !c.is_empty()),
        min_price: parse_price(params.min_price.as_deref(), "min_price")?,
        max_price: parse_price(params.max_price.as_deref(), "max_price")?,
        available: Some(params.available.unwrap_or(true)),
        page: page_request(params.page, params.page_size)?,
    };
    let paged = state.market.search().search(request).await?;
    Ok(Json(PagedResponse::from_paged(paged, ProductResponse::from)))
}

/// POST /products — list a product for sale.
#[tracing::instrument(skip(state, actor, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .market
        .catalog()
        .create_product(
            actor,
            NewProduct {
                category_id: req.category_id,
                name: req.name,
                description: req.description,
                price: req.price,
                stock: req.stock,
                unit: req.unit,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{slug} — fetch a product and count the view.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.market.catalog().get_by_slug(&slug, viewer).await?;
    Ok(Json(product.into()))
}

/// PATCH /products/{id} — the owning seller edits a listing.
#[tracing::instrument(skip(state, actor, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let changes = ProductChanges {
        category_id: req.category_id,
        name: req.name,
        description: req.description,
        price: req.price,
        stock: req.stock,
        unit: req.unit,
        seller_disabled: req.seller_disabled,
    };
    let product = state
        .market
        .catalog()
        .update_product(actor, product_id, changes)
        .await?;
    Ok(Json(product.into()))
}
