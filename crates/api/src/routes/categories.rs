//! Category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};
use store::Category;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::parse_id;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct CategoryDeletedResponse {
    pub removed_products: Vec<ProductId>,
    pub removed_orders: u64,
}

/// GET /categories — all categories ordered by name.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.market.catalog().list_categories().await?))
}

/// POST /categories
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .market
        .catalog()
        .create_category(&req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /categories/{id} — removes the category with its products and
/// their orders.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CategoryDeletedResponse>, ApiError> {
    let id: CategoryId = parse_id(&id, "category")?;
    let removal = state.market.catalog().delete_category(id).await?;
    Ok(Json(CategoryDeletedResponse {
        removed_products: removal.removed_products,
        removed_orders: removal.removed_orders,
    }))
}
