//! Order placement, transitions and the read side.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, OrderStatus, ProductId, Quantity};
use domain::OrderRole;
use serde::Deserialize;
use store::Order;

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiError;
use crate::routes::parse_id;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    /// `buyer` or `seller`; both sides when absent.
    pub role: Option<String>,
}

// -- Handlers --

/// POST /orders — place an order and reserve its stock.
#[tracing::instrument(skip(state, actor, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .market
        .orders()
        .place_order(actor, req.product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders — orders the caller takes part in, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<OrderStatus>().map_err(ApiError::BadRequest))
        .transpose()?;
    let role = match params.role.as_deref() {
        None | Some("") => OrderRole::Any,
        Some("buyer") => OrderRole::Buyer,
        Some("seller") => OrderRole::Seller,
        Some(other) => return Err(ApiError::BadRequest(format!("unknown role '{other}'"))),
    };
    let orders = state
        .market
        .orders()
        .list_orders(actor, status, role)
        .await?;
    Ok(Json(orders))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.market.orders().get_order(actor, order_id).await?))
}

/// POST /orders/{id}/confirm
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.market.orders().confirm(actor, order_id).await?))
}

/// POST /orders/{id}/cancel — optional JSON body `{"reason": "..."}`.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelOrderRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid cancel request: {e}")))?
            .reason
    };
    let order = state
        .market
        .orders()
        .cancel(actor, order_id, reason.as_deref())
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/ship
pub async fn ship(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.market.orders().ship(actor, order_id).await?))
}

/// POST /orders/{id}/deliver
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    Ok(Json(state.market.orders().deliver(actor, order_id).await?))
}
