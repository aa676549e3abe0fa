//! The caller's notification inbox.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::NotificationId;
use serde::{Deserialize, Serialize};
use store::Notification;

use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiError;
use crate::routes::parse_id;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Serialize)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

/// GET /notifications — newest first; `?unread=true` hides read ones.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state
        .market
        .notifications()
        .list(actor.user_id, params.unread)
        .await?;
    Ok(Json(notifications))
}

/// POST /notifications/{id}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<MarkedReadResponse>, ApiError> {
    let id: NotificationId = parse_id(&id, "notification")?;
    state
        .market
        .notifications()
        .mark_read(id, actor.user_id)
        .await?;
    Ok(Json(MarkedReadResponse { updated: 1 }))
}

/// POST /notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<Json<MarkedReadResponse>, ApiError> {
    let updated = state
        .market
        .notifications()
        .mark_all_read(actor.user_id)
        .await?;
    Ok(Json(MarkedReadResponse { updated }))
}
