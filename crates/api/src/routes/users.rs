//! Identity records.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::Role;
use serde::Deserialize;
use store::User;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// POST /users — store the identity record of an authenticated user.
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .market
        .register_user(&req.username, &req.email, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}
