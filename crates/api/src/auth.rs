//! Principal extraction from trusted identity headers.
//!
//! Authentication happens upstream; the gateway forwards the caller as
//! `x-user-id` and `x-user-role`.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Role, UserId};
use domain::Principal;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    parts
        .headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::BadRequest(format!("{name} is not valid text")))
        })
        .transpose()
}

fn user_id(parts: &Parts) -> Result<Option<UserId>, ApiError> {
    header(parts, USER_ID_HEADER)?
        .map(|raw| {
            UserId::from_str(raw.trim())
                .map_err(|e| ApiError::BadRequest(format!("invalid {USER_ID_HEADER}: {e}")))
        })
        .transpose()
}

/// The authenticated caller. Rejects the request when no principal is given.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = user_id(parts)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let role = match header(parts, USER_ROLE_HEADER)? {
            Some(raw) => Role::from_str(raw.trim()).map_err(ApiError::BadRequest)?,
            None => Role::Buyer,
        };
        Ok(Actor(Principal::new(user_id, role)))
    }
}

/// The caller if one is known; anonymous requests are allowed.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(user_id(parts)?))
    }
}
