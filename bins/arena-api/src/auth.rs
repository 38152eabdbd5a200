// Caller identity for authenticated routes

use arena_common::User;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request, loaded from the store.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(ApiError::Unauthorized("Missing or invalid user id"))?;

        match state.orchestrator.store().get_user(user_id).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                tracing::warn!(user_id = %user_id, "Request from unknown user");
                Err(ApiError::Unauthorized("Unknown user"))
            }
        }
    }
}
