use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// Opaque user id from the `x-user-id` header, or the configured default user.
pub struct SessionUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match parts.headers.get(USER_HEADER) {
            None => Ok(SessionUser(state.config.default_user_id.clone())),
            Some(v) => {
                let user = v
                    .to_str()
                    .map(str::trim)
                    .map_err(|_| (StatusCode::BAD_REQUEST, "invalid x-user-id header".into()))?;
                if user.is_empty() {
                    return Err((StatusCode::BAD_REQUEST, "empty x-user-id header".into()));
                }
                Ok(SessionUser(user.to_string()))
            }
        }
    }
}
