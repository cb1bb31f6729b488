use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use super::AppState;
use crate::auth::{self, TokenPurpose};
use crate::store::users::{self, Role};

pub const AUTH_HEADER: &str = "x-auth-token";

/// The authenticated caller, resolved from the `x-auth-token` header.
/// The role comes from the user row, not the token, so a role change
/// takes effect on the next request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("No token, authorization denied".to_string())
            })?;

        let user_id = auth::verify_token(&state.secret, token, TokenPurpose::Auth)
            .ok_or_else(|| ApiError::Unauthorized("Token is not valid".to_string()))?;

        let conn = state.conn()?;
        let user = users::find_by_id(&conn, &user_id)
            .map_err(|_| ApiError::Unauthorized("Token is not valid".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
