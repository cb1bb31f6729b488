use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{self, TokenPurpose};
use crate::http::error::ApiError;
use crate::http::extract::AuthUser;
use crate::http::AppState;
use crate::store::users::{self, User};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth` — exchanges credentials for a session token. Invalid
/// credentials are a 400, indistinguishable between unknown email and
/// wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid credentials".to_string());

    let creds = {
        let conn = state.conn()?;
        users::find_credentials_by_email(&conn, body.email.trim())
            .map_err(ApiError::from_store)?
    };
    let creds = creds.ok_or_else(invalid)?;
    if !creds.registered {
        return Err(invalid());
    }
    let hash = creds.password_hash.as_deref().ok_or_else(invalid)?;
    if !auth::verify_password(&body.password, hash) {
        return Err(invalid());
    }

    let token = auth::sign_token(&state.secret, &creds.id, TokenPurpose::Auth);
    info!(user = %creds.id, "login");
    Ok(Json(json!({ "token": token })))
}

/// `GET /api/auth` — returns the authenticated user.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>, ApiError> {
    let conn = state.conn()?;
    users::find_by_id(&conn, &auth.id)
        .map(Json)
        .map_err(ApiError::from_store)
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub token: String,
    pub password: String,
}

/// `POST /api/users/register` — redeems a registration link: sets the
/// password and flips `registered`. No session token required.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Response, ApiError> {
    let user_id = auth::verify_token(&state.secret, &body.token, TokenPurpose::Register)
        .ok_or_else(|| ApiError::BadRequest("Invalid registration link".to_string()))?;

    let conn = state.conn()?;
    let user = users::complete_registration(&conn, &user_id, &body.password)
        .map_err(ApiError::from_store_put)?;
    info!(user = %user.id, "registration completed");
    Ok("Registration complete".into_response())
}
