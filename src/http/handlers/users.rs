use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use super::ListQuery;
use crate::http::error::ApiError;
use crate::http::extract::AuthUser;
use crate::http::AppState;
use crate::schema::{self, Entity};
use crate::store::users::{self, User};

fn require_admin(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Not authorized".to_string()))
    }
}

// Reads are admin-gated like the mutations: user payloads carry
// unredeemed registration links, which stand in for a password.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let conn = state.conn()?;
    let page = users::find_page(&conn, q.page(), q.limit()).map_err(ApiError::from_store)?;
    Ok(Json(json!({
        "users": page.items,
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
        "fieldTypes": schema::field_types(Entity::User),
    })))
}

pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    require_admin(&auth)?;
    let conn = state.conn()?;
    users::find_by_id(&conn, &id)
        .map(Json)
        .map_err(ApiError::from_store)
}

/// Admins create users without a password; the returned user carries a
/// signed registration link the new user redeems to set one.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    require_admin(&auth)?;
    let conn = state.conn()?;
    let user = users::create(&conn, &state.secret, &body).map_err(ApiError::from_store)?;
    info!(user = %user.id, role = user.role.as_str(), "user created");
    Ok("User created".into_response())
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<User>, ApiError> {
    require_admin(&auth)?;
    let conn = state.conn()?;
    users::update(&conn, &id, &body)
        .map(Json)
        .map_err(ApiError::from_store_put)
}

pub async fn delete_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let conn = state.conn()?;
    users::delete(&conn, &id).map_err(ApiError::from_store)?;
    info!(user = %id, "user deleted");
    Ok(Json(json!({ "msg": "User deleted" })))
}
