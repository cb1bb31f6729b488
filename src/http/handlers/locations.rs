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
use crate::store::locations::{self, Location};

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.conn()?;
    let page =
        locations::find_page(&conn, q.page(), q.limit()).map_err(ApiError::from_store)?;
    Ok(Json(json!({
        "locations": page.items,
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
        "fieldTypes": schema::field_types(Entity::Location),
    })))
}

pub async fn get_one(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    let conn = state.conn()?;
    locations::find_by_id(&conn, &id)
        .map(Json)
        .map_err(ApiError::from_store)
}

pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;
    let location = locations::create(&conn, &body).map_err(ApiError::from_store)?;
    info!(location = %location.id, "location created");
    Ok("Location created".into_response())
}

pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Location>, ApiError> {
    let conn = state.conn()?;
    locations::update(&conn, &id, &body)
        .map(Json)
        .map_err(ApiError::from_store_put)
}

pub async fn delete_one(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.conn()?;
    locations::delete(&conn, &id).map_err(ApiError::from_store)?;
    info!(location = %id, "location deleted");
    Ok(Json(json!({ "msg": "Location deleted" })))
}
