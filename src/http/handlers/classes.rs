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
use crate::store::classrooms::{self, Classroom};

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.conn()?;
    let page = classrooms::find_page(&conn, q.location.as_deref(), q.page(), q.limit())
        .map_err(ApiError::from_store)?;
    Ok(Json(json!({
        "classes": page.items,
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
        "fieldTypes": schema::field_types(Entity::Classroom),
    })))
}

pub async fn get_one(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Classroom>, ApiError> {
    let conn = state.conn()?;
    classrooms::find_by_id(&conn, &id)
        .map(Json)
        .map_err(ApiError::from_store)
}

pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;
    let classroom = classrooms::create(&conn, &body).map_err(ApiError::from_store)?;
    info!(classroom = %classroom.id, "classroom created");
    Ok("Classroom created".into_response())
}

pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Classroom>, ApiError> {
    let conn = state.conn()?;
    classrooms::update(&conn, &id, &body)
        .map(Json)
        .map_err(ApiError::from_store_put)
}

pub async fn delete_one(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.conn()?;
    classrooms::delete(&conn, &id).map_err(ApiError::from_store)?;
    info!(classroom = %id, "classroom deleted");
    Ok(Json(json!({ "msg": "Classroom deleted" })))
}
