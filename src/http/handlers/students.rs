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
use crate::store::students::{self, Student};
use crate::store::PageFilter;

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let conn = state.conn()?;
    let filter = PageFilter {
        classroom: q.class.clone(),
        location: q.location.clone(),
    };
    let page = students::find_page(&conn, &filter, q.page(), q.limit())
        .map_err(ApiError::from_store)?;
    Ok(Json(json!({
        "students": page.items,
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
        "fieldTypes": schema::field_types(Entity::Student),
    })))
}

pub async fn get_one(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Student>, ApiError> {
    let conn = state.conn()?;
    students::find_by_id(&conn, &id)
        .map(Json)
        .map_err(ApiError::from_store)
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let conn = state.conn()?;
    let student = students::create(&conn, &body, auth.role).map_err(ApiError::from_store)?;
    info!(
        student = %student.id,
        status = student.status.as_str(),
        "student registered"
    );
    Ok("Student created".into_response())
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Student>, ApiError> {
    // Approval is an admin action; the UI hides it for staff but the
    // route enforces it regardless.
    if body.get("status").is_some() && !auth.role.is_admin() {
        return Err(ApiError::Unauthorized("Not authorized".to_string()));
    }
    let conn = state.conn()?;
    students::update(&conn, &id, &body)
        .map(Json)
        .map_err(ApiError::from_store_put)
}

pub async fn delete_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    // Covers Reject on pending rows, so it is admin-gated like Approve.
    if !auth.role.is_admin() {
        return Err(ApiError::Unauthorized("Not authorized".to_string()));
    }
    let conn = state.conn()?;
    students::delete(&conn, &id).map_err(ApiError::from_store)?;
    info!(student = %id, "student deleted");
    Ok(Json(json!({ "msg": "Student deleted" })))
}
