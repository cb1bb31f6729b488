use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

/// Wire-level failure. Every handler converts its errors into one of
/// these; nothing propagates uncaught.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with one `{msg}` entry per problem.
    Validation(Vec<String>),
    /// 400 with a single message (duplicates, dangling references,
    /// invalid credentials, missing PUT targets).
    BadRequest(String),
    /// 404 for GET-by-id misses.
    NotFound(String),
    /// 401 for missing/invalid tokens and role-gated actions.
    Unauthorized(String),
    /// 500; the detail is logged server-side only.
    Internal(String),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    /// Default mapping: a missing target is a 404 (GET-by-id routes).
    pub fn from_store(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msgs) => ApiError::Validation(msgs),
            StoreError::Duplicate(msg) => ApiError::BadRequest(msg),
            StoreError::ReferenceNotFound(msg) => ApiError::BadRequest(msg),
            StoreError::NotFound(entity) => ApiError::NotFound(format!("{} not found", entity)),
            StoreError::Db(e) => ApiError::Internal(e.to_string()),
            StoreError::Internal(msg) => ApiError::Internal(msg),
        }
    }

    /// PUT routes report a missing target as 400, not 404.
    pub fn from_store_put(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(entity) => ApiError::BadRequest(format!("{} not found", entity)),
            other => Self::from_store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msgs) = match self {
            ApiError::Validation(msgs) => (StatusCode::BAD_REQUEST, msgs),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, vec![msg]),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg]),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, vec![msg]),
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, vec!["Server error".to_string()])
            }
        };
        let errors: Vec<_> = msgs.into_iter().map(|msg| json!({ "msg": msg })).collect();
        (status, Json(json!({ "errors": errors }))).into_response()
    }
}
