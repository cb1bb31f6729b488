//! REST surface: one route family per entity plus auth, all gated on the
//! `x-auth-token` header except login, registration and liveness.

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::routing::get;
use axum::Router;
use rusqlite::Connection;

use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    pub secret: Arc<str>,
}

impl AppState {
    pub fn new(conn: Connection, secret: &str) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            secret: Arc::from(secret),
        }
    }

    /// Storage calls within a request serialize on this lock; handlers
    /// never hold it across an await point.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/auth",
            get(handlers::auth::me).post(handlers::auth::login),
        )
        .route(
            "/api/users/register",
            axum::routing::post(handlers::auth::register),
        )
        .route(
            "/api/students",
            get(handlers::students::list).post(handlers::students::create),
        )
        .route(
            "/api/students/:id",
            get(handlers::students::get_one)
                .put(handlers::students::update)
                .delete(handlers::students::delete_one),
        )
        .route(
            "/api/teachers",
            get(handlers::teachers::list).post(handlers::teachers::create),
        )
        .route(
            "/api/teachers/:id",
            get(handlers::teachers::get_one)
                .put(handlers::teachers::update)
                .delete(handlers::teachers::delete_one),
        )
        .route(
            "/api/classes",
            get(handlers::classes::list).post(handlers::classes::create),
        )
        .route(
            "/api/classes/:id",
            get(handlers::classes::get_one)
                .put(handlers::classes::update)
                .delete(handlers::classes::delete_one),
        )
        .route(
            "/api/locations",
            get(handlers::locations::list).post(handlers::locations::create),
        )
        .route(
            "/api/locations/:id",
            get(handlers::locations::get_one)
                .put(handlers::locations::update)
                .delete(handlers::locations::delete_one),
        )
        .route(
            "/api/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route(
            "/api/users/:id",
            get(handlers::users::get_one)
                .put(handlers::users::update)
                .delete(handlers::users::delete_one),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
