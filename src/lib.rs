pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod schema;
pub mod store;
pub mod ui;
