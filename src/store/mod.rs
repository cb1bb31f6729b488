//! Per-entity persistence accessors over the workspace SQLite file.
//!
//! Every entity module exposes the same contract: `create`, `find_by_id`,
//! `find_page`, `update`, `delete`. Updates apply only the fields present
//! in the partial payload and always refresh `date_modified`; deletes are
//! idempotent.

pub mod classrooms;
mod error;
pub mod locations;
pub mod students;
pub mod teachers;
pub mod users;

pub use error::{StoreError, StoreResult};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// A reference field resolved for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

/// Listing filters; the only supported keys are the two reference fields.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub classroom: Option<String>,
    pub location: Option<String>,
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn well_formed_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// `pages = ceil(total / page_size)`; a page size of zero means "all".
pub(crate) fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        u64::from(total > 0)
    } else {
        total.div_ceil(page_size)
    }
}

/// LIMIT/OFFSET clause for one page. Page and limit come straight from
/// the query string, so the arithmetic saturates and both values are
/// capped to what SQLite treats as an integer.
pub(crate) fn page_clause(page: u64, page_size: u64) -> String {
    let limit = page_size.min(i64::MAX as u64);
    let offset = page
        .max(1)
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(i64::MAX as u64);
    format!(" LIMIT {} OFFSET {}", limit, offset)
}

/// Reads a trimmed, non-empty string field, recording an error otherwise.
pub(crate) fn required_str(body: &Value, key: &str, label: &str, errors: &mut Vec<String>) -> String {
    match body.get(key).and_then(|v| v.as_str()).map(|s| s.trim()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            errors.push(format!("{} is required", label));
            String::new()
        }
    }
}

pub(crate) fn optional_str(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Reference payloads arrive either as a bare id string or as the
/// `{_id, name}` object the client keeps for rendering.
pub(crate) fn ref_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => value
            .get("_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

pub(crate) fn resolve_classroom(conn: &Connection, id: &str) -> StoreResult<EntityRef> {
    resolve_ref(conn, "classrooms", "Classroom", id)
}

pub(crate) fn resolve_location(conn: &Connection, id: &str) -> StoreResult<EntityRef> {
    resolve_ref(conn, "locations", "Location", id)
}

fn resolve_ref(
    conn: &Connection,
    table: &str,
    label: &str,
    id: &str,
) -> StoreResult<EntityRef> {
    if !well_formed_id(id) {
        return Err(StoreError::ReferenceNotFound(format!("{} not found", label)));
    }
    let sql = format!("SELECT name FROM {} WHERE id = ?", table);
    let name: Option<String> = conn
        .query_row(&sql, [id], |r| r.get(0))
        .optional()?;
    match name {
        Some(name) => Ok(EntityRef {
            id: id.to_string(),
            name,
        }),
        None => Err(StoreError::ReferenceNotFound(format!("{} not found", label))),
    }
}

/// Looks up an optional reference column for display.
pub(crate) fn lookup_ref(
    conn: &Connection,
    table: &str,
    id: Option<String>,
) -> StoreResult<Option<EntityRef>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let sql = format!("SELECT name FROM {} WHERE id = ?", table);
    let name: Option<String> = conn
        .query_row(&sql, [&id], |r| r.get(0))
        .optional()?;
    // A dangling stored reference renders as nothing rather than failing
    // the whole read.
    Ok(name.map(|name| EntityRef { id, name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 10), 3);
    }

    #[test]
    fn page_count_show_all() {
        assert_eq!(page_count(0, 0), 0);
        assert_eq!(page_count(37, 0), 1);
    }

    #[test]
    fn page_clause_saturates_absurd_values() {
        assert_eq!(page_clause(1, 10), " LIMIT 10 OFFSET 0");
        assert_eq!(page_clause(3, 10), " LIMIT 10 OFFSET 20");
        assert_eq!(
            page_clause(u64::MAX, u64::MAX),
            format!(" LIMIT {} OFFSET {}", i64::MAX, i64::MAX)
        );
    }

    #[test]
    fn ref_id_accepts_string_or_object() {
        assert_eq!(ref_id(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(
            ref_id(&json!({"_id": "abc", "name": "Room 1"})).as_deref(),
            Some("abc")
        );
        assert_eq!(ref_id(&json!("")), None);
        assert_eq!(ref_id(&json!(null)), None);
    }
}
