use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use super::{
    lookup_ref, new_id, now, optional_str, page_clause, page_count, ref_id, required_str,
    resolve_location, well_formed_id, EntityRef, Page, StoreError, StoreResult,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<EntityRef>,
    pub date_created: String,
    pub date_modified: String,
}

pub fn create(conn: &Connection, body: &Value) -> StoreResult<Classroom> {
    let mut errors = Vec::new();
    let name = required_str(body, "name", "Name", &mut errors);
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM classrooms WHERE name = ?", [&name], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::Duplicate(
            "Classroom already exists".to_string(),
        ));
    }

    // Resolve the reference before the write; it must exist at assignment.
    let location = match body.get("location").and_then(ref_id) {
        Some(loc_id) => Some(resolve_location(conn, &loc_id)?),
        None => None,
    };

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO classrooms(id, name, location_id, date_created, date_modified)
         VALUES(?, ?, ?, ?, ?)",
        rusqlite::params![id, name, location.as_ref().map(|l| &l.id), ts, ts],
    )?;

    find_by_id(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Classroom> {
    if !well_formed_id(id) {
        return Err(StoreError::NotFound("Classroom"));
    }
    let row = conn
        .query_row(
            "SELECT id, name, location_id, date_created, date_modified
             FROM classrooms WHERE id = ?",
            [id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound("Classroom"))?;

    Ok(Classroom {
        id: row.0,
        name: row.1,
        location: lookup_ref(conn, "locations", row.2)?,
        date_created: row.3,
        date_modified: row.4,
    })
}

pub fn find_page(
    conn: &Connection,
    location: Option<&str>,
    page: u64,
    page_size: u64,
) -> StoreResult<Page<Classroom>> {
    let mut where_sql = String::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(loc) = location {
        where_sql.push_str(" WHERE location_id = ?");
        params.push(loc.to_string());
    }

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM classrooms{}", where_sql),
        rusqlite::params_from_iter(params.iter()),
        |r| r.get(0),
    )?;

    let mut sql = format!(
        "SELECT id, name, location_id, date_created, date_modified
         FROM classrooms{} ORDER BY name COLLATE NOCASE",
        where_sql
    );
    if page_size > 0 {
        sql.push_str(&page_clause(page, page_size));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(Classroom {
            id: row.0,
            name: row.1,
            location: lookup_ref(conn, "locations", row.2)?,
            date_created: row.3,
            date_modified: row.4,
        });
    }

    Ok(Page {
        items,
        total,
        page: page.max(1),
        pages: page_count(total, page_size),
    })
}

pub fn update(conn: &Connection, id: &str, patch: &Value) -> StoreResult<Classroom> {
    let existing = find_by_id(conn, id)?;

    let mut sets: Vec<&str> = Vec::new();
    let mut vals: Vec<Option<String>> = Vec::new();

    if patch.get("name").is_some() {
        match optional_str(patch, "name") {
            Some(v) => {
                let taken: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM classrooms WHERE name = ? AND id != ?",
                        [&v, &existing.id],
                        |r| r.get(0),
                    )
                    .optional()?;
                if taken.is_some() {
                    return Err(StoreError::Duplicate(
                        "Classroom already exists".to_string(),
                    ));
                }
                sets.push("name = ?");
                vals.push(Some(v));
            }
            None => {
                return Err(StoreError::Validation(vec![
                    "Name must not be empty".to_string(),
                ]))
            }
        }
    }
    if let Some(loc_value) = patch.get("location") {
        // Null clears the reference; anything else must resolve.
        match ref_id(loc_value) {
            Some(loc_id) => {
                let resolved = resolve_location(conn, &loc_id)?;
                sets.push("location_id = ?");
                vals.push(Some(resolved.id));
            }
            None => {
                sets.push("location_id = ?");
                vals.push(None);
            }
        }
    }

    sets.push("date_modified = ?");
    vals.push(Some(now()));
    vals.push(Some(existing.id.clone()));
    let sql = format!("UPDATE classrooms SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(vals.iter()))?;

    find_by_id(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    if !well_formed_id(id) {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE students SET classroom_id = NULL WHERE classroom_id = ?",
        [id],
    )?;
    tx.execute(
        "UPDATE teachers SET classroom_id = NULL WHERE classroom_id = ?",
        [id],
    )?;
    tx.execute("DELETE FROM classrooms WHERE id = ?", [id])?;
    tx.commit()?;
    Ok(())
}
