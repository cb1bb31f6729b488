use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use super::{
    new_id, now, optional_str, page_clause, page_count, required_str, well_formed_id, Page,
    StoreError, StoreResult,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
    pub date_created: String,
    pub date_modified: String,
}

pub fn create(conn: &Connection, body: &Value) -> StoreResult<Location> {
    let mut errors = Vec::new();
    let name = required_str(body, "name", "Name", &mut errors);
    let address = required_str(body, "address", "Address", &mut errors);
    let city = required_str(body, "city", "City", &mut errors);
    let state = required_str(body, "state", "State", &mut errors);
    let country = required_str(body, "country", "Country", &mut errors);
    let zipcode = required_str(body, "zipcode", "Zipcode", &mut errors);
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM locations WHERE name = ?", [&name], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::Duplicate("Location already exists".to_string()));
    }

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO locations(id, name, address, city, state, country, zipcode,
                               date_created, date_modified)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, name, address, city, state, country, zipcode, ts, ts],
    )?;

    find_by_id(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Location> {
    if !well_formed_id(id) {
        return Err(StoreError::NotFound("Location"));
    }
    conn.query_row(
        "SELECT id, name, address, city, state, country, zipcode, date_created, date_modified
         FROM locations WHERE id = ?",
        [id],
        location_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("Location"))
}

pub fn find_page(conn: &Connection, page: u64, page_size: u64) -> StoreResult<Page<Location>> {
    let total: u64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |r| r.get(0))?;

    let mut sql = String::from(
        "SELECT id, name, address, city, state, country, zipcode, date_created, date_modified
         FROM locations ORDER BY name COLLATE NOCASE",
    );
    if page_size > 0 {
        sql.push_str(&page_clause(page, page_size));
    }
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([], location_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total,
        page: page.max(1),
        pages: page_count(total, page_size),
    })
}

pub fn update(conn: &Connection, id: &str, patch: &Value) -> StoreResult<Location> {
    let existing = find_by_id(conn, id)?;

    let mut errors = Vec::new();
    let mut sets: Vec<&str> = Vec::new();
    let mut vals: Vec<String> = Vec::new();

    for (key, column, label) in [
        ("name", "name", "Name"),
        ("address", "address", "Address"),
        ("city", "city", "City"),
        ("state", "state", "State"),
        ("country", "country", "Country"),
        ("zipcode", "zipcode", "Zipcode"),
    ] {
        if patch.get(key).is_none() {
            continue;
        }
        match optional_str(patch, key) {
            Some(v) => {
                if key == "name" {
                    let taken: Option<i64> = conn
                        .query_row(
                            "SELECT 1 FROM locations WHERE name = ? AND id != ?",
                            [&v, &existing.id],
                            |r| r.get(0),
                        )
                        .optional()?;
                    if taken.is_some() {
                        return Err(StoreError::Duplicate(
                            "Location already exists".to_string(),
                        ));
                    }
                }
                sets.push(match column {
                    "name" => "name = ?",
                    "address" => "address = ?",
                    "city" => "city = ?",
                    "state" => "state = ?",
                    "country" => "country = ?",
                    _ => "zipcode = ?",
                });
                vals.push(v);
            }
            None => errors.push(format!("{} must not be empty", label)),
        }
    }
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    sets.push("date_modified = ?");
    vals.push(now());
    vals.push(existing.id.clone());
    let sql = format!("UPDATE locations SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(vals.iter()))?;

    find_by_id(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    if !well_formed_id(id) {
        return Ok(());
    }
    // Detach referents in dependency order; referenced entities are not
    // owned by the location.
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE classrooms SET location_id = NULL WHERE location_id = ?",
        [id],
    )?;
    tx.execute(
        "UPDATE students SET location_id = NULL WHERE location_id = ?",
        [id],
    )?;
    tx.execute(
        "UPDATE teachers SET location_id = NULL WHERE location_id = ?",
        [id],
    )?;
    tx.execute("DELETE FROM locations WHERE id = ?", [id])?;
    tx.commit()?;
    Ok(())
}

fn location_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        country: row.get(5)?,
        zipcode: row.get(6)?,
        date_created: row.get(7)?,
        date_modified: row.get(8)?,
    })
}
