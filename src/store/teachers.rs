use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use super::{
    lookup_ref, new_id, now, optional_str, page_clause, page_count, ref_id, required_str,
    resolve_classroom, resolve_location, well_formed_id, EntityRef, Page, PageFilter, StoreError,
    StoreResult,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub surname: String,
    pub dob: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<EntityRef>,
    pub date_created: String,
    pub date_modified: String,
}

pub(crate) fn valid_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

pub fn create(conn: &Connection, body: &Value) -> StoreResult<Teacher> {
    let mut errors = Vec::new();
    let name = required_str(body, "name", "Name", &mut errors);
    let surname = required_str(body, "surname", "Surname", &mut errors);
    let dob = required_str(body, "dob", "Date of birth", &mut errors);
    if !dob.is_empty() && !valid_date(&dob) {
        errors.push("Date of birth must be a valid date (YYYY-MM-DD)".to_string());
    }
    let address = required_str(body, "address", "Address", &mut errors);
    let email = required_str(body, "email", "Email", &mut errors);
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM teachers WHERE name = ? AND surname = ? AND dob = ?",
            [&name, &surname, &dob],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::Duplicate("Teacher already exists".to_string()));
    }

    let class = match body.get("class").and_then(ref_id) {
        Some(class_id) => Some(resolve_classroom(conn, &class_id)?),
        None => None,
    };
    let location = match body.get("location").and_then(ref_id) {
        Some(loc_id) => Some(resolve_location(conn, &loc_id)?),
        None => None,
    };

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO teachers(id, name, middle_name, surname, dob, address, phone_number,
                              email, classroom_id, location_id, date_created, date_modified)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            name,
            optional_str(body, "middleName"),
            surname,
            dob,
            address,
            optional_str(body, "phoneNumber"),
            email,
            class.as_ref().map(|c| &c.id),
            location.as_ref().map(|l| &l.id),
            ts,
            ts
        ],
    )?;

    find_by_id(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Teacher> {
    if !well_formed_id(id) {
        return Err(StoreError::NotFound("Teacher"));
    }
    let row = conn
        .query_row(
            "SELECT id, name, middle_name, surname, dob, address, phone_number, email,
                    classroom_id, location_id, date_created, date_modified
             FROM teachers WHERE id = ?",
            [id],
            teacher_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound("Teacher"))?;

    assemble(conn, row)
}

pub fn find_page(
    conn: &Connection,
    filter: &PageFilter,
    page: u64,
    page_size: u64,
) -> StoreResult<Page<Teacher>> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut params: Vec<String> = Vec::new();
    if let Some(class_id) = &filter.classroom {
        where_sql.push_str(" AND classroom_id = ?");
        params.push(class_id.clone());
    }
    if let Some(loc_id) = &filter.location {
        where_sql.push_str(" AND location_id = ?");
        params.push(loc_id.clone());
    }

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM teachers{}", where_sql),
        rusqlite::params_from_iter(params.iter()),
        |r| r.get(0),
    )?;

    let mut sql = format!(
        "SELECT id, name, middle_name, surname, dob, address, phone_number, email,
                classroom_id, location_id, date_created, date_modified
         FROM teachers{} ORDER BY surname COLLATE NOCASE, name COLLATE NOCASE",
        where_sql
    );
    if page_size > 0 {
        sql.push_str(&page_clause(page, page_size));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), teacher_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(assemble(conn, row)?);
    }

    Ok(Page {
        items,
        total,
        page: page.max(1),
        pages: page_count(total, page_size),
    })
}

pub fn update(conn: &Connection, id: &str, patch: &Value) -> StoreResult<Teacher> {
    let existing = find_by_id(conn, id)?;

    let mut errors = Vec::new();
    let mut sets: Vec<&str> = Vec::new();
    let mut vals: Vec<Option<String>> = Vec::new();

    for (key, set_sql, label, required) in [
        ("name", "name = ?", "Name", true),
        ("middleName", "middle_name = ?", "Middle name", false),
        ("surname", "surname = ?", "Surname", true),
        ("dob", "dob = ?", "Date of birth", true),
        ("address", "address = ?", "Address", true),
        ("phoneNumber", "phone_number = ?", "Phone number", false),
        ("email", "email = ?", "Email", true),
    ] {
        if patch.get(key).is_none() {
            continue;
        }
        match optional_str(patch, key) {
            Some(v) => {
                if key == "dob" && !valid_date(&v) {
                    errors.push("Date of birth must be a valid date (YYYY-MM-DD)".to_string());
                    continue;
                }
                sets.push(set_sql);
                vals.push(Some(v));
            }
            None if required => errors.push(format!("{} must not be empty", label)),
            None => {
                sets.push(set_sql);
                vals.push(None);
            }
        }
    }

    if let Some(class_value) = patch.get("class") {
        match ref_id(class_value) {
            Some(class_id) => {
                let resolved = resolve_classroom(conn, &class_id)?;
                sets.push("classroom_id = ?");
                vals.push(Some(resolved.id));
            }
            None => {
                sets.push("classroom_id = ?");
                vals.push(None);
            }
        }
    }
    if let Some(loc_value) = patch.get("location") {
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

    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    sets.push("date_modified = ?");
    vals.push(Some(now()));
    vals.push(Some(existing.id.clone()));
    let sql = format!("UPDATE teachers SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(vals.iter()))?;

    find_by_id(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    if well_formed_id(id) {
        conn.execute("DELETE FROM teachers WHERE id = ?", [id])?;
    }
    Ok(())
}

type TeacherRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn teacher_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<TeacherRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
        r.get(9)?,
        r.get(10)?,
        r.get(11)?,
    ))
}

fn assemble(conn: &Connection, row: TeacherRow) -> StoreResult<Teacher> {
    Ok(Teacher {
        id: row.0,
        name: row.1,
        middle_name: row.2,
        surname: row.3,
        dob: row.4,
        address: row.5,
        phone_number: row.6,
        email: row.7,
        class: lookup_ref(conn, "classrooms", row.8)?,
        location: lookup_ref(conn, "locations", row.9)?,
        date_created: row.10,
        date_modified: row.11,
    })
}
