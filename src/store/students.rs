use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use super::teachers::valid_date;
use super::{
    lookup_ref, new_id, now, optional_str, page_clause, page_count, ref_id, required_str,
    resolve_classroom, resolve_location, well_formed_id, EntityRef, Page, PageFilter, StoreError,
    StoreResult,
};
use crate::store::users::Role;

pub const MIN_GUARDIANS: usize = 1;
pub const MAX_GUARDIANS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Pending,
    Approved,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Pending => "pending",
            StudentStatus::Approved => "approved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StudentStatus::Pending),
            "approved" => Some(StudentStatus::Approved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub surname: String,
    pub phone_number: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub relationship_to_student: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
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
    pub status: StudentStatus,
    pub responsables: Vec<Guardian>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<EntityRef>,
    pub date_created: String,
    pub date_modified: String,
}

/// Creates a student. Staff submissions start `pending` and wait for an
/// admin to approve; admin submissions are approved directly.
pub fn create(conn: &Connection, body: &Value, creator: Role) -> StoreResult<Student> {
    let mut errors = Vec::new();
    let name = required_str(body, "name", "Name", &mut errors);
    let surname = required_str(body, "surname", "Surname", &mut errors);
    let dob = required_str(body, "dob", "Date of birth", &mut errors);
    if !dob.is_empty() && !valid_date(&dob) {
        errors.push("Date of birth must be a valid date (YYYY-MM-DD)".to_string());
    }
    let address = required_str(body, "address", "Address", &mut errors);
    let guardians = guardians_from_value(body.get("responsables"), &mut errors);
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE name = ? AND surname = ? AND dob = ?",
            [&name, &surname, &dob],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::Duplicate("Student already exists".to_string()));
    }

    let class = match body.get("class").and_then(ref_id) {
        Some(class_id) => Some(resolve_classroom(conn, &class_id)?),
        None => None,
    };
    let location = match body.get("location").and_then(ref_id) {
        Some(loc_id) => Some(resolve_location(conn, &loc_id)?),
        None => None,
    };

    let status = if creator.is_admin() {
        StudentStatus::Approved
    } else {
        StudentStatus::Pending
    };

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO students(id, name, middle_name, surname, dob, address, phone_number,
                              status, classroom_id, location_id, date_created, date_modified)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            name,
            optional_str(body, "middleName"),
            surname,
            dob,
            address,
            optional_str(body, "phoneNumber"),
            status.as_str(),
            class.as_ref().map(|c| &c.id),
            location.as_ref().map(|l| &l.id),
            ts,
            ts
        ],
    )?;
    insert_guardians(conn, &id, &guardians)?;

    find_by_id(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<Student> {
    if !well_formed_id(id) {
        return Err(StoreError::NotFound("Student"));
    }
    let row = conn
        .query_row(
            "SELECT id, name, middle_name, surname, dob, address, phone_number, status,
                    classroom_id, location_id, date_created, date_modified
             FROM students WHERE id = ?",
            [id],
            student_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound("Student"))?;

    assemble(conn, row)
}

/// Pending registrations sort ahead of approved ones so moderation work
/// is always at the top; ties break by surname.
pub fn find_page(
    conn: &Connection,
    filter: &PageFilter,
    page: u64,
    page_size: u64,
) -> StoreResult<Page<Student>> {
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
        &format!("SELECT COUNT(*) FROM students{}", where_sql),
        rusqlite::params_from_iter(params.iter()),
        |r| r.get(0),
    )?;

    let mut sql = format!(
        "SELECT id, name, middle_name, surname, dob, address, phone_number, status,
                classroom_id, location_id, date_created, date_modified
         FROM students{}
         ORDER BY CASE status WHEN 'pending' THEN 0 ELSE 1 END,
                  surname COLLATE NOCASE, name COLLATE NOCASE",
        where_sql
    );
    if page_size > 0 {
        sql.push_str(&page_clause(page, page_size));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), student_row)?
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

pub fn update(conn: &Connection, id: &str, patch: &Value) -> StoreResult<Student> {
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

    if patch.get("status").is_some() {
        match optional_str(patch, "status")
            .as_deref()
            .and_then(StudentStatus::parse)
        {
            // Approval is one-way: an approved student never re-enters
            // the moderation queue.
            Some(StudentStatus::Pending) if existing.status == StudentStatus::Approved => {
                errors.push("An approved student cannot return to pending".to_string());
            }
            Some(status) => {
                sets.push("status = ?");
                vals.push(Some(status.as_str().to_string()));
            }
            None => errors.push("Status must be pending or approved".to_string()),
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

    // Guardians are replaced wholesale and must stay within 1..=2.
    let guardians = match patch.get("responsables") {
        Some(value) => {
            let parsed = guardians_from_value(Some(value), &mut errors);
            Some(parsed)
        }
        None => None,
    };

    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    sets.push("date_modified = ?");
    vals.push(Some(now()));
    vals.push(Some(existing.id.clone()));
    let sql = format!("UPDATE students SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(vals.iter()))?;

    if let Some(guardians) = guardians {
        conn.execute("DELETE FROM guardians WHERE student_id = ?", [&existing.id])?;
        insert_guardians(conn, &existing.id, &guardians)?;
    }

    find_by_id(conn, id)
}

/// Idempotent removal of a student and its owned guardians.
pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    if !well_formed_id(id) {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM guardians WHERE student_id = ?", [id])?;
    tx.execute("DELETE FROM students WHERE id = ?", [id])?;
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone)]
struct GuardianInput {
    name: String,
    middle_name: Option<String>,
    surname: String,
    phone_number: String,
    address: String,
    email: Option<String>,
    relationship: String,
}

fn guardians_from_value(value: Option<&Value>, errors: &mut Vec<String>) -> Vec<GuardianInput> {
    let Some(list) = value.and_then(|v| v.as_array()) else {
        errors.push("At least one guardian is required".to_string());
        return Vec::new();
    };
    if list.len() < MIN_GUARDIANS {
        errors.push("At least one guardian is required".to_string());
        return Vec::new();
    }
    if list.len() > MAX_GUARDIANS {
        errors.push("A student can have at most two guardians".to_string());
        return Vec::new();
    }

    let mut out = Vec::with_capacity(list.len());
    for (i, g) in list.iter().enumerate() {
        let mut local = Vec::new();
        let name = required_str(g, "name", "Guardian name", &mut local);
        let surname = required_str(g, "surname", "Guardian surname", &mut local);
        let phone_number = required_str(g, "phoneNumber", "Guardian phone number", &mut local);
        if !phone_number.is_empty() && !(10..=15).contains(&phone_number.chars().count()) {
            local.push("Guardian phone number must be 10 to 15 characters".to_string());
        }
        let address = required_str(g, "address", "Guardian address", &mut local);
        let relationship =
            required_str(g, "relationshipToStudent", "Guardian relationship", &mut local);

        if local.is_empty() {
            out.push(GuardianInput {
                name,
                middle_name: optional_str(g, "middleName"),
                surname,
                phone_number,
                address,
                email: optional_str(g, "email"),
                relationship,
            });
        } else {
            errors.extend(local.into_iter().map(|m| format!("{} (guardian {})", m, i + 1)));
        }
    }
    out
}

fn insert_guardians(
    conn: &Connection,
    student_id: &str,
    guardians: &[GuardianInput],
) -> StoreResult<()> {
    for (i, g) in guardians.iter().enumerate() {
        conn.execute(
            "INSERT INTO guardians(id, student_id, name, middle_name, surname, phone_number,
                                   address, email, relationship, sort_order)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                new_id(),
                student_id,
                g.name,
                g.middle_name,
                g.surname,
                g.phone_number,
                g.address,
                g.email,
                g.relationship,
                i as i64
            ],
        )?;
    }
    Ok(())
}

fn load_guardians(conn: &Connection, student_id: &str) -> StoreResult<Vec<Guardian>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, middle_name, surname, phone_number, address, email, relationship
         FROM guardians WHERE student_id = ? ORDER BY sort_order",
    )?;
    let guardians = stmt
        .query_map([student_id], |r| {
            Ok(Guardian {
                id: r.get(0)?,
                name: r.get(1)?,
                middle_name: r.get(2)?,
                surname: r.get(3)?,
                phone_number: r.get(4)?,
                address: r.get(5)?,
                email: r.get(6)?,
                relationship_to_student: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(guardians)
}

type StudentRow = (
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

fn student_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<StudentRow> {
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

fn assemble(conn: &Connection, row: StudentRow) -> StoreResult<Student> {
    let responsables = load_guardians(conn, &row.0)?;
    Ok(Student {
        id: row.0,
        name: row.1,
        middle_name: row.2,
        surname: row.3,
        dob: row.4,
        address: row.5,
        phone_number: row.6,
        status: StudentStatus::parse(&row.7).unwrap_or(StudentStatus::Approved),
        responsables,
        class: lookup_ref(conn, "classrooms", row.8)?,
        location: lookup_ref(conn, "locations", row.9)?,
        date_created: row.10,
        date_modified: row.11,
    })
}
