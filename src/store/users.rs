use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

use super::{
    new_id, now, optional_str, page_clause, page_count, required_str, well_formed_id, Page,
    StoreError, StoreResult,
};
use crate::auth::{self, TokenPurpose};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "superadmin" => Some(Role::Superadmin),
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }

    /// Staff may not approve, reject, or administer users.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Superadmin | Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_link: Option<String>,
    pub registered: bool,
    pub date_created: String,
    pub date_modified: String,
}

/// Credential columns used by login; never serialized.
#[derive(Debug)]
pub struct Credentials {
    pub id: String,
    pub password_hash: Option<String>,
    pub registered: bool,
}

/// Creates an unregistered user. The caller emails the returned
/// registration link; the password is set when the link is redeemed.
pub fn create(conn: &Connection, secret: &str, body: &Value) -> StoreResult<User> {
    let mut errors = Vec::new();
    let name = required_str(body, "name", "Name", &mut errors);
    let email = required_str(body, "email", "Email", &mut errors);
    let role_raw = required_str(body, "role", "Role", &mut errors);
    let role = match Role::parse(&role_raw) {
        Some(r) => Some(r),
        None => {
            if !role_raw.is_empty() {
                errors.push("Role must be superadmin, admin or staff".to_string());
            }
            None
        }
    };
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }
    let role = role.expect("role validated above");

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE email = ?", [&email], |r| r.get(0))
        .optional()?;
    if exists.is_some() {
        return Err(StoreError::Duplicate("User already exists".to_string()));
    }

    let id = new_id();
    let registration_link = auth::sign_token(secret, &id, TokenPurpose::Register);
    let avatar = optional_str(body, "avatar").unwrap_or_default();
    let ts = now();
    conn.execute(
        "INSERT INTO users(id, name, email, avatar, role, registration_link, registered,
                           date_created, date_modified)
         VALUES(?, ?, ?, ?, ?, ?, 0, ?, ?)",
        rusqlite::params![id, name, email, avatar, role.as_str(), registration_link, ts, ts],
    )?;

    find_by_id(conn, &id)
}

pub fn find_by_id(conn: &Connection, id: &str) -> StoreResult<User> {
    if !well_formed_id(id) {
        return Err(StoreError::NotFound("User"));
    }
    conn.query_row(
        "SELECT id, name, email, avatar, role, registration_link, registered,
                date_created, date_modified
         FROM users WHERE id = ?",
        [id],
        user_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("User"))
}

pub fn find_page(conn: &Connection, page: u64, page_size: u64) -> StoreResult<Page<User>> {
    let total: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;

    let mut sql = String::from(
        "SELECT id, name, email, avatar, role, registration_link, registered,
                date_created, date_modified
         FROM users ORDER BY name COLLATE NOCASE",
    );
    if page_size > 0 {
        sql.push_str(&page_clause(page, page_size));
    }
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total,
        page: page.max(1),
        pages: page_count(total, page_size),
    })
}

pub fn update(conn: &Connection, id: &str, patch: &Value) -> StoreResult<User> {
    let existing = find_by_id(conn, id)?;

    let mut errors = Vec::new();
    let mut sets: Vec<&str> = Vec::new();
    let mut vals: Vec<String> = Vec::new();

    if patch.get("name").is_some() {
        match optional_str(patch, "name") {
            Some(v) => {
                sets.push("name = ?");
                vals.push(v);
            }
            None => errors.push("Name must not be empty".to_string()),
        }
    }
    if patch.get("email").is_some() {
        match optional_str(patch, "email") {
            Some(v) => {
                let taken: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM users WHERE email = ? AND id != ?",
                        [&v, &existing.id],
                        |r| r.get(0),
                    )
                    .optional()?;
                if taken.is_some() {
                    return Err(StoreError::Duplicate("User already exists".to_string()));
                }
                sets.push("email = ?");
                vals.push(v);
            }
            None => errors.push("Email must not be empty".to_string()),
        }
    }
    if patch.get("role").is_some() {
        match optional_str(patch, "role").as_deref().and_then(Role::parse) {
            Some(r) => {
                sets.push("role = ?");
                vals.push(r.as_str().to_string());
            }
            None => errors.push("Role must be superadmin, admin or staff".to_string()),
        }
    }
    if patch.get("avatar").is_some() {
        sets.push("avatar = ?");
        vals.push(optional_str(patch, "avatar").unwrap_or_default());
    }
    if !errors.is_empty() {
        return Err(StoreError::Validation(errors));
    }

    sets.push("date_modified = ?");
    vals.push(now());
    vals.push(existing.id.clone());
    let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(vals.iter()))?;

    find_by_id(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> StoreResult<()> {
    if well_formed_id(id) {
        conn.execute("DELETE FROM users WHERE id = ?", [id])?;
    }
    Ok(())
}

pub fn find_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> StoreResult<Option<Credentials>> {
    Ok(conn
        .query_row(
            "SELECT id, password_hash, registered FROM users WHERE email = ?",
            [email],
            |r| {
                Ok(Credentials {
                    id: r.get(0)?,
                    password_hash: r.get(1)?,
                    registered: r.get::<_, i64>(2)? != 0,
                })
            },
        )
        .optional()?)
}

/// Redeems a registration link: sets the password and flips `registered`.
pub fn complete_registration(
    conn: &Connection,
    user_id: &str,
    password: &str,
) -> StoreResult<User> {
    if password.len() < 6 {
        return Err(StoreError::Validation(vec![
            "Password must be at least 6 characters".to_string(),
        ]));
    }
    let existing = find_by_id(conn, user_id)?;
    if existing.registered {
        return Err(StoreError::Validation(vec![
            "Registration link already used".to_string(),
        ]));
    }

    let hash =
        auth::hash_password(password).map_err(|e| StoreError::Internal(e.to_string()))?;
    conn.execute(
        "UPDATE users
         SET password_hash = ?, registered = 1, registration_link = NULL,
             date_modified = ?
         WHERE id = ?",
        rusqlite::params![hash, now(), existing.id],
    )?;

    find_by_id(conn, user_id)
}

/// Seeds the configured superadmin so a fresh workspace is reachable.
pub fn ensure_default_admin(conn: &Connection, cfg: &Config) -> StoreResult<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE email = ?",
            [&cfg.admin_email],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Ok(());
    }

    let id = new_id();
    let hash = auth::hash_password(&cfg.admin_password)
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let ts = now();
    conn.execute(
        "INSERT INTO users(id, name, email, password_hash, avatar, role,
                           registered, date_created, date_modified)
         VALUES(?, ?, ?, ?, '', 'superadmin', 1, ?, ?)",
        rusqlite::params![id, cfg.admin_name, cfg.admin_email, hash, ts, ts],
    )?;
    Ok(())
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        avatar: row.get(3)?,
        // Unknown roles cannot be inserted; fall back to the least
        // privileged if a hand-edited workspace disagrees.
        role: Role::parse(&role_raw).unwrap_or(Role::Staff),
        registration_link: row.get(5)?,
        registered: row.get::<_, i64>(6)? != 0,
        date_created: row.get(7)?,
        date_modified: row.get(8)?,
    })
}
