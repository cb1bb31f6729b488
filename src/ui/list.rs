//! List/table state and schema-driven cell rendering.

use chrono::NaiveDate;
use serde_json::Value;

use crate::schema::{FieldDescriptor, FieldKind};
use crate::store::users::Role;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Page, filter and selection state for one entity list.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub page: u64,
    pub pages: u64,
    pub show_all: bool,
    pub location_filter: Option<String>,
    pub class_filter: Option<String>,
    pub selected: Option<String>,
}

impl ListState {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    /// Query string for the next fetch; `limit=0` requests everything.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("page", self.page.max(1).to_string()),
            (
                "limit",
                if self.show_all {
                    "0".to_string()
                } else {
                    DEFAULT_PAGE_SIZE.to_string()
                },
            ),
        ];
        if let Some(loc) = &self.location_filter {
            q.push(("location", loc.clone()));
        }
        if let Some(class) = &self.class_filter {
            q.push(("class", class.clone()));
        }
        q
    }

    /// Records the server's pagination answer, clamping the current page.
    pub fn apply_page_info(&mut self, page: u64, pages: u64) {
        self.pages = pages;
        self.page = page.clamp(1, pages.max(1));
    }

    pub fn next_page(&mut self) {
        if self.page < self.pages {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    /// Changing a filter restarts from the first page.
    pub fn set_filters(&mut self, location: Option<String>, class: Option<String>) {
        self.location_filter = location;
        self.class_filter = class;
        self.page = 1;
        self.selected = None;
    }

    pub fn select(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

/// What a row offers the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAffordance {
    /// Normal row: selectable, editable.
    Edit,
    /// Pending row seen by staff: marker only, no actions.
    Pending,
    /// Pending row seen by an admin: Approve and Reject.
    Moderate,
}

pub fn row_affordance(status: Option<&str>, viewer: Role) -> RowAffordance {
    if status != Some("pending") {
        return RowAffordance::Edit;
    }
    if viewer.is_admin() {
        RowAffordance::Moderate
    } else {
        RowAffordance::Pending
    }
}

/// Renders one cell value according to its field descriptor.
pub fn render_cell(field: &FieldDescriptor, value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match field.kind {
        FieldKind::Date => value.as_str().map(render_date).unwrap_or_default(),
        FieldKind::Reference => value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        FieldKind::Subrecords => value
            .as_array()
            .map(|list| {
                list.iter()
                    .map(render_subrecord)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default(),
        FieldKind::String | FieldKind::Number => match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

fn render_date(raw: &str) -> String {
    // Stored dates are YYYY-MM-DD; tolerate a full timestamp prefix.
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(d) => d.format("%m/%d/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn render_subrecord(record: &Value) -> String {
    let name = record.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let surname = record.get("surname").and_then(|v| v.as_str()).unwrap_or("");
    let relationship = record
        .get("relationshipToStudent")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    format!("{} {} ({})", name, surname, relationship)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::STUDENT_FIELDS;
    use serde_json::json;

    fn field(name: &str) -> &'static FieldDescriptor {
        STUDENT_FIELDS
            .iter()
            .find(|f| f.name == name)
            .expect("known student field")
    }

    #[test]
    fn dates_render_as_mm_dd_yyyy() {
        assert_eq!(
            render_cell(field("dob"), Some(&json!("2010-01-31"))),
            "01/31/2010"
        );
        assert_eq!(
            render_cell(field("dob"), Some(&json!("2010-01-31T00:00:00Z"))),
            "01/31/2010"
        );
    }

    #[test]
    fn references_render_their_display_name() {
        assert_eq!(
            render_cell(field("class"), Some(&json!({"_id": "c1", "name": "Room 4"}))),
            "Room 4"
        );
        assert_eq!(render_cell(field("class"), None), "");
    }

    #[test]
    fn guardians_render_name_surname_relationship() {
        let guardians = json!([
            {"name": "Bob", "surname": "Lee", "relationshipToStudent": "father"},
            {"name": "Ann", "surname": "Lee", "relationshipToStudent": "mother"},
        ]);
        assert_eq!(
            render_cell(field("responsables"), Some(&guardians)),
            "Bob Lee (father), Ann Lee (mother)"
        );
    }

    #[test]
    fn pending_rows_gate_on_role() {
        assert_eq!(
            row_affordance(Some("pending"), Role::Staff),
            RowAffordance::Pending
        );
        assert_eq!(
            row_affordance(Some("pending"), Role::Admin),
            RowAffordance::Moderate
        );
        assert_eq!(
            row_affordance(Some("pending"), Role::Superadmin),
            RowAffordance::Moderate
        );
        assert_eq!(row_affordance(Some("approved"), Role::Staff), RowAffordance::Edit);
        assert_eq!(row_affordance(None, Role::Staff), RowAffordance::Edit);
    }

    #[test]
    fn query_params_follow_filters_and_show_all() {
        let mut list = ListState::new();
        assert_eq!(
            list.query_params(),
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );

        list.set_filters(Some("loc-1".to_string()), None);
        list.show_all = true;
        let q = list.query_params();
        assert!(q.contains(&("limit", "0".to_string())));
        assert!(q.contains(&("location", "loc-1".to_string())));
    }

    #[test]
    fn page_navigation_clamps_to_bounds() {
        let mut list = ListState::new();
        list.apply_page_info(5, 3);
        assert_eq!(list.page, 3);

        list.next_page();
        assert_eq!(list.page, 3);

        list.prev_page();
        list.prev_page();
        list.prev_page();
        assert_eq!(list.page, 1);
    }
}
