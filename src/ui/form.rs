//! Per-form state: one explicit `{values, dirty, errors}` object per open
//! card, composed into the page that owns it.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::schema::{FieldDescriptor, FieldKind, GUARDIAN_FIELDS};
use crate::store::students::{MAX_GUARDIANS, MIN_GUARDIANS};

/// Fields never rendered as inputs: identifier, version marker and
/// timestamps come from the server, not the form.
const INTERNAL_FIELDS: &[&str] = &["_id", "__v", "dateCreated", "dateModified"];

/// What closing the card should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Nothing unsaved; close immediately.
    Close,
    /// Unsaved edits; the shell prompts save-and-close or discard.
    ConfirmClose,
}

#[derive(Debug, Clone)]
pub struct FormState {
    fields: &'static [FieldDescriptor],
    values: BTreeMap<String, Value>,
    dirty: bool,
    errors: Vec<String>,
}

impl FormState {
    /// An edit card, pre-filled from the selected entity. Sub-record
    /// fields are owned by the guardian editor, not rendered as inputs.
    pub fn edit(fields: &'static [FieldDescriptor], entity: &Value) -> Self {
        let mut values = BTreeMap::new();
        for f in visible_fields(fields) {
            if let Some(v) = entity.get(f.name) {
                if !v.is_null() {
                    values.insert(f.name.to_string(), v.clone());
                }
            }
        }
        Self {
            fields,
            values,
            dirty: false,
            errors: Vec::new(),
        }
    }

    /// An empty add card.
    pub fn add(fields: &'static [FieldDescriptor]) -> Self {
        Self {
            fields,
            values: BTreeMap::new(),
            dirty: false,
            errors: Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if value.is_null() {
            self.values.remove(name);
        } else {
            self.values.insert(name.to_string(), value);
        }
        self.dirty = true;
    }

    /// Reference inputs keep both the id and the display name so the list
    /// can render the row without a second fetch.
    pub fn set_reference(&mut self, name: &str, id: &str, display_name: &str) {
        self.set(name, json!({ "_id": id, "name": display_name }));
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Validates required fields; blocks submission when any is empty.
    /// On success returns the payload and clears the dirty flag.
    pub fn submit(&mut self) -> Result<Value, Vec<String>> {
        self.errors = visible_fields(self.fields)
            .filter(|f| f.required && is_empty(self.values.get(f.name)))
            .map(|f| format!("{} is required", f.name))
            .collect();
        if !self.errors.is_empty() {
            return Err(self.errors.clone());
        }

        let payload = Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<_, _>>(),
        );
        self.dirty = false;
        Ok(payload)
    }

    pub fn request_close(&self) -> CloseOutcome {
        if self.dirty {
            CloseOutcome::ConfirmClose
        } else {
            CloseOutcome::Close
        }
    }

    /// Confirmed discard: edits are dropped and the card closes clean.
    pub fn discard(&mut self) {
        self.dirty = false;
        self.errors.clear();
    }
}

fn visible_fields(
    fields: &'static [FieldDescriptor],
) -> impl Iterator<Item = &'static FieldDescriptor> {
    fields
        .iter()
        .filter(|f| !INTERNAL_FIELDS.contains(&f.name) && f.kind != FieldKind::Subrecords)
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.get("_id").map_or(true, |id| {
            id.as_str().map_or(true, |s| s.trim().is_empty())
        }),
        Some(_) => false,
    }
}

/// Tabbed guardian sub-editor: one tab per guardian, edits applied to an
/// in-memory array that the owning form submits wholesale.
#[derive(Debug, Clone)]
pub struct GuardianEditor {
    guardians: Vec<Value>,
    active_tab: usize,
}

impl GuardianEditor {
    pub fn new(existing: &[Value]) -> Self {
        Self {
            guardians: existing.to_vec(),
            active_tab: 0,
        }
    }

    pub fn guardians(&self) -> &[Value] {
        &self.guardians
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    pub fn select_tab(&mut self, idx: usize) {
        if idx < self.guardians.len() {
            self.active_tab = idx;
        }
    }

    /// Appends a guardian after validating its required fields. Capped at
    /// two guardians per student.
    pub fn add(&mut self, guardian: Value) -> Result<(), Vec<String>> {
        if self.guardians.len() >= MAX_GUARDIANS {
            return Err(vec!["A student can have at most two guardians".to_string()]);
        }
        let errors: Vec<String> = GUARDIAN_FIELDS
            .iter()
            .filter(|f| f.required && is_empty(guardian.get(f.name)))
            .map(|f| format!("{} is required", f.name))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }
        self.guardians.push(guardian);
        self.active_tab = self.guardians.len() - 1;
        Ok(())
    }

    pub fn set_field(&mut self, tab: usize, name: &str, value: Value) {
        if let Some(Value::Object(g)) = self.guardians.get_mut(tab) {
            g.insert(name.to_string(), value);
        }
    }

    /// Removing the last remaining guardian is refused: every student
    /// keeps at least one.
    pub fn remove(&mut self, idx: usize) -> Result<(), String> {
        if idx >= self.guardians.len() {
            return Err("No such guardian".to_string());
        }
        if self.guardians.len() <= MIN_GUARDIANS {
            return Err("A student must have at least one guardian".to_string());
        }
        self.guardians.remove(idx);
        if self.active_tab >= self.guardians.len() {
            self.active_tab = self.guardians.len() - 1;
        }
        Ok(())
    }
}
