//! Static field-descriptor tables, one per entity type.
//!
//! List views use these to pick display columns, forms use them to decide
//! which inputs to render and which are required. Declared by hand rather
//! than introspected from the storage model so the wire contract cannot
//! drift with storage details.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Date,
    Number,
    Reference,
    Subrecords,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "subfields_empty")]
    pub subfields: &'static [FieldDescriptor],
}

fn subfields_empty(s: &&'static [FieldDescriptor]) -> bool {
    s.is_empty()
}

const fn field(name: &'static str, kind: FieldKind, required: bool) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind,
        required,
        subfields: &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Student,
    Teacher,
    Classroom,
    Location,
    User,
}

pub const GUARDIAN_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("middleName", FieldKind::String, false),
    field("surname", FieldKind::String, true),
    field("phoneNumber", FieldKind::String, true),
    field("address", FieldKind::String, true),
    field("email", FieldKind::String, false),
    field("relationshipToStudent", FieldKind::String, true),
];

pub const STUDENT_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("middleName", FieldKind::String, false),
    field("surname", FieldKind::String, true),
    field("dob", FieldKind::Date, true),
    field("address", FieldKind::String, true),
    field("phoneNumber", FieldKind::String, false),
    FieldDescriptor {
        name: "responsables",
        kind: FieldKind::Subrecords,
        required: true,
        subfields: GUARDIAN_FIELDS,
    },
    field("class", FieldKind::Reference, false),
    field("location", FieldKind::Reference, false),
];

pub const TEACHER_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("middleName", FieldKind::String, false),
    field("surname", FieldKind::String, true),
    field("dob", FieldKind::Date, true),
    field("address", FieldKind::String, true),
    field("phoneNumber", FieldKind::String, false),
    field("email", FieldKind::String, true),
    field("class", FieldKind::Reference, false),
    field("location", FieldKind::Reference, false),
];

pub const CLASSROOM_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("location", FieldKind::Reference, false),
];

pub const LOCATION_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("address", FieldKind::String, true),
    field("city", FieldKind::String, true),
    field("state", FieldKind::String, true),
    field("country", FieldKind::String, true),
    field("zipcode", FieldKind::String, true),
];

pub const USER_FIELDS: &[FieldDescriptor] = &[
    field("name", FieldKind::String, true),
    field("email", FieldKind::String, true),
    field("role", FieldKind::String, true),
    field("avatar", FieldKind::String, false),
];

pub fn field_types(entity: Entity) -> &'static [FieldDescriptor] {
    match entity {
        Entity::Student => STUDENT_FIELDS,
        Entity::Teacher => TEACHER_FIELDS,
        Entity::Classroom => CLASSROOM_FIELDS,
        Entity::Location => LOCATION_FIELDS,
        Entity::User => USER_FIELDS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entity_has_descriptors() {
        for entity in [
            Entity::Student,
            Entity::Teacher,
            Entity::Classroom,
            Entity::Location,
            Entity::User,
        ] {
            assert!(!field_types(entity).is_empty());
        }
    }

    #[test]
    fn only_responsables_carries_subfields() {
        for f in STUDENT_FIELDS {
            if f.name == "responsables" {
                assert_eq!(f.kind, FieldKind::Subrecords);
                assert_eq!(f.subfields.len(), GUARDIAN_FIELDS.len());
            } else {
                assert!(f.subfields.is_empty(), "{} has subfields", f.name);
            }
        }
    }

    #[test]
    fn serializes_with_type_key_and_nested_subfields() {
        let v = serde_json::to_value(STUDENT_FIELDS).expect("serialize");
        let fields = v.as_array().expect("array");
        assert_eq!(fields[0]["name"], "name");
        assert_eq!(fields[0]["type"], "string");
        assert_eq!(fields[0]["required"], true);
        assert!(fields[0].get("subfields").is_none());

        let resp = fields
            .iter()
            .find(|f| f["name"] == "responsables")
            .expect("responsables descriptor");
        assert_eq!(resp["type"], "subrecords");
        assert_eq!(
            resp["subfields"].as_array().expect("subfields").len(),
            GUARDIAN_FIELDS.len()
        );
    }

    #[test]
    fn status_is_not_a_declared_field() {
        // Status drives the approval workflow in route logic only; it is
        // never shown to schema-driven forms.
        assert!(STUDENT_FIELDS.iter().all(|f| f.name != "status"));
    }
}
