//! Field Catalog — the static palette of draggable field types.

use serde::Serialize;

use crate::model::{FieldType, FieldWidth};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub default_width: FieldWidth,
}

const fn descriptor(
    id: &'static str,
    label: &'static str,
    field_type: FieldType,
    default_width: FieldWidth,
) -> FieldDescriptor {
    FieldDescriptor {
        id,
        label,
        field_type,
        default_width,
    }
}

static CATALOG: &[FieldDescriptor] = &[
    descriptor("text", "text input", FieldType::Text, FieldWidth::Narrow),
    descriptor("textarea", "text area", FieldType::Textarea, FieldWidth::Medium),
    descriptor("number", "number", FieldType::Number, FieldWidth::Narrow),
    descriptor("email", "email", FieldType::Email, FieldWidth::Medium),
    descriptor("phone", "phone", FieldType::Phone, FieldWidth::Narrow),
    descriptor("date", "date", FieldType::Date, FieldWidth::Narrow),
    descriptor("project-name", "Project Name", FieldType::ProjectName, FieldWidth::Wide),
    descriptor("checkbox", "checkbox", FieldType::Checkbox, FieldWidth::Narrow),
    descriptor("radio", "radio group", FieldType::Radio, FieldWidth::Narrow),
    descriptor("select", "dropdown", FieldType::Select, FieldWidth::Narrow),
    descriptor("branch", "branch", FieldType::Branch, FieldWidth::Narrow),
    descriptor("signature", "signature", FieldType::Signature, FieldWidth::Medium),
    descriptor("data-grid", "data grid", FieldType::DataGrid, FieldWidth::Wide),
];

/// All palette entries in display order.
pub fn catalog() -> &'static [FieldDescriptor] {
    CATALOG
}

pub fn find_descriptor(id: &str) -> Option<&'static FieldDescriptor> {
    CATALOG.iter().find(|d| d.id == id)
}

pub fn descriptor_for_type(field_type: FieldType) -> Option<&'static FieldDescriptor> {
    CATALOG.iter().find(|d| d.field_type == field_type)
}

/// Upper-cases the first character of `label`.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
