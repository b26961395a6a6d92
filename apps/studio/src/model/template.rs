use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::field::Field;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Page {
    pub fn position_of(&self, field_id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == field_id)
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }
}

/// A named, persisted collection of pages.
///
/// `Clone` is a full deep copy: every edit session works on its own clone so
/// the cached or stored copy is never aliased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub form_id: String,
    pub form_name: String,
    pub pages: Vec<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Template {
    pub fn field_count(&self) -> usize {
        self.pages.iter().map(|p| p.fields.len()).sum()
    }
}

/// A filled instance of a template, as kept by the filled-data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledTemplate {
    pub instance_id: String,
    pub source_template_id: String,
    pub name: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

/// Copies each filled value onto the matching field of `template`.
/// Values keyed by unknown field ids are ignored.
pub fn apply_filled(template: &mut Template, filled: &FilledTemplate) -> usize {
    let mut applied = 0;
    for field in template.pages.iter_mut().flat_map(|p| p.fields.iter_mut()) {
        if let Some(value) = filled.data.get(&field.id) {
            field.value = Some(value.clone());
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{create_field, FieldType};
    use serde_json::json;

    fn blank() -> Template {
        Template {
            form_id: "t-1".to_string(),
            form_name: String::new(),
            pages: vec![Page::default()],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_field_count_spans_pages() {
        let mut t = blank();
        assert_eq!(t.field_count(), 0);
        t.pages[0].fields.push(create_field(FieldType::Text, "Name"));
        t.pages.push(Page {
            fields: vec![create_field(FieldType::Signature, "Sign")],
        });
        assert_eq!(t.field_count(), 2);
    }

    #[test]
    fn test_clone_does_not_alias_pages() {
        let mut original = blank();
        original.pages[0].fields.push(create_field(FieldType::Text, "Name"));

        let mut copy = original.clone();
        copy.pages[0].fields[0].label = "Changed".to_string();
        copy.pages[0].fields.clear();

        assert_eq!(original.pages[0].fields.len(), 1);
        assert_eq!(original.pages[0].fields[0].label, "Name");
    }

    #[test]
    fn test_apply_filled_sets_matching_values() {
        let mut t = blank();
        let field = create_field(FieldType::Text, "Name");
        let id = field.id.clone();
        t.pages[0].fields.push(field);

        let filled = FilledTemplate {
            instance_id: "i-1".to_string(),
            source_template_id: "t-1".to_string(),
            name: "Site visit".to_string(),
            data: HashMap::from([
                (id.clone(), json!("Ada")),
                ("missing".to_string(), json!("ignored")),
            ]),
        };

        assert_eq!(apply_filled(&mut t, &filled), 1);
        assert_eq!(t.pages[0].field(&id).unwrap().value, Some(json!("Ada")));
    }
}
