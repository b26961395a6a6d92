//! Template and filled-data collections on top of the Storage Port.
//!
//! Each collection lives under a single key as one JSON array and is always
//! written wholesale, so the last writer wins. A malformed document is
//! treated as an empty collection rather than an error. Individual template
//! entries that fail to decode are hidden from `list` but written back
//! verbatim on every save.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::grid::{decode_pages, encode_pages, CodecError};
use crate::model::{FilledTemplate, Template};
use crate::storage::{StorageError, StoragePort};

pub const TEMPLATES_KEY: &str = "form_templates";
pub const FILLED_KEY: &str = "filled_templates";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHeader {
    form_id: String,
    #[serde(default)]
    form_name: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

fn decode_template(entry: &Value) -> Result<Template, CodecError> {
    let header: StoredHeader = serde_json::from_value(entry.clone())?;
    let pages = match entry.get("pages") {
        Some(pages) => decode_pages(pages)?,
        None => Vec::new(),
    };
    Ok(Template {
        form_id: header.form_id,
        form_name: header.form_name,
        pages,
        created_at: header.created_at,
        updated_at: header.updated_at,
    })
}

fn encode_template(template: &Template) -> Result<Value, CodecError> {
    let mut value = serde_json::to_value(template)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("pages".to_string(), encode_pages(&template.pages)?);
    }
    Ok(value)
}

fn stored_form_id(entry: &Value) -> Option<&str> {
    entry.get("formId").and_then(Value::as_str)
}

/// Reads `key` as a JSON array, falling back to empty on absence or parse
/// failure.
async fn read_array(store: &dyn StoragePort, key: &str) -> Result<Vec<Value>, StorageError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("Stored '{key}' is not a valid JSON array, treating as empty: {e}");
            Ok(Vec::new())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TemplateRepository {
    store: Arc<dyn StoragePort>,
}

impl TemplateRepository {
    pub fn new(store: Arc<dyn StoragePort>) -> Self {
        Self { store }
    }

    /// All decodable templates. Entries that fail to decode are skipped.
    pub async fn list(&self) -> Result<Vec<Template>, StorageError> {
        let entries = read_array(self.store.as_ref(), TEMPLATES_KEY).await?;
        let mut templates = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            match decode_template(entry) {
                Ok(t) => templates.push(t),
                Err(e) => warn!("Skipping stored template #{i}: {e}"),
            }
        }
        Ok(templates)
    }

    pub async fn find(&self, form_id: &str) -> Result<Option<Template>, StorageError> {
        Ok(self.list().await?.into_iter().find(|t| t.form_id == form_id))
    }

    /// Replaces the stored collection with `templates`. Stored entries that
    /// do not decode are carried over unchanged unless one of `templates`
    /// has the same `formId`.
    pub async fn save_all(&self, templates: &[Template]) -> Result<(), StorageError> {
        let mut encoded = templates
            .iter()
            .map(encode_template)
            .collect::<Result<Vec<_>, _>>()?;

        let retained: Vec<Value> = read_array(self.store.as_ref(), TEMPLATES_KEY)
            .await?
            .into_iter()
            .filter(|entry| decode_template(entry).is_err())
            .filter(|entry| {
                !stored_form_id(entry).is_some_and(|id| templates.iter().any(|t| t.form_id == id))
            })
            .collect();
        if !retained.is_empty() {
            warn!("Keeping {} undecodable stored templates as-is", retained.len());
        }
        encoded.extend(retained);

        let body = serde_json::to_string(&encoded).map_err(CodecError::from)?;
        self.store.set(TEMPLATES_KEY, body).await?;
        info!("Stored {} templates", templates.len());
        Ok(())
    }

    /// Removes the entry with `form_id`, decodable or not. Returns `false`
    /// when nothing matched; the store is not written in that case.
    pub async fn remove(&self, form_id: &str) -> Result<bool, StorageError> {
        let mut entries = read_array(self.store.as_ref(), TEMPLATES_KEY).await?;
        let before = entries.len();
        entries.retain(|entry| stored_form_id(entry) != Some(form_id));
        if entries.len() == before {
            return Ok(false);
        }
        let body = serde_json::to_string(&entries).map_err(CodecError::from)?;
        self.store.set(TEMPLATES_KEY, body).await?;
        info!("Removed stored template {form_id}");
        Ok(true)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Filled instances
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FilledRepository {
    store: Arc<dyn StoragePort>,
}

impl FilledRepository {
    pub fn new(store: Arc<dyn StoragePort>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<FilledTemplate>, StorageError> {
        let entries = read_array(self.store.as_ref(), FILLED_KEY).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(filled) => Some(filled),
                Err(e) => {
                    warn!("Skipping stored filled instance: {e}");
                    None
                }
            })
            .collect())
    }

    pub async fn find(&self, instance_id: &str) -> Result<Option<FilledTemplate>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|f| f.instance_id == instance_id))
    }

    pub async fn save_all(&self, filled: &[FilledTemplate]) -> Result<(), StorageError> {
        let body = serde_json::to_string(filled).map_err(CodecError::from)?;
        self.store.set(FILLED_KEY, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{create_field, FieldType, Page};
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::collections::HashMap;

    fn template_with_grid(id: &str) -> Template {
        let mut grid = create_field(FieldType::DataGrid, "Grid");
        grid.grid_mut().unwrap().add_row();
        grid.grid_mut().unwrap().set_cell(1, 0, "x");
        Template {
            form_id: id.to_string(),
            form_name: "Inspection".to_string(),
            pages: vec![Page {
                fields: vec![grid],
            }],
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let repo = TemplateRepository::new(Arc::new(MemoryStorage::new()));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_collection_falls_back_to_empty() {
        let store = MemoryStorage::with_entry(TEMPLATES_KEY, "{not json");
        let repo = TemplateRepository::new(Arc::new(store));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_grids_are_stored_flat() {
        let store = Arc::new(MemoryStorage::new());
        let repo = TemplateRepository::new(store.clone());
        let template = template_with_grid("t-1");
        repo.save_all(&[template.clone()]).await.unwrap();

        let raw = store.get(TEMPLATES_KEY).await.unwrap().unwrap();
        let stored: Value = serde_json::from_str(&raw).unwrap();
        let matrix = &stored[0]["pages"][0]["fields"][0]["gridMatrix"];
        assert!(matrix.get("cells").is_none());
        assert_eq!(matrix["cellsFlat"].as_array().unwrap().len(), 2);

        let back = repo.find("t-1").await.unwrap().unwrap();
        assert_eq!(back, template);
    }

    #[tokio::test]
    async fn test_undecodable_entries_are_skipped() {
        let raw = json!([
            {"formId": "ok", "formName": "Ok", "pages": [{"fields": []}]},
            {"formName": "no id"},
            {"formId": "bad", "formName": "Bad", "pages": [{"fields": [{"id": "x", "type": "hologram"}]}]}
        ]);
        let store = MemoryStorage::with_entry(TEMPLATES_KEY, raw.to_string());
        let repo = TemplateRepository::new(Arc::new(store));
        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].form_id, "ok");
    }

    #[tokio::test]
    async fn test_undecodable_entries_survive_save_all() {
        let legacy = json!({
            "formId": "legacy",
            "formName": "Old photo form",
            "pages": [{"fields": [{"id": "x", "type": "image"}]}]
        });
        let store = Arc::new(MemoryStorage::with_entry(
            TEMPLATES_KEY,
            json!([legacy.clone()]).to_string(),
        ));
        let repo = TemplateRepository::new(store.clone());
        assert!(repo.list().await.unwrap().is_empty());

        let fresh = template_with_grid("t-1");
        repo.save_all(&[fresh.clone()]).await.unwrap();

        let raw = store.get(TEMPLATES_KEY).await.unwrap().unwrap();
        let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1], legacy);
        assert_eq!(repo.list().await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_save_all_replaces_undecodable_entry_with_same_id() {
        let legacy = json!({"formId": "t-1", "pages": [{"fields": [{"id": "x", "type": "image"}]}]});
        let store = Arc::new(MemoryStorage::with_entry(
            TEMPLATES_KEY,
            json!([legacy]).to_string(),
        ));
        let repo = TemplateRepository::new(store.clone());
        repo.save_all(&[template_with_grid("t-1")]).await.unwrap();

        let raw = store.get(TEMPLATES_KEY).await.unwrap().unwrap();
        let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["formName"], "Inspection");
    }

    #[tokio::test]
    async fn test_remove_works_on_undecodable_entries() {
        let raw = json!([
            {"formId": "legacy", "pages": [{"fields": [{"id": "x", "type": "image"}]}]},
            {"formId": "ok", "formName": "Ok", "pages": [{"fields": []}]}
        ]);
        let store = Arc::new(MemoryStorage::with_entry(TEMPLATES_KEY, raw.to_string()));
        let repo = TemplateRepository::new(store.clone());

        assert!(repo.remove("legacy").await.unwrap());
        assert!(!repo.remove("legacy").await.unwrap());
        let raw = store.get(TEMPLATES_KEY).await.unwrap().unwrap();
        let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["formId"], "ok");
    }

    #[tokio::test]
    async fn test_filled_repository_find() {
        let repo = FilledRepository::new(Arc::new(MemoryStorage::new()));
        let filled = FilledTemplate {
            instance_id: "i-1".to_string(),
            source_template_id: "t-1".to_string(),
            name: "Visit".to_string(),
            data: HashMap::from([("f".to_string(), json!(true))]),
        };
        repo.save_all(&[filled.clone()]).await.unwrap();
        assert_eq!(repo.find("i-1").await.unwrap(), Some(filled));
        assert_eq!(repo.find("i-2").await.unwrap(), None);
    }
}
