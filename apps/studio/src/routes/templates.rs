use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{catalog, FieldDescriptor};
use crate::errors::AppError;
use crate::grid::decode_pages;
use crate::model::{apply_filled, Template};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateRequest {
    /// Present when updating an existing template.
    pub form_id: Option<String>,
    pub form_name: String,
    /// Pages in either the nested or the stored (flattened) grid form.
    pub pages: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateResponse {
    pub form_id: String,
}

/// GET /api/v1/catalog
pub async fn handle_catalog() -> Json<&'static [FieldDescriptor]> {
    Json(catalog())
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.templates.list().await?))
}

/// GET /api/v1/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .templates
        .find(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))?;
    Ok(Json(template))
}

/// POST /api/v1/templates
pub async fn handle_save_template(
    State(state): State<AppState>,
    Json(req): Json<SaveTemplateRequest>,
) -> Result<(StatusCode, Json<SaveTemplateResponse>), AppError> {
    let pages = decode_pages(&req.pages)?;

    let mut builder = state.builder();
    let status = match req.form_id.as_deref() {
        Some(id) => {
            builder.load_by_id(id).await?;
            StatusCode::OK
        }
        None => {
            builder.new_template();
            StatusCode::CREATED
        }
    };
    builder.import_pages(pages);
    let form_id = builder.save(&req.form_name).await?;

    Ok((status, Json(SaveTemplateResponse { form_id })))
}

/// DELETE /api/v1/templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.builder().delete_template(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/filled/:instance_id
/// The source template with the instance's values applied to its fields.
pub async fn handle_get_filled(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<Json<Template>, AppError> {
    let filled = state
        .filled
        .find(&instance_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Filled form {instance_id} not found")))?;
    let mut template = state
        .templates
        .find(&filled.source_template_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Template {} not found", filled.source_template_id))
        })?;
    apply_filled(&mut template, &filled);
    Ok(Json(template))
}
