pub mod health;
pub mod templates;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/catalog", get(templates::handle_catalog))
        .route(
            "/api/v1/templates",
            get(templates::handle_list_templates).post(templates::handle_save_template),
        )
        .route(
            "/api/v1/templates/:id",
            get(templates::handle_get_template).delete(templates::handle_delete_template),
        )
        .route("/api/v1/filled/:instance_id", get(templates::handle_get_filled))
        .with_state(state)
}
