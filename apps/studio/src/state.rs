use std::sync::Arc;

use crate::builder::{Builder, BuilderSettings};
use crate::config::Config;
use crate::storage::{FilledRepository, StoragePort, TemplateRepository};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub templates: TemplateRepository,
    pub filled: FilledRepository,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn StoragePort>) -> Self {
        Self {
            config,
            templates: TemplateRepository::new(store.clone()),
            filled: FilledRepository::new(store),
        }
    }

    /// A fresh builder session over the shared template store.
    pub fn builder(&self) -> Builder {
        Builder::new(self.templates.clone(), self.settings())
    }

    pub fn settings(&self) -> BuilderSettings {
        self.config.builder_settings()
    }
}
