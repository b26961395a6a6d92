//! Builder Controller — the interactive authoring state machine.
//!
//! Flow: palette → drag → drop → configure → commit, plus reorder, removal,
//! page navigation and save/load against the template repository.
//!
//! The edit buffer (`pages`) is always a private deep copy. It only reaches
//! the store through `save`, and a failed store call leaves it untouched.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builder::state::{
    BuilderError, BuilderState, DragSubject, DropTarget, Notice,
};
use crate::catalog::{capitalize, find_descriptor};
use crate::layout::{anchor_top_left, capture_layout, ResizeHandle, ResizeSession};
use crate::model::{create_field, Field, FieldType, Page, Position, Template};
use crate::signature::SignatureBoard;
use crate::storage::TemplateRepository;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuilderSettings {
    /// Device pixel ratio used when mounting signature pads.
    pub pixel_ratio: f64,
    pub anchor_padding: f64,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            anchor_padding: crate::layout::DEFAULT_ANCHOR_PADDING,
        }
    }
}

pub struct Builder {
    templates: TemplateRepository,
    settings: BuilderSettings,
    state: BuilderState,
    palette_open: bool,
    drag: DragSubject,
    pages: Vec<Page>,
    form_name: String,
    current_page: usize,
    /// Id of the stored template this buffer updates on save.
    current_id: Option<String>,
    pending: Option<Field>,
    saved: Vec<Template>,
    signatures: SignatureBoard,
    notices: Vec<Notice>,
}

impl Builder {
    pub fn new(templates: TemplateRepository, settings: BuilderSettings) -> Self {
        Self {
            templates,
            settings,
            state: BuilderState::Dashboard,
            palette_open: false,
            drag: DragSubject::None,
            pages: vec![Page::default()],
            form_name: String::new(),
            current_page: 0,
            current_id: None,
            pending: None,
            saved: Vec::new(),
            signatures: SignatureBoard::new(settings.pixel_ratio),
            notices: Vec::new(),
        }
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn palette_open(&self) -> bool {
        self.palette_open
    }

    pub fn drag_subject(&self) -> &DragSubject {
        &self.drag
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn pending_field(&self) -> Option<&Field> {
        self.pending.as_ref()
    }

    /// The field awaiting configuration (label, placeholder, width).
    pub fn pending_field_mut(&mut self) -> Option<&mut Field> {
        self.pending.as_mut()
    }

    /// A placed field, for in-place configuration edits.
    pub fn field_mut(&mut self, page: usize, field_id: &str) -> Option<&mut Field> {
        self.pages.get_mut(page)?.field_mut(field_id)
    }

    pub fn saved(&self) -> &[Template] {
        &self.saved
    }

    pub fn signatures(&self) -> &SignatureBoard {
        &self.signatures
    }

    pub fn signatures_mut(&mut self) -> &mut SignatureBoard {
        &mut self.signatures
    }

    /// Drains pending user-visible notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ── template lifecycle ──────────────────────────────────────────────────

    /// Starts a fresh, unsaved template with one empty page.
    pub fn new_template(&mut self) {
        self.reset_buffer();
        self.state = if self.palette_open {
            BuilderState::PaletteOpen
        } else {
            BuilderState::Building
        };
        info!("Started new template");
    }

    /// Replaces the edit buffer wholesale, keeping the current template id so
    /// a following `save` still updates in place.
    pub fn import_pages(&mut self, pages: Vec<Page>) {
        self.pages = if pages.is_empty() {
            vec![Page::default()]
        } else {
            pages
        };
        self.current_page = 0;
        self.pending = None;
        self.drag = DragSubject::None;
        self.state = BuilderState::Building;
        self.remount_signatures();
    }

    pub fn open_palette(&mut self) {
        self.palette_open = true;
        match self.state {
            BuilderState::Dashboard => {
                self.reset_buffer();
                self.state = BuilderState::PaletteOpen;
            }
            BuilderState::Building => self.state = BuilderState::PaletteOpen,
            _ => {}
        }
    }

    pub fn close_palette(&mut self) {
        self.palette_open = false;
        if self.state == BuilderState::PaletteOpen {
            self.state = BuilderState::Building;
        }
    }

    // ── drag and drop ───────────────────────────────────────────────────────

    pub fn drag_start_palette(&mut self, descriptor_id: &str) {
        self.drag = DragSubject::PaletteType(descriptor_id.to_string());
    }

    pub fn drag_start_field(&mut self, page: usize, field_id: &str) {
        self.drag = DragSubject::ExistingField {
            page,
            field_id: field_id.to_string(),
        };
    }

    /// Completes the pending drag. The drag subject is cleared whatever the
    /// outcome.
    pub fn drop(&mut self, target: DropTarget) -> Result<(), BuilderError> {
        match std::mem::take(&mut self.drag) {
            DragSubject::None => {
                debug!("Drop without a drag subject ignored");
                Ok(())
            }
            DragSubject::PaletteType(descriptor_id) => {
                self.drop_palette_type(&descriptor_id, target)
            }
            DragSubject::ExistingField { page, field_id } => {
                self.drop_existing_field(page, &field_id, target);
                Ok(())
            }
        }
    }

    fn drop_palette_type(
        &mut self,
        descriptor_id: &str,
        target: DropTarget,
    ) -> Result<(), BuilderError> {
        if !self.state.is_editing() {
            return self.fail(BuilderError::InvalidState(format!(
                "cannot add a field while {:?}",
                self.state
            )));
        }
        let Some(descriptor) = find_descriptor(descriptor_id) else {
            warn!("Dropped unknown palette type '{descriptor_id}'");
            return Ok(());
        };

        let label = match descriptor.field_type {
            FieldType::ProjectName => String::new(),
            _ => capitalize(descriptor.label),
        };
        let mut field = create_field(descriptor.field_type, label);
        if let Some(at) = target.position {
            field.position = clamp_position(at);
        }
        if target.page < self.pages.len() {
            self.go_to_page(target.page);
        }

        debug!("Configuring new {} field {}", descriptor.id, field.id);
        self.pending = Some(field);
        self.palette_open = false;
        self.state = BuilderState::ConfiguringField;
        Ok(())
    }

    fn drop_existing_field(&mut self, source_page: usize, field_id: &str, target: DropTarget) {
        if target.page >= self.pages.len() {
            return;
        }
        let Some(from) = self
            .pages
            .get(source_page)
            .and_then(|p| p.position_of(field_id))
        else {
            return;
        };

        let field = self.pages[source_page].fields.remove(from);
        let dest = &mut self.pages[target.page].fields;
        let index = match target.position {
            // Repositioning keeps sequence order unless the field changed page.
            Some(_) if source_page == target.page => from,
            Some(_) => dest.len(),
            None => target.index,
        };
        dest.insert(index.min(dest.len()), field);

        if let Some(at) = target.position {
            if let Some(field) = self.pages[target.page].field_mut(field_id) {
                field.position = clamp_position(at);
            }
        }
        // Pads are addressed by order, so any move can re-index them.
        self.remount_signatures();
    }

    // ── field configuration ─────────────────────────────────────────────────

    pub fn cancel_config(&mut self) {
        if self.state != BuilderState::ConfiguringField {
            return;
        }
        self.pending = None;
        self.state = BuilderState::Building;
    }

    /// Appends the configured field to the current page.
    pub fn commit_field(&mut self) -> Result<String, BuilderError> {
        let field = match (self.state, self.pending.take()) {
            (BuilderState::ConfiguringField, Some(field)) => field,
            _ => {
                return self.fail(BuilderError::InvalidState(
                    "no field is awaiting configuration".to_string(),
                ))
            }
        };
        let id = field.id.clone();
        self.pages[self.current_page].fields.push(field);
        self.state = BuilderState::Building;
        self.remount_signatures();
        Ok(id)
    }

    /// Removes a field by identity. No-op when absent.
    pub fn remove_field(&mut self, page: usize, field_id: &str) {
        let Some(p) = self.pages.get_mut(page) else {
            return;
        };
        let before = p.fields.len();
        p.fields.retain(|f| f.id != field_id);
        if p.fields.len() != before && page == self.current_page {
            self.remount_signatures();
        }
    }

    // ── geometry ────────────────────────────────────────────────────────────

    pub fn begin_resize(
        &self,
        page: usize,
        field_id: &str,
        handle: ResizeHandle,
        pointer: Position,
    ) -> Option<ResizeSession> {
        let field = self.pages.get(page)?.field(field_id)?;
        Some(ResizeSession::begin(field, handle, pointer))
    }

    pub fn finish_resize(&mut self, page: usize, session: ResizeSession) -> bool {
        let Some(field) = self
            .pages
            .get_mut(page)
            .and_then(|p| p.field_mut(&session.field_id))
        else {
            return false;
        };
        session.finish(field)
    }

    /// Pulls the current page's fields up to the anchor padding.
    pub fn anchor_current_page(&mut self) {
        let pad = self.settings.anchor_padding;
        anchor_top_left(&mut self.pages[self.current_page], pad);
    }

    // ── pages ───────────────────────────────────────────────────────────────

    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.go_to_page(self.pages.len() - 1)
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> usize {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    /// Clamps to the last page; never wraps.
    pub fn go_to_page(&mut self, index: usize) -> usize {
        let clamped = index.min(self.pages.len() - 1);
        if clamped != self.current_page {
            self.current_page = clamped;
            self.remount_signatures();
        }
        self.current_page
    }

    // ── persistence ─────────────────────────────────────────────────────────

    pub async fn load_list(&mut self) -> Result<&[Template], BuilderError> {
        let list = match self.templates.list().await {
            Ok(list) => list,
            Err(e) => return self.fail(e.into()),
        };
        info!("Loaded {} saved templates", list.len());
        self.saved = list;
        self.pending = None;
        self.drag = DragSubject::None;
        self.state = BuilderState::ListingSaved;
        Ok(&self.saved)
    }

    /// Opens a stored template for editing. On a miss the builder state is
    /// left exactly as it was.
    pub async fn load_by_id(&mut self, form_id: &str) -> Result<(), BuilderError> {
        let found = match self.templates.find(form_id).await {
            Ok(found) => found,
            Err(e) => return self.fail(e.into()),
        };
        let Some(template) = found else {
            return self.fail(BuilderError::NotFound(format!("Template {form_id} not found")));
        };

        self.pages = template.pages.clone();
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        self.form_name = template.form_name.clone();
        self.current_id = Some(template.form_id.clone());
        self.current_page = 0;
        self.pending = None;
        self.drag = DragSubject::None;
        self.state = if self.palette_open {
            BuilderState::PaletteOpen
        } else {
            BuilderState::Building
        };
        self.remount_signatures();
        info!("Editing template {form_id}");
        Ok(())
    }

    /// Validates and writes the buffer, updating in place when it came from a
    /// stored template. Returns the template id.
    pub async fn save(&mut self, form_name: &str) -> Result<String, BuilderError> {
        if self.pages.first().map_or(true, |p| p.fields.is_empty()) {
            return self.fail(BuilderError::Validation(
                "cannot save an empty form".to_string(),
            ));
        }
        let form_name = form_name.trim();
        if form_name.is_empty() {
            return self.fail(BuilderError::Validation(
                "a form name is required".to_string(),
            ));
        }

        let mut pages = self.pages.clone();
        capture_layout(&mut pages);

        let mut collection = match self.templates.list().await {
            Ok(list) => list,
            Err(e) => return self.fail(e.into()),
        };

        let now = Utc::now();
        let form_id = self
            .current_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut record = Template {
            form_id: form_id.clone(),
            form_name: form_name.to_string(),
            pages: pages.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        let field_count = record.field_count();
        match collection.iter_mut().find(|t| t.form_id == form_id) {
            Some(existing) => {
                record.created_at = existing.created_at.or(record.created_at);
                *existing = record;
            }
            None => collection.push(record),
        }

        if let Err(e) = self.templates.save_all(&collection).await {
            return self.fail(e.into());
        }

        info!(
            "Saved template {form_id} ({} pages, {field_count} fields)",
            pages.len()
        );
        self.pages = pages;
        self.form_name = form_name.to_string();
        self.current_id = Some(form_id.clone());
        self.saved = collection;
        self.notices.push(Notice::info("Template saved"));
        Ok(form_id)
    }

    pub async fn delete_template(&mut self, form_id: &str) -> Result<(), BuilderError> {
        let mut collection = match self.templates.list().await {
            Ok(list) => list,
            Err(e) => return self.fail(e.into()),
        };
        match self.templates.remove(form_id).await {
            Ok(true) => {}
            Ok(false) => {
                return self.fail(BuilderError::NotFound(format!("Template {form_id} not found")))
            }
            Err(e) => return self.fail(e.into()),
        }
        collection.retain(|t| t.form_id != form_id);
        if self.current_id.as_deref() == Some(form_id) {
            self.current_id = None;
        }
        self.saved = collection;
        info!("Deleted template {form_id}");
        Ok(())
    }

    // ── internal helpers ────────────────────────────────────────────────────

    fn reset_buffer(&mut self) {
        self.pages = vec![Page::default()];
        self.form_name.clear();
        self.current_page = 0;
        self.current_id = None;
        self.pending = None;
        self.drag = DragSubject::None;
        self.remount_signatures();
    }

    fn remount_signatures(&mut self) {
        let page = &self.pages[self.current_page];
        self.signatures.remount(page);
    }

    fn fail<T>(&mut self, err: BuilderError) -> Result<T, BuilderError> {
        warn!("Builder operation failed: {err}");
        self.notices.push(Notice::error(err.to_string()));
        Err(err)
    }
}

fn clamp_position(at: Position) -> Position {
    Position::new(at.x.round().max(0.0), at.y.round().max(0.0))
}
