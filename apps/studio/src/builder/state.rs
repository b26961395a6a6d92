use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Position;
use crate::storage::StorageError;

/// Where the builder is in the authoring flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderState {
    /// No template is being edited.
    Dashboard,
    /// Editing a template with the field palette visible.
    PaletteOpen,
    /// Editing a template.
    Building,
    /// A freshly dropped field awaits label, placeholder and width.
    ConfiguringField,
    /// Browsing previously saved templates.
    ListingSaved,
}

impl BuilderState {
    pub fn is_editing(self) -> bool {
        matches!(self, BuilderState::PaletteOpen | BuilderState::Building)
    }
}

/// What the pointer is currently dragging. One subject at most.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragSubject {
    #[default]
    None,
    /// A catalog descriptor id dragged from the palette.
    PaletteType(String),
    /// A field already placed on `page`.
    ExistingField { page: usize, field_id: String },
}

/// Drop location. With a `position`, existing fields are repositioned on the
/// canvas; without one they are reordered to `index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTarget {
    pub page: usize,
    pub index: usize,
    pub position: Option<Position>,
}

impl DropTarget {
    pub fn at_index(page: usize, index: usize) -> Self {
        Self {
            page,
            index,
            position: None,
        }
    }

    pub fn at_position(page: usize, position: Position) -> Self {
        Self {
            page,
            index: usize::MAX,
            position: Some(position),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Transport(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
