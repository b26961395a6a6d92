//! Interactive resize of a field shell via edge and corner handles.
//!
//! A `ResizeSession` is created on pointer-down over a handle and carries all
//! state of the gesture; nothing is captured elsewhere. `finish` writes the
//! shell size back onto the field.

use serde::{Deserialize, Serialize};

use crate::grid::sync_cell_metrics;
use crate::model::{Field, Position, Size};

pub const MIN_SHELL_WIDTH: f64 = 180.0;
pub const MIN_SHELL_HEIGHT: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    Right,
    Bottom,
    BottomRight,
}

impl ResizeHandle {
    pub fn adjusts_width(self) -> bool {
        matches!(self, ResizeHandle::Right | ResizeHandle::BottomRight)
    }

    pub fn adjusts_height(self) -> bool {
        matches!(self, ResizeHandle::Bottom | ResizeHandle::BottomRight)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub field_id: String,
    pub handle: ResizeHandle,
    pub start_size: Size,
    pub start_pointer: Position,
    pub current: Size,
}

impl ResizeSession {
    pub fn begin(field: &Field, handle: ResizeHandle, pointer: Position) -> Self {
        Self {
            field_id: field.id.clone(),
            handle,
            start_size: field.size,
            start_pointer: pointer,
            current: field.size,
        }
    }

    /// Recomputes the shell size for the latest pointer position.
    pub fn update(&mut self, pointer: Position) -> Size {
        if self.handle.adjusts_width() {
            let dx = pointer.x - self.start_pointer.x;
            self.current.width = (self.start_size.width + dx).max(MIN_SHELL_WIDTH);
        }
        if self.handle.adjusts_height() {
            let dy = pointer.y - self.start_pointer.y;
            self.current.height = (self.start_size.height + dy).max(MIN_SHELL_HEIGHT);
        }
        self.current
    }

    /// Syncs the field's stored size to the shell size. Returns `false` when
    /// `field` is not the one this session was started on.
    pub fn finish(self, field: &mut Field) -> bool {
        if field.id != self.field_id {
            return false;
        }
        field.size = Size::new(self.current.width.round(), self.current.height.round());
        sync_cell_metrics(field);
        true
    }
}
