// Builder Controller: the authoring state machine over the document model.

pub mod controller;
pub mod state;

pub use controller::{Builder, BuilderSettings};
pub use state::{BuilderError, BuilderState, DragSubject, DropTarget, Notice, NoticeLevel};
