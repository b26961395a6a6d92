// Layout Engine: page-level geometry normalization and interactive resize.

pub mod engine;
pub mod resize;

pub use engine::{anchor_top_left, capture_layout, DEFAULT_ANCHOR_PADDING};
pub use resize::{ResizeHandle, ResizeSession};
