// Template Document Model: fields, pages, templates and their geometry.

pub mod field;
pub mod geometry;
pub mod template;

pub use field::{
    create_field, Cell, CellItem, Field, FieldKind, FieldOption, FieldType, FieldWidth, GridMatrix,
};
pub use geometry::{Position, Size};
pub use template::{apply_filled, FilledTemplate, Page, Template};
