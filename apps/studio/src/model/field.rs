use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::model::geometry::{Position, Size};

// ────────────────────────────────────────────────────────────────────────────
// Field width
// ────────────────────────────────────────────────────────────────────────────

/// Column width a field occupies in the sequence layout.
///
/// Stored as a string (`"150"`, `"300"`, `"400"`). Numeric input and
/// off-grid values are snapped to the nearest allowed width that fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldWidth {
    #[default]
    Narrow,
    Medium,
    Wide,
}

impl FieldWidth {
    pub fn px(self) -> u32 {
        match self {
            FieldWidth::Narrow => 150,
            FieldWidth::Medium => 300,
            FieldWidth::Wide => 400,
        }
    }

    pub fn from_px(px: u64) -> Self {
        match px {
            0..=150 => FieldWidth::Narrow,
            151..=300 => FieldWidth::Medium,
            _ => FieldWidth::Wide,
        }
    }
}

impl Serialize for FieldWidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.px().to_string())
    }
}

impl<'de> Deserialize<'de> for FieldWidth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(px) => Ok(FieldWidth::from_px(px)),
            Raw::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(FieldWidth::from_px)
                .map_err(|_| serde::de::Error::custom(format!("invalid field width '{s}'"))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Field types
// ────────────────────────────────────────────────────────────────────────────

/// The type tag of a field, without any per-kind payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Date,
    ProjectName,
    Checkbox,
    Radio,
    Select,
    Branch,
    Signature,
    DataGrid,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::ProjectName => "project-name",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Select => "select",
            FieldType::Branch => "branch",
            FieldType::Signature => "signature",
            FieldType::DataGrid => "data-grid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Branches offered by every new `branch` field.
pub const BRANCH_OPTIONS: &[(&str, &str)] = &[
    ("nsw", "NSW"),
    ("sydney-metro", "Sydney Metro Branch"),
    ("hunter-valley", "Hunter Valley Branch"),
];

/// Per-kind payload of a field. The JSON `type` attribute is the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Date,
    ProjectName,
    Checkbox {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Radio {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Select {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Branch {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Signature,
    DataGrid {
        #[serde(rename = "gridMatrix")]
        grid_matrix: GridMatrix,
    },
}

impl FieldKind {
    /// Default payload for a freshly created field of `field_type`.
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => FieldKind::Text,
            FieldType::Textarea => FieldKind::Textarea,
            FieldType::Number => FieldKind::Number,
            FieldType::Email => FieldKind::Email,
            FieldType::Phone => FieldKind::Phone,
            FieldType::Date => FieldKind::Date,
            FieldType::ProjectName => FieldKind::ProjectName,
            FieldType::Checkbox => FieldKind::Checkbox { options: vec![] },
            FieldType::Radio => FieldKind::Radio { options: vec![] },
            FieldType::Select => FieldKind::Select { options: vec![] },
            FieldType::Branch => FieldKind::Branch {
                options: BRANCH_OPTIONS
                    .iter()
                    .map(|(value, label)| FieldOption::new(*value, *label))
                    .collect(),
            },
            FieldType::Signature => FieldKind::Signature,
            FieldType::DataGrid => FieldKind::DataGrid {
                grid_matrix: GridMatrix::new(1, 1),
            },
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text => FieldType::Text,
            FieldKind::Textarea => FieldType::Textarea,
            FieldKind::Number => FieldType::Number,
            FieldKind::Email => FieldType::Email,
            FieldKind::Phone => FieldType::Phone,
            FieldKind::Date => FieldType::Date,
            FieldKind::ProjectName => FieldType::ProjectName,
            FieldKind::Checkbox { .. } => FieldType::Checkbox,
            FieldKind::Radio { .. } => FieldType::Radio,
            FieldKind::Select { .. } => FieldType::Select,
            FieldKind::Branch { .. } => FieldType::Branch,
            FieldKind::Signature => FieldType::Signature,
            FieldKind::DataGrid { .. } => FieldType::DataGrid,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grid matrix
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_GRID_GAP: u32 = 12;
pub const DEFAULT_CELL_HEIGHT: u32 = 140;
/// Upper bound on `rows` and `cols`. Every matrix has between 1 and this many
/// of each.
pub const MAX_GRID_DIM: usize = 100;

fn default_gap() -> u32 {
    DEFAULT_GRID_GAP
}

fn default_cell_height() -> u32 {
    DEFAULT_CELL_HEIGHT
}

fn default_true() -> bool {
    true
}

fn default_item_type() -> String {
    "text".to_string()
}

/// A nested mini-field living inside a grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub items: Vec<CellItem>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.items.is_empty()
    }
}

/// Row/column cell structure of a `data-grid` field, indexed `cells[row][col]`.
///
/// `cell_width`/`cell_height` are a cache of the derived pixel sizes; the
/// source of truth is the field's size plus `gap`, `rows` and `cols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMatrix {
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_gap")]
    pub gap: u32,
    #[serde(default)]
    pub cell_width: u32,
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,
    #[serde(default = "default_true")]
    pub show_borders: bool,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub cells: Vec<Vec<Cell>>,
}

impl GridMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.clamp(1, MAX_GRID_DIM);
        let cols = cols.clamp(1, MAX_GRID_DIM);
        Self {
            rows,
            cols,
            gap: DEFAULT_GRID_GAP,
            cell_width: 0,
            cell_height: DEFAULT_CELL_HEIGHT,
            show_borders: true,
            headers: (1..=cols).map(column_header).collect(),
            cells: vec![vec![Cell::default(); cols]; rows],
        }
    }
}

/// Default header text for the 1-based column `n`.
pub fn column_header(n: usize) -> String {
    format!("Col {n}")
}

// ────────────────────────────────────────────────────────────────────────────
// Field
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub width: FieldWidth,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    /// Filled-in value; only present when a filled instance was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn options(&self) -> Option<&[FieldOption]> {
        match &self.kind {
            FieldKind::Checkbox { options }
            | FieldKind::Radio { options }
            | FieldKind::Select { options }
            | FieldKind::Branch { options } => Some(options),
            _ => None,
        }
    }

    pub fn grid(&self) -> Option<&GridMatrix> {
        match &self.kind {
            FieldKind::DataGrid { grid_matrix } => Some(grid_matrix),
            _ => None,
        }
    }

    pub fn grid_mut(&mut self) -> Option<&mut GridMatrix> {
        match &mut self.kind {
            FieldKind::DataGrid { grid_matrix } => Some(grid_matrix),
            _ => None,
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self.kind, FieldKind::Signature)
    }
}

fn default_size(field_type: FieldType, width: FieldWidth) -> Size {
    match field_type {
        FieldType::Signature => Size::new(300.0, 150.0),
        FieldType::DataGrid => Size::new(480.0, 240.0),
        FieldType::Textarea => Size::new(300.0, 120.0),
        _ => Size::new(f64::from(width.px()), 60.0),
    }
}

/// Creates a new field of `field_type` with a fresh id, the palette's default
/// width and the matching default geometry.
pub fn create_field(field_type: FieldType, label: impl Into<String>) -> Field {
    let width = crate::catalog::descriptor_for_type(field_type)
        .map_or_else(FieldWidth::default, |d| d.default_width);
    let mut field = Field {
        id: Uuid::new_v4().to_string(),
        label: label.into(),
        placeholder: String::new(),
        width,
        position: Position::default(),
        size: default_size(field_type, width),
        value: None,
        kind: FieldKind::for_type(field_type),
    };
    crate::grid::editor::sync_cell_metrics(&mut field);
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_field_assigns_unique_ids() {
        let a = create_field(FieldType::Text, "Name");
        let b = create_field(FieldType::Text, "Name");
        assert_ne!(a.id, b.id);
        assert_eq!(a.width, FieldWidth::Narrow);
        assert!(a.placeholder.is_empty());
    }

    #[test]
    fn test_branch_field_is_prepopulated() {
        let field = create_field(FieldType::Branch, "Branch");
        let options = field.options().unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].label, "NSW");
    }

    #[test]
    fn test_grid_field_starts_one_by_one() {
        let field = create_field(FieldType::DataGrid, "Grid");
        let grid = field.grid().unwrap();
        assert_eq!((grid.rows, grid.cols), (1, 1));
        assert_eq!(grid.headers, vec!["Col 1".to_string()]);
        assert!(grid.cell_width > 0);
    }

    #[test]
    fn test_field_json_uses_type_tag() {
        let field = create_field(FieldType::Signature, "Sign here");
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "signature");
        assert_eq!(value["width"], "150");

        let back: Field = serde_json::from_value(value).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_width_accepts_numbers_and_strings() {
        let from_num: FieldWidth = serde_json::from_value(json!(300)).unwrap();
        let from_str: FieldWidth = serde_json::from_value(json!("400")).unwrap();
        assert_eq!(from_num, FieldWidth::Medium);
        assert_eq!(from_str, FieldWidth::Wide);
        assert!(serde_json::from_value::<FieldWidth>(json!("wide")).is_err());
    }

    #[test]
    fn test_legacy_field_without_geometry_deserializes() {
        let field: Field = serde_json::from_value(json!({
            "id": "f-1",
            "label": "Branch",
            "type": "branch",
            "options": [{"value": "nsw", "label": "NSW"}]
        }))
        .unwrap();
        assert_eq!(field.field_type(), FieldType::Branch);
        assert_eq!(field.position, Position::default());
    }
}
