//! Storage Codec — grid flatten / rehydrate for stores that reject nested arrays.
//!
//! # Stored shape
//! A canonical grid field carries `gridMatrix.cells` as `[[Cell]]`. Before it
//! reaches the store, that nested form is replaced by
//!
//! ```json
//! "cellsFlat": [{"row": 0, "col": 0, "cell": {"items": []}}, ...]
//! ```
//!
//! in row-major order. `rehydrate_pages` rebuilds a fresh `rows × cols`
//! matrix from it. This shape is the on-disk contract for existing templates.

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::field::{column_header, DEFAULT_CELL_HEIGHT, DEFAULT_GRID_GAP, MAX_GRID_DIM};
use crate::model::Page;

pub const GRID_TYPE: &str = "data-grid";
const FLAT_KEY: &str = "cellsFlat";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("grid {field_id} is {rows}x{cols}; at most {max} rows and columns are allowed", max = MAX_GRID_DIM)]
    GridTooLarge {
        field_id: String,
        rows: u64,
        cols: u64,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Typed entry points
// ────────────────────────────────────────────────────────────────────────────

/// Serializes pages into their stored JSON form (normalized + flattened).
pub fn encode_pages(pages: &[Page]) -> Result<Value, CodecError> {
    let value = serde_json::to_value(pages)?;
    check_grid_dims(&value)?;
    Ok(flatten_pages(&normalize_for_save(&value)))
}

/// Parses stored pages, accepting both flattened and legacy nested grids.
pub fn decode_pages(stored: &Value) -> Result<Vec<Page>, CodecError> {
    check_grid_dims(stored)?;
    let value = normalize_for_save(&rehydrate_pages(stored));
    Ok(serde_json::from_value(value)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Flatten / rehydrate
// ────────────────────────────────────────────────────────────────────────────

/// Rejects any grid field whose declared `rows`/`cols` or nested `cells`
/// exceed [`MAX_GRID_DIM`].
pub fn check_grid_dims(pages: &Value) -> Result<(), CodecError> {
    let fields = pages
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|page| page.get("fields").and_then(Value::as_array))
        .flatten();
    for field in fields.filter(|f| is_grid_field(f)) {
        let Some(matrix) = field.get("gridMatrix") else {
            continue;
        };
        let nested = matrix.get("cells").and_then(Value::as_array);
        let count = |key: &str, fallback: u64| {
            matrix.get(key).and_then(Value::as_u64).unwrap_or(fallback)
        };
        let rows = count("rows", nested.map_or(0, |r| r.len() as u64));
        let cols = count(
            "cols",
            nested
                .and_then(|r| r.iter().filter_map(Value::as_array).map(Vec::len).max())
                .unwrap_or(0) as u64,
        );
        if rows > MAX_GRID_DIM as u64 || cols > MAX_GRID_DIM as u64 {
            return Err(CodecError::GridTooLarge {
                field_id: field
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                rows,
                cols,
            });
        }
    }
    Ok(())
}

/// Returns a copy of `pages` with every nested grid replaced by its flat form.
/// Fields without a 2-D `cells` array are left untouched.
pub fn flatten_pages(pages: &Value) -> Value {
    let mut out = pages.clone();
    for field in fields_mut(&mut out) {
        if !is_grid_field(field) {
            continue;
        }
        let Some(matrix) = field.get_mut("gridMatrix").and_then(Value::as_object_mut) else {
            continue;
        };
        let is_nested = matches!(
            matrix.get("cells"),
            Some(Value::Array(rows)) if rows.iter().all(Value::is_array)
        );
        if !is_nested {
            continue;
        }
        let Some(Value::Array(rows)) = matrix.remove("cells") else {
            continue;
        };

        let mut flat = Vec::new();
        for (r, row) in rows.into_iter().enumerate() {
            if let Value::Array(cols) = row {
                for (c, cell) in cols.into_iter().enumerate() {
                    flat.push(json!({ "row": r, "col": c, "cell": cell }));
                }
            }
        }
        debug!("Flattened {} grid cells", flat.len());
        matrix.insert(FLAT_KEY.to_string(), Value::Array(flat));
    }
    out
}

/// Inverse of [`flatten_pages`]. Entries addressed outside `rows × cols` are
/// dropped. Counts are clamped into `1..=MAX_GRID_DIM`.
pub fn rehydrate_pages(pages: &Value) -> Value {
    let mut out = pages.clone();
    for field in fields_mut(&mut out) {
        if !is_grid_field(field) {
            continue;
        }
        let Some(matrix) = field.get_mut("gridMatrix").and_then(Value::as_object_mut) else {
            continue;
        };
        let (Some(rows), Some(cols)) = (
            matrix.get("rows").and_then(Value::as_u64),
            matrix.get("cols").and_then(Value::as_u64),
        ) else {
            continue;
        };
        let Some(Value::Array(flat)) = matrix.get(FLAT_KEY).cloned() else {
            continue;
        };

        let clamp = |n: u64| n.clamp(1, MAX_GRID_DIM as u64) as usize;
        let (rows, cols) = (clamp(rows), clamp(cols));
        matrix.insert("rows".to_string(), json!(rows));
        matrix.insert("cols".to_string(), json!(cols));
        let mut cells = vec![vec![empty_cell(); cols]; rows];
        for entry in flat {
            let r = entry.get("row").and_then(Value::as_u64).map(|v| v as usize);
            let c = entry.get("col").and_then(Value::as_u64).map(|v| v as usize);
            if let (Some(r), Some(c)) = (r, c) {
                if r < rows && c < cols {
                    cells[r][c] = entry.get("cell").cloned().unwrap_or_else(empty_cell);
                }
            }
        }

        matrix.remove(FLAT_KEY);
        matrix.insert(
            "cells".to_string(),
            Value::Array(cells.into_iter().map(Value::Array).collect()),
        );
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// True for `data-grid`, `datagrid`, `grid`, `matrix` in any case, with any
/// `-`, `_` or space separators.
pub fn is_grid_type(raw: &str) -> bool {
    let squashed: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    matches!(squashed.as_str(), "datagrid" | "grid" | "matrix")
}

/// Coerces legacy grid-like fields into canonical `data-grid` fields with a
/// well-formed `gridMatrix`, and normalizes every cell's sub-items.
pub fn normalize_for_save(pages: &Value) -> Value {
    let mut out = pages.clone();
    for field in fields_mut(&mut out) {
        if !is_grid_field(field) {
            continue;
        }
        let Some(obj) = field.as_object_mut() else {
            continue;
        };
        obj.insert("type".to_string(), Value::String(GRID_TYPE.to_string()));
        let matrix = obj
            .remove("gridMatrix")
            .and_then(|m| match m {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();
        obj.insert("gridMatrix".to_string(), Value::Object(normalize_matrix(matrix)));
    }
    out
}

fn normalize_matrix(mut m: Map<String, Value>) -> Map<String, Value> {
    let flat_form = m.get(FLAT_KEY).is_some_and(Value::is_array);
    let nested: Vec<Vec<Value>> = match m.remove("cells") {
        Some(Value::Array(rows)) => rows
            .into_iter()
            .map(|row| match row {
                Value::Array(cols) => cols,
                _ => Vec::new(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let longest_row = nested.iter().map(Vec::len).max().unwrap_or(0);
    let rows = m
        .get("rows")
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(nested.len())
        .clamp(1, MAX_GRID_DIM);
    let cols = m
        .get("cols")
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(longest_row)
        .clamp(1, MAX_GRID_DIM);

    m.insert("rows".to_string(), json!(rows));
    m.insert("cols".to_string(), json!(cols));
    set_default(&mut m, "gap", json!(DEFAULT_GRID_GAP));
    set_default(&mut m, "cellHeight", json!(DEFAULT_CELL_HEIGHT));
    set_default(&mut m, "cellWidth", json!(0));
    set_default(&mut m, "showBorders", json!(true));

    let mut headers: Vec<Value> = match m.remove("headers") {
        Some(Value::Array(h)) => h
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Value::String(s),
                Value::Null => Value::String(String::new()),
                other => Value::String(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    };
    headers.truncate(cols);
    while headers.len() < cols {
        headers.push(Value::String(column_header(headers.len() + 1)));
    }
    m.insert("headers".to_string(), Value::Array(headers));

    if flat_form {
        // Already flattened: normalize the entries in place.
        if let Some(Value::Array(flat)) = m.get_mut(FLAT_KEY) {
            for entry in flat.iter_mut() {
                if let Some(cell) = entry.get_mut("cell") {
                    *cell = normalize_cell(cell.take());
                }
            }
        }
        return m;
    }

    let mut rows_out = Vec::with_capacity(rows);
    let mut source = nested.into_iter();
    for _ in 0..rows {
        let mut row = source.next().unwrap_or_default();
        row.truncate(cols);
        let mut row: Vec<Value> = row.into_iter().map(normalize_cell).collect();
        while row.len() < cols {
            row.push(empty_cell());
        }
        rows_out.push(Value::Array(row));
    }
    m.insert("cells".to_string(), Value::Array(rows_out));
    m
}

fn normalize_cell(cell: Value) -> Value {
    match cell {
        Value::Null => empty_cell(),
        Value::Object(mut obj) => {
            let items = match obj.remove("items") {
                Some(Value::Array(items)) => items.into_iter().map(normalize_item).collect(),
                _ => Vec::new(),
            };
            match obj.remove("value") {
                Some(Value::String(s)) if !s.is_empty() => {
                    obj.insert("value".to_string(), Value::String(s));
                }
                Some(Value::Null) | Some(Value::String(_)) | None => {}
                Some(other) => {
                    obj.insert("value".to_string(), Value::String(other.to_string()));
                }
            }
            obj.insert("items".to_string(), Value::Array(items));
            Value::Object(obj)
        }
        Value::String(s) if s.is_empty() => empty_cell(),
        Value::String(s) => json!({ "value": s, "items": [] }),
        other => json!({ "value": other.to_string(), "items": [] }),
    }
}

fn normalize_item(item: Value) -> Value {
    let Value::Object(mut obj) = item else {
        return item;
    };
    let is_checkbox = obj
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
    if !obj.contains_key("value") {
        let default = if is_checkbox { json!([]) } else { Value::Null };
        obj.insert("value".to_string(), default);
    }
    if let Some(Value::Array(options)) = obj.remove("options") {
        let normalized = options.into_iter().filter_map(normalize_option).collect();
        obj.insert("options".to_string(), Value::Array(normalized));
    }
    Value::Object(obj)
}

/// Accepts `"a"`, `{"value": "a"}`, `{"label": "A"}` or both keys.
fn normalize_option(option: Value) -> Option<Value> {
    let text = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };
    match option {
        Value::Object(obj) => {
            let value = obj.get("value").and_then(text);
            let label = obj.get("label").and_then(text);
            match (value, label) {
                (Some(v), Some(l)) => Some(json!({ "label": l, "value": v })),
                (Some(v), None) => Some(json!({ "label": v, "value": v })),
                (None, Some(l)) => Some(json!({ "label": l, "value": l })),
                (None, None) => None,
            }
        }
        Value::Null => None,
        other => text(&other).map(|s| json!({ "label": s, "value": s })),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

fn empty_cell() -> Value {
    json!({ "items": [] })
}

fn set_default(m: &mut Map<String, Value>, key: &str, value: Value) {
    if !m.get(key).is_some_and(|v| !v.is_null()) {
        m.insert(key.to_string(), value);
    }
}

fn is_grid_field(field: &Value) -> bool {
    field
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(is_grid_type)
}

/// Every field object across every page of a JSON page array.
fn fields_mut(pages: &mut Value) -> impl Iterator<Item = &mut Value> {
    pages
        .as_array_mut()
        .into_iter()
        .flatten()
        .filter_map(|page| page.get_mut("fields").and_then(Value::as_array_mut))
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{create_field, FieldType};

    fn grid_pages(cells: Value, rows: usize, cols: usize) -> Value {
        json!([{
            "fields": [{
                "id": "g1",
                "label": "Grid",
                "type": "data-grid",
                "gridMatrix": {
                    "rows": rows,
                    "cols": cols,
                    "gap": 12,
                    "cellWidth": 100,
                    "cellHeight": 140,
                    "showBorders": true,
                    "headers": ["Col 1", "Col 2"],
                    "cells": cells
                }
            }]
        }])
    }

    #[test]
    fn test_flatten_two_by_two_is_row_major() {
        let pages = grid_pages(
            json!([
                [{"value": "x", "items": []}, {"items": []}],
                [{"items": []}, {"items": []}]
            ]),
            2,
            2,
        );
        let flat = flatten_pages(&pages);
        let matrix = &flat[0]["fields"][0]["gridMatrix"];
        assert!(matrix.get("cells").is_none());
        assert_eq!(
            matrix["cellsFlat"],
            json!([
                {"row": 0, "col": 0, "cell": {"value": "x", "items": []}},
                {"row": 0, "col": 1, "cell": {"items": []}},
                {"row": 1, "col": 0, "cell": {"items": []}},
                {"row": 1, "col": 1, "cell": {"items": []}}
            ])
        );
        assert_eq!(rehydrate_pages(&flat), pages);
    }

    #[test]
    fn test_flatten_leaves_non_grid_and_non_nested_fields() {
        let pages = json!([{
            "fields": [
                {"id": "t", "type": "text", "cells": [[1]]},
                {"id": "g", "type": "data-grid", "gridMatrix": {"rows": 1, "cols": 1, "cells": "oops"}}
            ]
        }]);
        assert_eq!(flatten_pages(&pages), pages);
    }

    #[test]
    fn test_rehydrate_ignores_out_of_range_entries() {
        let pages = json!([{
            "fields": [{
                "id": "g",
                "type": "data-grid",
                "gridMatrix": {
                    "rows": 1,
                    "cols": 1,
                    "cellsFlat": [
                        {"row": 0, "col": 0, "cell": {"value": "a", "items": []}},
                        {"row": 3, "col": 0, "cell": {"value": "b", "items": []}},
                        {"row": 0, "col": 7, "cell": {"value": "c", "items": []}}
                    ]
                }
            }]
        }]);
        let out = rehydrate_pages(&pages);
        let matrix = &out[0]["fields"][0]["gridMatrix"];
        assert_eq!(matrix["cells"], json!([[{"value": "a", "items": []}]]));
        assert!(matrix.get("cellsFlat").is_none());
    }

    #[test]
    fn test_rehydrate_fills_missing_positions_with_empty_cells() {
        let pages = json!([{
            "fields": [{
                "id": "g",
                "type": "data-grid",
                "gridMatrix": {"rows": 2, "cols": 1, "cellsFlat": []}
            }]
        }]);
        let out = rehydrate_pages(&pages);
        assert_eq!(
            out[0]["fields"][0]["gridMatrix"]["cells"],
            json!([[{"items": []}], [{"items": []}]])
        );
    }

    #[test]
    fn test_grid_type_matching() {
        for t in ["data-grid", "DataGrid", "data_grid", "GRID", "Matrix", "data grid"] {
            assert!(is_grid_type(t), "{t} should match");
        }
        for t in ["text", "gridlines", "signature"] {
            assert!(!is_grid_type(t), "{t} should not match");
        }
    }

    #[test]
    fn test_normalize_coerces_legacy_matrix() {
        let pages = json!([{
            "fields": [{
                "id": "m",
                "label": "Checklist",
                "type": "Matrix",
                "gridMatrix": {
                    "cells": [
                        ["done", null],
                        [{"items": [
                            {"type": "checkbox", "options": ["yes", {"value": "no"}]},
                            {"type": "text"}
                        ]}]
                    ]
                }
            }]
        }]);
        let out = normalize_for_save(&pages);
        let field = &out[0]["fields"][0];
        assert_eq!(field["type"], "data-grid");

        let m = &field["gridMatrix"];
        assert_eq!(m["rows"], 2);
        assert_eq!(m["cols"], 2);
        assert_eq!(m["gap"], 12);
        assert_eq!(m["cellHeight"], 140);
        assert_eq!(m["showBorders"], true);
        assert_eq!(m["headers"], json!(["Col 1", "Col 2"]));
        assert_eq!(m["cells"][0][0], json!({"value": "done", "items": []}));
        assert_eq!(m["cells"][0][1], json!({"items": []}));
        assert_eq!(m["cells"][1][1], json!({"items": []}));

        let items = &m["cells"][1][0]["items"];
        assert_eq!(items[0]["value"], json!([]));
        assert_eq!(
            items[0]["options"],
            json!([{"label": "yes", "value": "yes"}, {"label": "no", "value": "no"}])
        );
        assert_eq!(items[1]["value"], Value::Null);
    }

    #[test]
    fn test_normalize_without_matrix_builds_one_by_one() {
        let pages = json!([{"fields": [{"id": "g", "type": "grid"}]}]);
        let out = normalize_for_save(&pages);
        let m = &out[0]["fields"][0]["gridMatrix"];
        assert_eq!(m["rows"], 1);
        assert_eq!(m["cols"], 1);
        assert_eq!(m["cells"], json!([[{"items": []}]]));
    }

    #[test]
    fn test_typed_round_trip_preserves_cells() {
        let mut field = create_field(FieldType::DataGrid, "Grid");
        {
            let g = field.grid_mut().unwrap();
            g.add_row();
            g.add_column();
            g.set_cell(0, 0, "x");
            g.set_cell(1, 1, "y");
            g.set_header(1, "Notes");
        }
        let pages = vec![Page {
            fields: vec![field, create_field(FieldType::Text, "Name")],
        }];

        let stored = encode_pages(&pages).unwrap();
        assert!(stored[0]["fields"][0]["gridMatrix"].get("cells").is_none());
        let back = decode_pages(&stored).unwrap();
        assert_eq!(back, pages);
    }

    #[test]
    fn test_decode_accepts_legacy_nested_grids() {
        let stored = json!([{
            "fields": [{"id": "g", "label": "Old", "type": "datagrid",
                        "gridMatrix": {"rows": 1, "cols": 1, "cells": [["a"]]}}]
        }]);
        let pages = decode_pages(&stored).unwrap();
        let grid = pages[0].fields[0].grid().unwrap();
        assert_eq!(grid.cell(0, 0).unwrap().value, "a");
    }

    #[test]
    fn test_round_trip_after_deleting_down_to_one_by_one() {
        let mut field = create_field(FieldType::DataGrid, "Grid");
        {
            let g = field.grid_mut().unwrap();
            g.add_row();
            g.add_column();
            g.set_cell(1, 1, "last");
            g.delete_row(0);
            g.delete_column(0);
            // Neither count can drop below one.
            g.delete_row(0);
            g.delete_column(0);
        }
        let pages = vec![Page {
            fields: vec![field],
        }];
        let back = decode_pages(&encode_pages(&pages).unwrap()).unwrap();
        assert_eq!(back, pages);
        assert_eq!(back[0].fields[0].grid().unwrap().cell(0, 0).unwrap().value, "last");
    }

    #[test]
    fn test_decode_rejects_oversized_grid() {
        let stored = json!([{
            "fields": [{
                "id": "huge",
                "type": "data-grid",
                "gridMatrix": {"rows": u64::MAX / 4, "cols": 1, "cellsFlat": []}
            }]
        }]);
        let err = decode_pages(&stored).unwrap_err();
        assert!(matches!(
            err,
            CodecError::GridTooLarge { ref field_id, cols: 1, .. } if field_id == "huge"
        ));

        let wide = json!([{
            "fields": [{"id": "w", "type": "matrix",
                        "gridMatrix": {"cells": [vec![json!("x"); MAX_GRID_DIM + 1]]}}]
        }]);
        assert!(matches!(
            decode_pages(&wide),
            Err(CodecError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_raw_passes_clamp_oversized_counts() {
        let pages = json!([{
            "fields": [{
                "id": "g",
                "type": "data-grid",
                "gridMatrix": {"rows": 1_000_000_000u64, "cols": 0, "cellsFlat": []}
            }]
        }]);
        let out = rehydrate_pages(&pages);
        let m = &out[0]["fields"][0]["gridMatrix"];
        assert_eq!(m["rows"], MAX_GRID_DIM);
        assert_eq!(m["cols"], 1);
        assert_eq!(m["cells"].as_array().unwrap().len(), MAX_GRID_DIM);

        let normalized = normalize_for_save(&pages);
        assert_eq!(normalized[0]["fields"][0]["gridMatrix"]["rows"], MAX_GRID_DIM);
    }
}
