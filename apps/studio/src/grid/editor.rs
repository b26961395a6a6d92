//! Grid/Matrix Editor — structural mutation of a single field's cell matrix.
//!
//! Every mutating operation first repairs the matrix with `ensure_shape`, so a
//! matrix loaded from an inconsistent source is healed silently before it is
//! touched. Out-of-range indices are ignored rather than reported.

use tracing::debug;

use crate::model::field::{column_header, Cell, Field, GridMatrix, MAX_GRID_DIM};

/// Smallest derived cell height in pixels.
const MIN_CELL_HEIGHT: i64 = 60;
/// Vertical allowance subtracted from each row for the cell chrome.
const CELL_VERTICAL_CHROME: i64 = 12;

impl GridMatrix {
    /// Clamps `rows`/`cols` into `1..=MAX_GRID_DIM`, then pads or truncates
    /// headers and cells to exactly `rows × cols`. Idempotent.
    pub fn ensure_shape(&mut self) {
        self.rows = self.rows.clamp(1, MAX_GRID_DIM);
        self.cols = self.cols.clamp(1, MAX_GRID_DIM);
        if self.is_well_formed() {
            return;
        }
        let cols = self.cols;
        self.headers.truncate(cols);
        while self.headers.len() < cols {
            let n = self.headers.len() + 1;
            self.headers.push(column_header(n));
        }

        self.cells.truncate(self.rows);
        while self.cells.len() < self.rows {
            self.cells.push(Vec::with_capacity(cols));
        }
        for row in &mut self.cells {
            row.resize_with(cols, Cell::default);
        }
    }

    pub fn add_row(&mut self) {
        self.ensure_shape();
        if self.rows >= MAX_GRID_DIM {
            return;
        }
        self.rows += 1;
        self.cells.push(vec![Cell::default(); self.cols]);
    }

    pub fn add_column(&mut self) {
        self.ensure_shape();
        if self.cols >= MAX_GRID_DIM {
            return;
        }
        self.cols += 1;
        self.headers.push(column_header(self.cols));
        for row in &mut self.cells {
            row.push(Cell::default());
        }
    }

    pub fn delete_row(&mut self, index: usize) {
        self.ensure_shape();
        // The last row stays.
        if index >= self.rows || self.rows == 1 {
            return;
        }
        self.cells.remove(index);
        self.rows -= 1;
    }

    pub fn delete_column(&mut self, index: usize) {
        self.ensure_shape();
        if index >= self.cols || self.cols == 1 {
            return;
        }
        self.headers.remove(index);
        for row in &mut self.cells {
            row.remove(index);
        }
        self.cols -= 1;
    }

    pub fn set_header(&mut self, index: usize, value: impl Into<String>) {
        self.ensure_shape();
        if let Some(header) = self.headers.get_mut(index) {
            *header = value.into();
        }
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.cell_mut(row, col) {
            cell.value = value.into();
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Mutable access to a cell's sub-items; `None` when out of range.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.ensure_shape();
        self.cells.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// True when headers and cells match `rows × cols` exactly.
    pub fn is_well_formed(&self) -> bool {
        self.headers.len() == self.cols
            && self.cells.len() == self.rows
            && self.cells.iter().all(|r| r.len() == self.cols)
    }
}

/// `floor((width − gap × (cols + 1)) / cols)`, never negative.
pub fn derived_cell_width(field: &Field) -> u32 {
    let Some(grid) = field.grid() else {
        return 0;
    };
    let cols = grid.cols.max(1) as i64;
    let usable = field.size.width.floor() as i64 - i64::from(grid.gap) * (cols + 1);
    usable.div_euclid(cols).max(0) as u32
}

/// `max(60, floor(height / rows) − 12)`.
pub fn derived_cell_height(field: &Field) -> u32 {
    let Some(grid) = field.grid() else {
        return 0;
    };
    let rows = grid.rows.max(1) as f64;
    let per_row = (field.size.height / rows).floor() as i64 - CELL_VERTICAL_CHROME;
    per_row.max(MIN_CELL_HEIGHT) as u32
}

/// Refreshes the cached `cellWidth`/`cellHeight` from the field geometry.
/// No-op for non-grid fields.
pub fn sync_cell_metrics(field: &mut Field) {
    let width = derived_cell_width(field);
    let height = derived_cell_height(field);
    let id = field.id.clone();
    if let Some(grid) = field.grid_mut() {
        grid.ensure_shape();
        if grid.cell_width != width || grid.cell_height != height {
            debug!("Grid {id}: cell metrics {width}x{height}");
        }
        grid.cell_width = width;
        grid.cell_height = height;
    }
}
