//! Layout Engine — normalizes and anchors field geometry within pages.
//!
//! Pure functions over the document model. `capture_layout` runs before every
//! save so stored coordinates are whole, non-negative pixels.

use crate::grid::sync_cell_metrics;
use crate::model::geometry::MIN_FIELD_EXTENT;
use crate::model::Page;

/// Default padding kept between the page origin and the top-left-most field.
pub const DEFAULT_ANCHOR_PADDING: f64 = 12.0;

/// Rounds every position to a non-negative integer and every size to an
/// integer of at least 20, then refreshes grid cell metrics.
pub fn capture_layout(pages: &mut [Page]) {
    for field in pages.iter_mut().flat_map(|p| p.fields.iter_mut()) {
        field.position.x = clamp_coord(field.position.x);
        field.position.y = clamp_coord(field.position.y);
        field.size.width = clamp_extent(field.size.width);
        field.size.height = clamp_extent(field.size.height);
        sync_cell_metrics(field);
    }
}

/// Shifts every field left/up so the top-left-most field sits `pad` pixels
/// from the origin. Fields already closer than `pad` are never pushed out.
pub fn anchor_top_left(page: &mut Page, pad: f64) {
    if page.fields.is_empty() {
        return;
    }

    let min_x = page
        .fields
        .iter()
        .map(|f| f.position.x.max(0.0))
        .fold(f64::INFINITY, f64::min);
    let min_y = page
        .fields
        .iter()
        .map(|f| f.position.y.max(0.0))
        .fold(f64::INFINITY, f64::min);

    let dx = (min_x - pad).max(0.0);
    let dy = (min_y - pad).max(0.0);
    if dx == 0.0 && dy == 0.0 {
        return;
    }

    for field in &mut page.fields {
        field.position.x = (field.position.x.max(0.0) - dx).max(0.0);
        field.position.y = (field.position.y.max(0.0) - dy).max(0.0);
    }
}

fn clamp_coord(v: f64) -> f64 {
    if v.is_finite() {
        v.round().max(0.0)
    } else {
        0.0
    }
}

fn clamp_extent(v: f64) -> f64 {
    if v.is_finite() {
        v.round().max(MIN_FIELD_EXTENT)
    } else {
        MIN_FIELD_EXTENT
    }
}
