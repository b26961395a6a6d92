//! Signature pads — one freehand surface per signature field.
//!
//! Each pad owns its surface and its own `drawing` flag. A pointer-move only
//! reaches the surface while that flag is set, so a pad never has more than
//! one active stroke.

use tracing::debug;

use crate::model::{Page, Position, Size};
use crate::signature::surface::{DrawingSurface, LineCap, LineStyle, RecordingCanvas};

pub const STROKE_WIDTH: f64 = 2.0;
pub const STROKE_COLOR: &str = "#111827";

pub fn signature_line_style() -> LineStyle {
    LineStyle {
        width: STROKE_WIDTH,
        color: STROKE_COLOR.to_string(),
        cap: LineCap::Round,
    }
}

#[derive(Debug)]
pub struct SignaturePad<S: DrawingSurface> {
    field_id: String,
    surface: S,
    drawing: bool,
    css_size: Size,
}

impl<S: DrawingSurface> SignaturePad<S> {
    pub fn new(field_id: impl Into<String>, surface: S) -> Self {
        Self {
            field_id: field_id.into(),
            surface,
            drawing: false,
            css_size: Size::default(),
        }
    }

    /// Sizes the backing store for the device pixel ratio and sets the pen.
    pub fn init(&mut self, css_size: Size, pixel_ratio: f64) {
        let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let width = (css_size.width * ratio).round().max(0.0) as u32;
        let height = (css_size.height * ratio).round().max(0.0) as u32;
        self.surface.resize_backing(width, height);
        self.surface.scale(ratio);
        self.surface.set_line_style(&signature_line_style());
        self.css_size = css_size;
        self.drawing = false;
    }

    pub fn pointer_down(&mut self, at: Position) {
        self.surface.begin_path(at.x, at.y);
        self.drawing = true;
    }

    /// Returns `true` when the move extended the current stroke.
    pub fn pointer_move(&mut self, at: Position) -> bool {
        if !self.drawing {
            return false;
        }
        self.surface.line_to(at.x, at.y);
        true
    }

    pub fn pointer_up(&mut self) {
        if self.drawing {
            self.surface.end_path();
            self.drawing = false;
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    /// Erases the whole drawable area. The context is already scaled, so the
    /// rectangle is given in CSS pixels.
    pub fn clear(&mut self) {
        self.surface
            .clear_rect(0.0, 0.0, self.css_size.width, self.css_size.height);
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// The set of mounted signature pads for the current page, indexed by the
/// position of their field among the page's signature fields.
#[derive(Debug)]
pub struct SignatureBoard<S: DrawingSurface + Default = RecordingCanvas> {
    pads: Vec<SignaturePad<S>>,
    pixel_ratio: f64,
}

impl<S: DrawingSurface + Default> SignatureBoard<S> {
    pub fn new(pixel_ratio: f64) -> Self {
        Self {
            pads: Vec::new(),
            pixel_ratio,
        }
    }

    /// Re-indexes pads against the signature fields of `page`. Pads follow
    /// their field id; new fields get a fresh pad, vanished fields drop theirs.
    pub fn remount(&mut self, page: &Page) {
        let mut previous = std::mem::take(&mut self.pads);
        for field in page.fields.iter().filter(|f| f.is_signature()) {
            let pad = match previous.iter().position(|p| p.field_id == field.id) {
                Some(i) => {
                    let mut pad = previous.swap_remove(i);
                    pad.pointer_up();
                    pad
                }
                None => {
                    let mut pad = SignaturePad::new(field.id.clone(), S::default());
                    pad.init(field.size, self.pixel_ratio);
                    pad
                }
            };
            self.pads.push(pad);
        }
        debug!(
            "Mounted {} signature pads ({} released)",
            self.pads.len(),
            previous.len()
        );
    }

    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    pub fn pad(&self, index: usize) -> Option<&SignaturePad<S>> {
        self.pads.get(index)
    }

    pub fn index_of(&self, field_id: &str) -> Option<usize> {
        self.pads.iter().position(|p| p.field_id == field_id)
    }

    pub fn pointer_down(&mut self, index: usize, at: Position) {
        if let Some(pad) = self.pads.get_mut(index) {
            pad.pointer_down(at);
        }
    }

    pub fn pointer_move(&mut self, index: usize, at: Position) -> bool {
        self.pads
            .get_mut(index)
            .is_some_and(|pad| pad.pointer_move(at))
    }

    pub fn pointer_up(&mut self, index: usize) {
        if let Some(pad) = self.pads.get_mut(index) {
            pad.pointer_up();
        }
    }

    pub fn pointer_leave(&mut self, index: usize) {
        if let Some(pad) = self.pads.get_mut(index) {
            pad.pointer_leave();
        }
    }

    pub fn clear(&mut self, index: usize) {
        if let Some(pad) = self.pads.get_mut(index) {
            pad.clear();
        }
    }
}
