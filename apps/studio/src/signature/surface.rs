use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub width: f64,
    pub color: String,
    pub cap: LineCap,
}

/// The drawing context behind one signature surface.
///
/// Coordinates passed to path operations are in CSS pixels; the surface
/// applies the current `scale` to map them onto its backing store.
pub trait DrawingSurface {
    fn resize_backing(&mut self, width: u32, height: u32);
    fn scale(&mut self, factor: f64);
    fn set_line_style(&mut self, style: &LineStyle);
    fn begin_path(&mut self, x: f64, y: f64);
    /// Extends the open path and strokes the new segment.
    fn line_to(&mut self, x: f64, y: f64);
    fn end_path(&mut self);
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
}

/// A point in backing-store pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
}

/// In-memory surface that keeps every stroke as a polyline in backing pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingCanvas {
    backing_width: u32,
    backing_height: u32,
    scale: f64,
    style: Option<LineStyle>,
    strokes: Vec<Vec<InkPoint>>,
    path_open: bool,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self {
            backing_width: 0,
            backing_height: 0,
            scale: 1.0,
            style: None,
            strokes: Vec::new(),
            path_open: false,
        }
    }
}

impl RecordingCanvas {
    pub fn strokes(&self) -> &[Vec<InkPoint>] {
        &self.strokes
    }

    pub fn is_blank(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn backing_size(&self) -> (u32, u32) {
        (self.backing_width, self.backing_height)
    }

    pub fn style(&self) -> Option<&LineStyle> {
        self.style.as_ref()
    }

    fn to_backing(&self, x: f64, y: f64) -> InkPoint {
        InkPoint {
            x: x * self.scale,
            y: y * self.scale,
        }
    }
}

impl DrawingSurface for RecordingCanvas {
    fn resize_backing(&mut self, width: u32, height: u32) {
        // Resizing a canvas resets its context and contents.
        *self = Self {
            backing_width: width,
            backing_height: height,
            ..Self::default()
        };
    }

    fn scale(&mut self, factor: f64) {
        self.scale *= factor;
    }

    fn set_line_style(&mut self, style: &LineStyle) {
        self.style = Some(style.clone());
    }

    fn begin_path(&mut self, x: f64, y: f64) {
        let start = self.to_backing(x, y);
        self.strokes.push(vec![start]);
        self.path_open = true;
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if !self.path_open {
            return;
        }
        let point = self.to_backing(x, y);
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    fn end_path(&mut self) {
        self.path_open = false;
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let min = self.to_backing(x, y);
        let max = self.to_backing(x + width, y + height);
        let inside = |p: &InkPoint| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
        for stroke in &mut self.strokes {
            stroke.retain(|p| !inside(p));
        }
        self.strokes.retain(|s| !s.is_empty());
        if self.strokes.is_empty() {
            self.path_open = false;
        }
    }
}
