// Signature Capture: per-field freehand drawing surfaces.

pub mod pad;
pub mod surface;

pub use pad::{SignatureBoard, SignaturePad};
pub use surface::{DrawingSurface, InkPoint, LineCap, LineStyle, RecordingCanvas};
