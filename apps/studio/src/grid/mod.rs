// Grid/Matrix field support: structural editing and the storage codec.

pub mod codec;
pub mod editor;

pub use codec::{decode_pages, encode_pages, CodecError};
pub use editor::{derived_cell_height, derived_cell_width, sync_cell_metrics};
