//! glcap storage
//!
//! Content-addressed, insertion-ordered tables for everything a capture
//! serializes out of line: binary payloads, zero placeholders, shader sources
//! and rasterized images. Slot indices are stable for the life of a session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod dedup;
pub mod image;
pub mod shader;
pub mod tables;

pub use address::{base64_len, ContentAddress};
pub use dedup::{BinarySlot, BinaryTable, DedupTable, Interned, Placeholder, PlaceholderTable};
pub use image::{ImageKey, ImagePayload, ImageRegistry};
pub use shader::{escape_template, ShaderTable};
pub use tables::CaptureTables;
