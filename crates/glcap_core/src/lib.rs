//! glcap core types
//!
//! Pure types shared by every glcap crate: the host value model, resource and
//! context identifiers, content hashes, timestamps, limits and errors.
//! Nothing in this crate performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod time;
pub mod value;

// Re-exports
pub use config::{CaptureLimits, CaptureOptions};
pub use error::{CaptureError, CoreResult};
pub use hash::{Hash, HashError};
pub use id::{ContextId, HostHandle, ResourceId, TypeTag};
pub use time::Timestamp;
pub use value::{js_number, ElementType, HostValue, ImageKind, ImageSource, TypedArray};
