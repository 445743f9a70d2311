//! glcap API tables
//!
//! Static knowledge about the captured graphics API: symbolic names for
//! numeric constants, per-overload argument roles, and the handler class of
//! every function. Everything here is authored once and shared read-only.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod descriptor;
pub mod enums;

// Re-exports
pub use classify::{classify, is_uniform_setter, CallClass};
pub use descriptor::{descriptor, ArgRole, CallDescriptor, SliceRule, BUFFER_BITS, SYNC_BITS};
pub use enums::{as_constant_key, constant, EnumTable, GL_NAMESPACE, WEBGL_CONSTANTS};
