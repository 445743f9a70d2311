//! glcap interception layer
//!
//! The recording proxy that sits between a program and its graphics context.
//! Calls are forwarded to the host unchanged; while a session is capturing
//! they are also encoded into replayable text.
//!
//! - [`host`]: capability traits a host context and page implement
//! - [`encoder`]: argument rendering driven by the descriptor table
//! - [`tracker`]: replay identities for created resources and locations
//! - [`recorder`]: the per-context proxy and its call handlers
//! - [`registry`]: every captured context of a page and the frame clock

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoder;
pub mod host;
pub mod recorder;
pub mod registry;
pub mod tracker;

pub use encoder::{apply_slice, json_string, render_bitfield, render_list, ArgEncoder, LIST_CHUNK};
pub use host::{ContextKind, GlContext, HostError, HostObject, HostPage, Member, MemberKind};
pub use recorder::{CaptureContext, CapturingContext, CapturingExtension};
pub use registry::{CaptureCounters, CaptureRegistry};
pub use tracker::{ResourceRecord, ResourceTracker, UniformLocation};
