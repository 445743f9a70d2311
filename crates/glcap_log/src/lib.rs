//! glcap capture log
//!
//! Append-only capture entries, a running digest over them, and the
//! per-context session state machine that decides what gets appended.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod entry;
pub mod session;

pub use chain::LogChain;
pub use entry::{CaptureEntry, DeferredResolver, NoDeferred, DEBUG_MARKER};
pub use session::{CaptureSession, SessionState};
