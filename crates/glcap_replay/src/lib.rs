//! glcap replay generation
//!
//! Turns a finished capture into a standalone document that re-creates the
//! context and replays the recorded calls one frame per display refresh.
//!
//! - [`program`]: the log split into frame segments, with a tick driver
//! - [`generator`]: emits the document for one context or a whole page
//! - [`transport`]: gzip + base64 data URL encoding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod generator;
pub mod program;
pub mod transport;

pub use generator::{generate, generate_all, Artifact, ArtifactInfo, CANVAS_ID};
pub use program::{ReplayProgram, TickScheduler};
pub use transport::{
    decode_data_url, encode_data_url, GenerateError, GzipCompressor, StreamCompressor, DATA_URL_PREFIX,
};
