//! glcap deterministic simulation
//!
//! A simulated graphics host and page, and canned scenes that draw through a
//! captured context. Every run is reproducible from a seed, so captures and
//! generated artifacts can be asserted on byte for byte.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gl;
pub mod harness;
pub mod page;
pub mod scene;
pub mod seed;

pub use gl::{CallJournal, HostCall, SimExtension, SimGl, SimGlConfig, FUNCTIONS};
pub use harness::{SimConfig, SimError, SimHarness, SimResult};
pub use page::SimPage;
pub use scene::{Scene, ScenePlayer, FRAGMENT_SHADER, VERTEX_SHADER};
pub use seed::{SeedSource, SimSeed};
