//! Every out-of-line table one captured context owns.

use crate::dedup::{BinaryTable, PlaceholderTable};
use crate::image::ImageRegistry;
use crate::shader::ShaderTable;

/// Per-context storage handed to the encoder and read by the generator
#[derive(Debug, Clone, Default)]
pub struct CaptureTables {
    /// Serialized binary payloads (`typedArrays`)
    pub binary: BinaryTable,
    /// Zero placeholders (`zeroArrays`)
    pub placeholders: PlaceholderTable,
    /// Shader sources (`shaderSources`)
    pub shaders: ShaderTable,
    /// Rasterized images (`imagesBase64`)
    pub images: ImageRegistry,
}

impl CaptureTables {
    /// Create empty tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing has been stored out of line
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binary.is_empty()
            && self.placeholders.is_empty()
            && self.shaders.is_empty()
            && self.images.is_empty()
    }
}
