//! Artifact transport: compress, then base64 into a single data URL.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use glcap_core::CaptureError;
use std::io::{Read, Write};

/// Prefix of an encoded artifact
pub const DATA_URL_PREFIX: &str = "data:json/gzip;base64,";

/// Error from generating or transporting an artifact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// Compressor failed
    #[error("compression failed: {reason}")]
    Compress {
        /// Reason
        reason: String,
    },

    /// Encoded artifact is malformed
    #[error("malformed artifact: {reason}")]
    Malformed {
        /// Reason
        reason: String,
    },
}

impl From<GenerateError> for CaptureError {
    fn from(err: GenerateError) -> Self {
        CaptureError::Compression {
            reason: err.to_string(),
        }
    }
}

/// A general-purpose byte stream compressor
pub trait StreamCompressor {
    /// Compress a whole buffer
    ///
    /// # Errors
    ///
    /// Returns `Compress` on stream failure
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, GenerateError>;

    /// Inverse of [`StreamCompressor::compress`]
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the input is not a valid stream
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, GenerateError>;
}

/// gzip via `flate2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipCompressor {
    level: u32,
}

impl GzipCompressor {
    /// Compressor at the given level (0-9)
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }

    /// Fastest level
    #[must_use]
    pub fn fast() -> Self {
        Self::new(Compression::fast().level())
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(Compression::default().level())
    }
}

impl StreamCompressor for GzipCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, GenerateError> {
        let failed = |e: std::io::Error| GenerateError::Compress {
            reason: e.to_string(),
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(input).map_err(failed)?;
        encoder.finish().map_err(failed)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, GenerateError> {
        let mut out = Vec::new();
        GzDecoder::new(input)
            .read_to_end(&mut out)
            .map_err(|e| GenerateError::Malformed {
                reason: e.to_string(),
            })?;
        Ok(out)
    }
}

/// Compress `text` and wrap it as a data URL
///
/// # Errors
///
/// Returns `Compress` if the compressor fails
pub fn encode_data_url(text: &str, compressor: &dyn StreamCompressor) -> Result<String, GenerateError> {
    let compressed = compressor.compress(text.as_bytes())?;
    let b64 = BASE64_STANDARD.encode(compressed);
    let mut out = String::with_capacity(DATA_URL_PREFIX.len() + b64.len());
    out.push_str(DATA_URL_PREFIX);
    out.push_str(&b64);
    Ok(out)
}

/// Recover the text of a data URL produced by [`encode_data_url`]
///
/// # Errors
///
/// Returns `Malformed` on a wrong prefix, bad base64, a bad stream or
/// non-UTF-8 text
pub fn decode_data_url(encoded: &str, compressor: &dyn StreamCompressor) -> Result<String, GenerateError> {
    let b64 = encoded
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| GenerateError::Malformed {
            reason: "missing data URL prefix".to_string(),
        })?;
    let compressed = BASE64_STANDARD
        .decode(b64)
        .map_err(|e| GenerateError::Malformed {
            reason: e.to_string(),
        })?;
    let bytes = compressor.decompress(&compressed)?;
    String::from_utf8(bytes).map_err(|e| GenerateError::Malformed {
        reason: e.to_string(),
    })
}
