//! Rasterized image payloads.
//!
//! Images identified by a remote URL are deduplicated by that URL, so the
//! host only rasterizes them once. Everything else (inline `data:` sources,
//! canvases, bitmaps, pixel buffers) is deduplicated by payload content.

use crate::dedup::{DedupTable, Interned};
use glcap_core::Hash;
use serde::{Deserialize, Serialize};

const IMAGE_DOMAIN: &str = "glcap.image.v1";

/// Dedup key for an image payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKey {
    /// Non-inline source URL
    Url(String),
    /// Hash of the encoded payload
    Content(Hash),
}

impl ImageKey {
    /// Key for an encoded payload
    #[must_use]
    pub fn content(data_url: &str) -> Self {
        Self::Content(Hash::compute_in(IMAGE_DOMAIN, data_url.as_bytes()))
    }
}

/// One rasterized still frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// `data:` URL holding the encoded pixels
    pub data_url: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Registry of image payloads (`imagesBase64[N]` in replay)
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    table: DedupTable<ImageKey, ImagePayload>,
}

impl ImageRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot already holding the payload for `key`
    #[must_use]
    pub fn lookup(&self, key: &ImageKey) -> Option<usize> {
        self.table.slot_of(key)
    }

    /// Intern a payload under an explicit key
    pub fn intern(&mut self, key: ImageKey, payload: ImagePayload) -> Interned {
        self.table.intern_with(key, || payload)
    }

    /// Intern a payload keyed by its own content
    pub fn intern_content(&mut self, payload: ImagePayload) -> Interned {
        let key = ImageKey::content(&payload.data_url);
        self.intern(key, payload)
    }

    /// Payload at `slot`
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&ImagePayload> {
        self.table.get(slot).map(|(_, v)| v)
    }

    /// Payloads in id order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ImagePayload)> {
        self.table.iter().map(|(i, _, v)| (i, v))
    }

    /// Number of payloads
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
