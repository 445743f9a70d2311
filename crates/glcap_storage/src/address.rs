//! Content addressing for binary payloads.

use glcap_core::{ElementType, Hash};
use serde::{Deserialize, Serialize};

/// Hash domain for binary payloads
const BINARY_DOMAIN: &str = "glcap.binary.v1";

/// Content address of a binary payload together with its element type.
///
/// Two views with identical bytes but different element types are distinct
/// slots, since replay rebuilds them with different constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentAddress {
    /// Hash of the bytes
    pub hash: Hash,
    /// Element type used to rebuild the view
    pub element: ElementType,
}

impl ContentAddress {
    /// Create a content address
    #[must_use]
    pub const fn new(hash: Hash, element: ElementType) -> Self {
        Self { hash, element }
    }

    /// Compute the address of `data` viewed as `element`
    #[must_use]
    pub fn compute(element: ElementType, data: &[u8]) -> Self {
        Self {
            hash: Hash::compute_in(BINARY_DOMAIN, data),
            element,
        }
    }

    /// Get hash
    #[must_use]
    pub const fn as_hash(&self) -> &Hash {
        &self.hash
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.element.ctor_name(), self.hash.short())
    }
}

/// Length of the standard padded base64 text for `bytes` input bytes
#[must_use]
pub const fn base64_len(bytes: usize) -> usize {
    bytes.div_ceil(3) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_deterministic() {
        let a = ContentAddress::compute(ElementType::Float32, &[1, 2, 3, 4]);
        let b = ContentAddress::compute(ElementType::Float32, &[1, 2, 3, 4]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_address_distinguishes_element_type() {
        let a = ContentAddress::compute(ElementType::Float32, &[0; 8]);
        let b = ContentAddress::compute(ElementType::Uint8, &[0; 8]);
        assert_ne!(a, b);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_address_display() {
        let a = ContentAddress::compute(ElementType::Uint16, b"ab");
        assert!(a.to_string().starts_with("Uint16Array:"));
    }

    #[test]
    fn test_base64_len() {
        assert_eq!(base64_len(0), 0);
        assert_eq!(base64_len(1), 4);
        assert_eq!(base64_len(3), 4);
        assert_eq!(base64_len(4), 8);
        assert_eq!(base64_len(16), 24);
    }
}
