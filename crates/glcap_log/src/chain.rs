//! Running digest over a capture log.
//!
//! Each link hashes the previous tip together with the new entry, so two logs
//! share a digest only if they hold the same entries in the same order.

use glcap_core::Hash;

/// Hash chain over appended entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChain {
    tip: Hash,
    length: u64,
}

impl LogChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self {
            tip: Hash::compute(b"glcap.log.v1"),
            length: 0,
        }
    }

    /// Extend the chain with one entry's bytes
    pub fn push(&mut self, data: &[u8]) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.tip.as_bytes());
        hasher.update(&(data.len() as u64).to_le_bytes());
        hasher.update(data);
        self.tip = Hash::from_bytes(*hasher.finalize().as_bytes());
        self.length += 1;
    }

    /// Current tip
    #[must_use]
    pub const fn tip(&self) -> Hash {
        self.tip
    }

    /// Number of links
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// Check if chain is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Default for LogChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_deterministic() {
        let mut a = LogChain::new();
        let mut b = LogChain::new();
        a.push(b"one");
        a.push(b"two");
        b.push(b"one");
        b.push(b"two");
        assert_eq!(a.tip(), b.tip());
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_chain_order_matters() {
        let mut a = LogChain::new();
        let mut b = LogChain::new();
        a.push(b"one");
        a.push(b"two");
        b.push(b"two");
        b.push(b"one");
        assert_ne!(a.tip(), b.tip());
    }

    #[test]
    fn test_chain_boundaries_matter() {
        let mut a = LogChain::new();
        let mut b = LogChain::new();
        a.push(b"ab");
        a.push(b"c");
        b.push(b"a");
        b.push(b"bc");
        assert_ne!(a.tip(), b.tip());
    }

    #[test]
    fn test_empty_chain() {
        let chain = LogChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.tip(), LogChain::default().tip());
    }
}
