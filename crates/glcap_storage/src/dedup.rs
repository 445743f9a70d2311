//! Insertion-ordered dedup tables.
//!
//! A key is assigned a slot index the first time it is interned; interning
//! the same key again returns the same index and never builds a second slot.

use bytes::Bytes;
use glcap_core::ElementType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::Hash as StdHash;

use crate::address::{base64_len, ContentAddress};

/// Result of interning a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interned {
    /// Slot index
    pub slot: usize,
    /// Whether the slot was created by this call
    pub is_new: bool,
}

/// Generic key -> slot table that preserves first-insertion order
#[derive(Debug, Clone)]
pub struct DedupTable<K, V> {
    slots: IndexMap<K, V>,
}

impl<K: StdHash + Eq, V> DedupTable<K, V> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: IndexMap::new(),
        }
    }

    /// Intern `key`, building its value only when the slot is new
    pub fn intern_with(&mut self, key: K, make: impl FnOnce() -> V) -> Interned {
        if let Some(slot) = self.slots.get_index_of(&key) {
            return Interned {
                slot,
                is_new: false,
            };
        }
        let (slot, _) = self.slots.insert_full(key, make());
        Interned { slot, is_new: true }
    }

    /// Slot index of `key`, if interned
    pub fn slot_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: StdHash + Eq + ?Sized,
    {
        self.slots.get_index_of(key)
    }

    /// Key and value at `slot`
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<(&K, &V)> {
        self.slots.get_index(slot)
    }

    /// Slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &K, &V)> {
        self.slots.iter().enumerate().map(|(i, (k, v))| (i, k, v))
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K: StdHash + Eq, V> Default for DedupTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary payload stored in a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySlot {
    /// Element type the replay rebuilds
    pub element: ElementType,
    /// Raw bytes
    pub data: Bytes,
}

impl BinarySlot {
    /// Size of the slot's base64 text
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        base64_len(self.data.len())
    }
}

/// Deduplicated binary payloads (`typedArrays[N]` in replay)
#[derive(Debug, Clone, Default)]
pub struct BinaryTable {
    table: DedupTable<ContentAddress, BinarySlot>,
}

impl BinaryTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern bytes viewed as `element`
    pub fn intern(&mut self, element: ElementType, data: Bytes) -> Interned {
        let address = ContentAddress::compute(element, &data);
        self.table
            .intern_with(address, || BinarySlot { element, data })
    }

    /// Slot at index
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&BinarySlot> {
        self.table.get(slot).map(|(_, v)| v)
    }

    /// Slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BinarySlot)> {
        self.table.iter().map(|(i, _, v)| (i, v))
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A zero-filled stand-in for a payload that was not serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    /// `new <Ctor>(len)`
    Typed {
        /// Element type
        element: ElementType,
        /// Element count
        len: usize,
    },
    /// `new ArrayBuffer(bytes)`
    Buffer {
        /// Byte length
        bytes: usize,
    },
    /// `new DataView(new ArrayBuffer(bytes))`
    DataView {
        /// Byte length
        bytes: usize,
    },
    /// `generateZeroImageData(width, height)`
    Image {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

impl Placeholder {
    /// Replay expression that allocates the placeholder
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Self::Typed { element, len } => format!("new {}({})", element.ctor_name(), len),
            Self::Buffer { bytes } => format!("new ArrayBuffer({})", bytes),
            Self::DataView { bytes } => format!("new DataView(new ArrayBuffer({}))", bytes),
            Self::Image { width, height } => format!("generateZeroImageData({}, {})", width, height),
        }
    }
}

/// Deduplicated placeholders (`zeroArrays[N]` in replay)
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    table: DedupTable<Placeholder, ()>,
}

impl PlaceholderTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a placeholder
    pub fn intern(&mut self, placeholder: Placeholder) -> Interned {
        self.table.intern_with(placeholder, || ())
    }

    /// Placeholders in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Placeholder)> {
        self.table.iter().map(|(i, k, _)| (i, k))
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_intern_same_key_same_slot() {
        let mut table: DedupTable<&str, u32> = DedupTable::new();
        let a = table.intern_with("a", || 1);
        let b = table.intern_with("b", || 2);
        let again = table.intern_with("a", || 99);
        assert_eq!(a, Interned { slot: 0, is_new: true });
        assert_eq!(b.slot, 1);
        assert_eq!(again, Interned { slot: 0, is_new: false });
        assert_eq!(table.get(0), Some((&"a", &1)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_binary_table_dedup() {
        let mut table = BinaryTable::new();
        let data = Bytes::from_static(&[0, 0, 128, 63]);
        let first = table.intern(ElementType::Float32, data.clone());
        let second = table.intern(ElementType::Float32, data.clone());
        let as_bytes = table.intern(ElementType::Uint8, data);
        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(first.slot, second.slot);
        assert_ne!(first.slot, as_bytes.slot);
        assert_eq!(table.get(0).unwrap().encoded_len(), 8);
    }

    #[test]
    fn test_placeholder_expressions() {
        assert_eq!(
            Placeholder::Typed { element: ElementType::Float32, len: 4 }.expression(),
            "new Float32Array(4)"
        );
        assert_eq!(Placeholder::Buffer { bytes: 16 }.expression(), "new ArrayBuffer(16)");
        assert_eq!(
            Placeholder::DataView { bytes: 8 }.expression(),
            "new DataView(new ArrayBuffer(8))"
        );
        assert_eq!(
            Placeholder::Image { width: 4096, height: 4096 }.expression(),
            "generateZeroImageData(4096, 4096)"
        );
    }

    #[test]
    fn test_placeholder_table_dedup() {
        let mut table = PlaceholderTable::new();
        let a = table.intern(Placeholder::Buffer { bytes: 4 });
        let b = table.intern(Placeholder::Buffer { bytes: 4 });
        assert_eq!(a.slot, b.slot);
        assert_eq!(table.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_no_duplicate_slots(payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 1..32)) {
            let mut table = BinaryTable::new();
            let mut distinct = std::collections::HashSet::new();
            for payload in &payloads {
                let interned = table.intern(ElementType::Uint8, Bytes::from(payload.clone()));
                prop_assert_eq!(interned.is_new, distinct.insert(payload.clone()));
            }
            prop_assert_eq!(table.len(), distinct.len());
        }
    }
}
