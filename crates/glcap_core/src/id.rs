//! Identifiers for captured contexts and tracked resources.
//!
//! Context ids are UUIDs. Resource ids are `{tag, seq}` pairs minted by the
//! tracker and rendered as replay names (`buffer[0]`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context identifier - identifies one captured graphics context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a new random ContextId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx_{}", self.0)
    }
}

/// Opaque identity of an object returned by the host.
///
/// The host owns the object; glcap only uses the handle as a lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostHandle(u64);

impl HostHandle {
    /// Wrap a raw host identity
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw host identity
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "host#{:x}", self.0)
    }
}

/// Resource type tag, e.g. `buffer`, `texture`, `sync`.
///
/// Also the name of the replay collection the resource is assigned into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(String);

impl TypeTag {
    /// Create a tag from a literal name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive the tag of a creation function: `createVertexArray` -> `vertexarray`
    #[must_use]
    pub fn from_create_fn(function: &str) -> Self {
        let stem = function.strip_prefix("create").unwrap_or(function);
        Self(stem.to_ascii_lowercase())
    }

    /// Tag name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable replay identity of a created resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    /// Type namespace
    pub tag: TypeTag,
    /// Sequential id within the namespace, starting at 0
    pub seq: u32,
}

impl ResourceId {
    /// Create a resource id
    #[must_use]
    pub fn new(tag: TypeTag, seq: u32) -> Self {
        Self { tag, seq }
    }

    /// Replay expression naming this resource
    #[must_use]
    pub fn replay_name(&self) -> String {
        format!("{}[{}]", self.tag, self.seq)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.tag, self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_id_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }

    #[test]
    fn test_context_id_display() {
        let id = ContextId::from_bytes([0u8; 16]);
        assert!(id.to_string().starts_with("ctx_"));
    }

    #[test]
    fn test_type_tag_from_create_fn() {
        assert_eq!(TypeTag::from_create_fn("createBuffer").as_str(), "buffer");
        assert_eq!(
            TypeTag::from_create_fn("createVertexArray").as_str(),
            "vertexarray"
        );
        assert_eq!(
            TypeTag::from_create_fn("createTransformFeedback").as_str(),
            "transformfeedback"
        );
    }

    #[test]
    fn test_resource_replay_name() {
        let id = ResourceId::new(TypeTag::new("texture"), 7);
        assert_eq!(id.replay_name(), "texture[7]");
        assert_eq!(id.to_string(), "texture[7]");
    }

    #[test]
    fn test_host_handle_roundtrip() {
        let h = HostHandle::from_raw(99);
        assert_eq!(h.as_u64(), 99);
        assert_eq!(h.to_string(), "host#63");
    }
}
