//! Resource identity tracker.
//!
//! Every object a creation call returns is recorded once in an arena under a
//! minted `{tag, seq}` id. Host handles are only lookup keys into that arena;
//! the host keeps ownership. Uniform and attribute locations are cached here
//! too, since both are resolved back to names when the replay is written.

use glcap_core::{CaptureError, CoreResult, HostHandle, ResourceId, TypeTag};
use glcap_log::DeferredResolver;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{trace, warn};

/// One tracked resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Replay identity
    pub id: ResourceId,
    /// Host identity at creation
    pub handle: HostHandle,
}

/// What a uniform location handle stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLocation {
    /// Program the location was queried on
    pub program: ResourceId,
    /// Uniform name as queried
    pub name: String,
}

/// Tracker for one captured context
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    records: Vec<ResourceRecord>,
    by_handle: HashMap<HostHandle, usize>,
    counters: IndexMap<TypeTag, u32>,
    uniform_cache: HashMap<(HostHandle, String), HostHandle>,
    locations: HashMap<HostHandle, UniformLocation>,
    attrib_cache: HashMap<(HostHandle, String), u32>,
    attribs: HashMap<ResourceId, IndexMap<String, u32>>,
}

impl ResourceTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a freshly created host object with the next id of `tag`
    pub fn tag(&mut self, tag: TypeTag, handle: HostHandle) -> ResourceId {
        let counter = self.counters.entry(tag.clone()).or_insert(0);
        let id = ResourceId::new(tag, *counter);
        *counter += 1;

        self.by_handle.insert(handle, self.records.len());
        self.records.push(ResourceRecord {
            id: id.clone(),
            handle,
        });
        trace!(resource = %id, %handle, "resource tagged");
        id
    }

    /// Replay identity of a handle, if it was tagged
    #[must_use]
    pub fn resolve(&self, handle: HostHandle) -> Option<&ResourceId> {
        self.by_handle.get(&handle).map(|&i| &self.records[i].id)
    }

    /// Replay identity of a handle referenced by `function`
    ///
    /// # Errors
    ///
    /// Returns `UntrackedResource` if no creation call tagged the handle
    pub fn require(&self, function: &str, handle: HostHandle) -> CoreResult<ResourceId> {
        match self.resolve(handle) {
            Some(id) => Ok(id.clone()),
            None => {
                warn!(function, %handle, "call references an untracked resource");
                Err(CaptureError::UntrackedResource {
                    function: function.to_string(),
                    handle: handle.as_u64(),
                })
            }
        }
    }

    /// Cached uniform location for `(program, name)`
    #[must_use]
    pub fn cached_uniform_location(&self, program: HostHandle, name: &str) -> Option<HostHandle> {
        self.uniform_cache
            .get(&(program, name.to_string()))
            .copied()
    }

    /// Remember a non-null uniform location.
    ///
    /// Locations on untracked programs are cached for the host's sake but
    /// cannot be resolved to a name later.
    pub fn remember_uniform_location(&mut self, program: HostHandle, name: &str, location: HostHandle) {
        self.uniform_cache
            .insert((program, name.to_string()), location);
        if let Some(program) = self.resolve(program).cloned() {
            self.locations.insert(
                location,
                UniformLocation {
                    program,
                    name: name.to_string(),
                },
            );
        }
    }

    /// What a uniform location handle stands for
    #[must_use]
    pub fn uniform_location(&self, location: HostHandle) -> Option<&UniformLocation> {
        self.locations.get(&location)
    }

    /// Cached attribute location for `(program, name)`
    #[must_use]
    pub fn cached_attrib_location(&self, program: HostHandle, name: &str) -> Option<u32> {
        self.attrib_cache.get(&(program, name.to_string())).copied()
    }

    /// Remember an attribute location. Negative results are not cached.
    pub fn remember_attrib_location(&mut self, program: HostHandle, name: &str, location: i64) {
        let Ok(location) = u32::try_from(location) else {
            return;
        };
        self.attrib_cache
            .insert((program, name.to_string()), location);
        if let Some(program) = self.resolve(program).cloned() {
            self.attribs
                .entry(program)
                .or_default()
                .insert(name.to_string(), location);
        }
    }

    /// Drop cached uniform and attribute locations of `program`.
    ///
    /// Linking invalidates every location handed out before. The learned
    /// bindings stay, the next link is replayed with them.
    pub fn forget_locations(&mut self, program: HostHandle) {
        self.uniform_cache.retain(|(p, _), _| *p != program);
        self.attrib_cache.retain(|(p, _), _| *p != program);
    }

    /// Type tags in first-creation order
    pub fn tags(&self) -> impl Iterator<Item = &TypeTag> {
        self.counters.keys()
    }

    /// Tracked resources in creation order
    #[must_use]
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Number of tracked resources
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was tagged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DeferredResolver for ResourceTracker {
    fn attrib_bindings(&self, program: &ResourceId) -> Vec<(String, u32)> {
        self.attribs
            .get(program)
            .map(|names| names.iter().map(|(n, l)| (n.clone(), *l)).collect())
            .unwrap_or_default()
    }
}
