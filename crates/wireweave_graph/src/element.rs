// SPDX-License-Identifier: MIT OR Apache-2.0
//! Base element identity and ownership for all graph model types.

use crate::capability::Capabilities;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a graph element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Create a new random element ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an ID from a raw 128-bit value (deterministic, for tests and
    /// stable external references)
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a graph model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a new random graph ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

/// Version stamp for the persisted shape of an element.
///
/// Monotonic: new variants are appended, never reordered. Migration logic
/// for older shapes lives in the persistence layer; the model only stamps
/// the current version on serialize and keeps whatever was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SerializationVersion {
    /// First persisted shape
    Initial,
    /// Ports gained stable string ids
    StablePortIds,
    /// Anchors stored per wire end
    WireAnchors,
}

impl SerializationVersion {
    /// The version stamped on elements serialized by this build
    pub const CURRENT: Self = Self::WireAnchors;
}

impl Default for SerializationVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Common state carried by every graph element.
///
/// The owning graph is a handle, never a pointer: elements are owned by the
/// graph's registries and only remember which graph they belong to. The
/// handle is runtime-only; [`crate::graph::GraphModel`] restores it after
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCore {
    /// Unique element ID
    pub id: ElementId,
    /// Handle of the owning graph, set by registration
    #[serde(skip)]
    pub graph: Option<GraphId>,
    /// Persisted shape version, stamped on serialize
    #[serde(default)]
    pub version: SerializationVersion,
    /// Capability set gating which operations apply to this element
    pub capabilities: Capabilities,
    /// Snapshot of the ID taken by the pre-serialize hook. Used to recover
    /// identity from formats where the primary ID field was absent.
    #[serde(default)]
    saved_id: Option<ElementId>,
}

impl ElementCore {
    /// Create core state with a fresh ID and the given capabilities
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            id: ElementId::new(),
            graph: None,
            version: SerializationVersion::CURRENT,
            capabilities,
            saved_id: None,
        }
    }

    /// Snapshot identity and stamp the current version before serialization
    pub fn before_serialize(&mut self) {
        self.saved_id = Some(self.id);
        self.version = SerializationVersion::CURRENT;
    }

    /// Recover identity after deserialization
    pub fn after_deserialize(&mut self) {
        if let Some(saved) = self.saved_id {
            self.id = saved;
        }
    }
}

/// Behavior shared by every graph element.
///
/// The ownership cascade runs through [`GraphElement::dependents_mut`]:
/// dependents are sub-elements whose lifetime mirrors this element's (ports
/// on a node). Dependents form a tree by contract - a dependent never lists
/// an ancestor - so the recursive operations terminate.
pub trait GraphElement {
    /// Shared element state
    fn core(&self) -> &ElementCore;

    /// Shared element state, mutable
    fn core_mut(&mut self) -> &mut ElementCore;

    /// Visit each dependent sub-element. The default is a leaf element.
    fn dependents_mut(&mut self, _visit: &mut dyn FnMut(&mut dyn GraphElement)) {}

    /// This element's ID
    fn id(&self) -> ElementId {
        self.core().id
    }

    /// The owning graph, if registered
    fn graph(&self) -> Option<GraphId> {
        self.core().graph
    }

    /// Capability set of this element
    fn capabilities(&self) -> Capabilities {
        self.core().capabilities
    }

    /// Set the owning graph handle, cascading to every dependent.
    ///
    /// Idempotent: re-assigning the same graph leaves the element in the
    /// same state.
    fn set_graph(&mut self, graph: Option<GraphId>) {
        self.core_mut().graph = graph;
        self.dependents_mut(&mut |dep| dep.set_graph(graph));
    }

    /// Replace this element's ID with a fresh one
    fn assign_new_id(&mut self) {
        self.core_mut().id = ElementId::new();
    }

    /// Replace this element's ID and every dependent's ID with fresh ones.
    /// Called after cloning so the copy never collides with the original.
    fn assign_new_id_recursively(&mut self) {
        self.assign_new_id();
        self.dependents_mut(&mut |dep| dep.assign_new_id_recursively());
    }

    /// Hook run by the persistence collaborator before serialization
    fn on_before_serialize(&mut self) {
        self.core_mut().before_serialize();
        self.dependents_mut(&mut |dep| dep.on_before_serialize());
    }

    /// Hook run by the persistence collaborator after deserialization
    fn on_after_deserialize(&mut self) {
        self.core_mut().after_deserialize();
        self.dependents_mut(&mut |dep| dep.on_after_deserialize());
    }

    /// Hook run by the copy/paste collaborator before this element is copied
    fn on_before_copy(&mut self) {
        self.dependents_mut(&mut |dep| dep.on_before_copy());
    }

    /// Hook run by the copy/paste collaborator on the copy, after copying
    fn on_after_copy(&mut self) {
        self.dependents_mut(&mut |dep| dep.on_after_copy());
    }

    /// Hook run by the copy/paste collaborator on the copy when it is pasted.
    /// Assigns a fresh ID and cascades through each dependent's own paste
    /// hook, so concrete types can layer owner fix-ups on top.
    fn on_after_paste(&mut self) {
        self.assign_new_id();
        self.dependents_mut(&mut |dep| dep.on_after_paste());
    }
}
