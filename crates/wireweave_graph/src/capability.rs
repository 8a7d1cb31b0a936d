// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capability traits gating which operations apply to an element.

use serde::{Deserialize, Serialize};

/// A single boolean capability of a graph element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Can be repositioned by the user
    Movable,
    /// Can be deleted
    Deletable,
    /// Can be renamed
    Renamable,
    /// Can have a custom color
    Colorable,
    /// Can be promoted out of its container
    Ascendable,
    /// Only exists inside a container element
    NeedsContainer,
    /// Participates in copy/paste
    Copiable,
    /// Can be selected in the editor
    Selectable,
}

impl Capability {
    fn bit(self) -> u32 {
        match self {
            Self::Movable => 1 << 0,
            Self::Deletable => 1 << 1,
            Self::Renamable => 1 << 2,
            Self::Colorable => 1 << 3,
            Self::Ascendable => 1 << 4,
            Self::NeedsContainer => 1 << 5,
            Self::Copiable => 1 << 6,
            Self::Selectable => 1 << 7,
        }
    }
}

/// Set of capabilities, stored as a bit mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(u32);

impl Capabilities {
    /// Empty capability set
    pub fn none() -> Self {
        Self(0)
    }

    /// Capabilities of a free-standing node: everything except container
    /// semantics
    pub fn node() -> Self {
        Self::none()
            .with(Capability::Movable)
            .with(Capability::Deletable)
            .with(Capability::Renamable)
            .with(Capability::Colorable)
            .with(Capability::Ascendable)
            .with(Capability::Copiable)
            .with(Capability::Selectable)
    }

    /// Capabilities of a block node: lives inside a context, cannot move or
    /// ascend on its own
    pub fn block() -> Self {
        Self::none()
            .with(Capability::Deletable)
            .with(Capability::Renamable)
            .with(Capability::NeedsContainer)
            .with(Capability::Copiable)
            .with(Capability::Selectable)
    }

    /// Capabilities of a declaration
    pub fn declaration() -> Self {
        Self::none()
            .with(Capability::Deletable)
            .with(Capability::Renamable)
            .with(Capability::Copiable)
            .with(Capability::Selectable)
    }

    /// Capabilities of a port: ports follow their node, nothing applies
    /// directly
    pub fn port() -> Self {
        Self::none()
    }

    /// Capabilities of a wire
    pub fn wire() -> Self {
        Self::none()
            .with(Capability::Deletable)
            .with(Capability::Selectable)
    }

    /// Whether the set contains `capability`
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Add a capability, returning the updated set
    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Remove a capability, returning the updated set
    pub fn without(self, capability: Capability) -> Self {
        Self(self.0 & !capability.bit())
    }

    /// Add a capability in place
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    /// Remove a capability in place
    pub fn remove(&mut self, capability: Capability) {
        self.0 &= !capability.bit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut caps = Capabilities::none();
        assert!(!caps.contains(Capability::Movable));

        caps.insert(Capability::Movable);
        caps.insert(Capability::Renamable);
        assert!(caps.contains(Capability::Movable));
        assert!(caps.contains(Capability::Renamable));
        assert!(!caps.contains(Capability::Colorable));

        caps.remove(Capability::Movable);
        assert!(!caps.contains(Capability::Movable));
        assert!(caps.contains(Capability::Renamable));
    }

    #[test]
    fn test_block_preset_disables_movement() {
        let caps = Capabilities::block();
        assert!(!caps.contains(Capability::Movable));
        assert!(!caps.contains(Capability::Ascendable));
        assert!(caps.contains(Capability::NeedsContainer));
        assert!(caps.contains(Capability::Deletable));
    }

    #[test]
    fn test_node_preset_is_free_standing() {
        let caps = Capabilities::node();
        assert!(caps.contains(Capability::Movable));
        assert!(caps.contains(Capability::Ascendable));
        assert!(!caps.contains(Capability::NeedsContainer));
    }
}
