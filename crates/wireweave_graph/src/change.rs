// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change descriptions: the minimal per-operation diff consumed by the view
//! layer.

use crate::element::ElementId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What kind of observation an element change invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeHint {
    /// Model data changed (title, value, type)
    Data,
    /// Visual styling changed (color)
    Style,
    /// Placement changed (position, anchors)
    Layout,
    /// Grouping/containment changed (blocks, containers)
    Grouping,
}

impl ChangeHint {
    fn bit(self) -> u8 {
        match self {
            Self::Data => 1 << 0,
            Self::Style => 1 << 1,
            Self::Layout => 1 << 2,
            Self::Grouping => 1 << 3,
        }
    }
}

/// Set of change hints accumulated for one element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeHintSet(u8);

impl ChangeHintSet {
    /// Whether the set contains `hint`
    pub fn contains(self, hint: ChangeHint) -> bool {
        self.0 & hint.bit() != 0
    }

    /// Add a hint in place
    pub fn insert(&mut self, hint: ChangeHint) {
        self.0 |= hint.bit();
    }

    /// Whether no hints are set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Operation-scoped record of which elements changed and how.
///
/// Append-only: entries for the same element merge into one hint set, so
/// the view layer walks a minimal diff instead of rebuilding everything.
#[derive(Debug, Clone, Default)]
pub struct ChangeDescription {
    entries: IndexMap<ElementId, ChangeHintSet>,
}

impl ChangeDescription {
    /// Create an empty description
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `element` changed in a way described by `hint`
    pub fn record(&mut self, element: ElementId, hint: ChangeHint) {
        self.entries.entry(element).or_default().insert(hint);
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of changed elements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The changed elements, in first-touched order
    pub fn changed_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries.keys().copied()
    }

    /// The hints recorded for `element`
    pub fn hints_for(&self, element: ElementId) -> ChangeHintSet {
        self.entries.get(&element).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_merge_per_element() {
        let mut changes = ChangeDescription::new();
        let node = ElementId::from_u128(1);

        changes.record(node, ChangeHint::Data);
        changes.record(node, ChangeHint::Style);
        changes.record(ElementId::from_u128(2), ChangeHint::Layout);

        assert_eq!(changes.len(), 2);
        let hints = changes.hints_for(node);
        assert!(hints.contains(ChangeHint::Data));
        assert!(hints.contains(ChangeHint::Style));
        assert!(!hints.contains(ChangeHint::Layout));
    }

    #[test]
    fn test_untouched_element_has_empty_hints() {
        let changes = ChangeDescription::new();
        assert!(changes.is_empty());
        assert!(changes.hints_for(ElementId::from_u128(9)).is_empty());
    }

    #[test]
    fn test_first_touched_order_is_stable() {
        let mut changes = ChangeDescription::new();
        let a = ElementId::from_u128(10);
        let b = ElementId::from_u128(11);
        changes.record(b, ChangeHint::Data);
        changes.record(a, ChangeHint::Data);
        changes.record(b, ChangeHint::Layout);

        let order: Vec<ElementId> = changes.changed_elements().collect();
        assert_eq!(order, [b, a]);
    }
}
