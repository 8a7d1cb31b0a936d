// SPDX-License-Identifier: MIT OR Apache-2.0
//! Polymorphic port type selection and resolution.
//!
//! A polymorphic port declares, once, the set of types it can ever carry.
//! Which of those it currently behaves as is mutable: either an explicit
//! selection of a concrete candidate, or the `Automatic` marker, in which
//! case the effective type is pushed in by the wiring logic when a wire
//! lands (`resolve`) and cleared when it is removed (`unresolve`).

use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};

/// Error from constructing or mutating a [`PolymorphicPortHandler`]
#[derive(Debug, thiserror::Error)]
pub enum PolymorphicError {
    /// Candidate list was empty at construction
    #[error("polymorphic port needs at least one candidate type")]
    EmptyTypeList,

    /// Selected index past the end of the candidate list
    #[error("selected type index {index} out of range (candidates: {len})")]
    IndexOutOfRange {
        /// The rejected index
        index: usize,
        /// Number of candidate types
        len: usize,
    },

    /// Resolve called while a concrete candidate is selected
    #[error("cannot resolve: selected type is not Automatic")]
    NotAutomatic,
}

/// Resolves the effective type of a port whose type is not fixed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymorphicPortHandler {
    /// Candidate types, fixed at construction, never empty
    types: Vec<TypeHandle>,
    /// Index of the currently selected candidate
    selected: usize,
    /// Concrete type pushed in by wiring while `Automatic` is selected
    resolved: Option<TypeHandle>,
    /// Pending selection-change notification, consumed by the caller
    #[serde(skip)]
    selection_change: Option<usize>,
}

impl PolymorphicPortHandler {
    /// Create a handler over `types` with `selected` as the initial choice.
    ///
    /// Fails if `types` is empty or `selected` is out of range.
    pub fn new(types: Vec<TypeHandle>, selected: usize) -> Result<Self, PolymorphicError> {
        if types.is_empty() {
            return Err(PolymorphicError::EmptyTypeList);
        }
        if selected >= types.len() {
            return Err(PolymorphicError::IndexOutOfRange {
                index: selected,
                len: types.len(),
            });
        }
        Ok(Self {
            types,
            selected,
            resolved: None,
            selection_change: None,
        })
    }

    /// Convenience constructor: candidates with `Automatic` prepended and
    /// selected
    pub fn automatic(mut candidates: Vec<TypeHandle>) -> Result<Self, PolymorphicError> {
        candidates.insert(0, TypeHandle::Automatic);
        Self::new(candidates, 0)
    }

    /// The candidate types, in declaration order
    pub fn types(&self) -> &[TypeHandle] {
        &self.types
    }

    /// Index of the current selection
    pub fn selected_type_index(&self) -> usize {
        self.selected
    }

    /// The currently selected candidate
    pub fn selected_type(&self) -> &TypeHandle {
        &self.types[self.selected]
    }

    /// Whether the current selection is the `Automatic` marker
    pub fn is_automatic(&self) -> bool {
        matches!(self.selected_type(), TypeHandle::Automatic)
    }

    /// Change the selection. Out-of-range indices fail and leave the
    /// previous selection untouched. On success a selection-change
    /// notification is pending before this returns.
    pub fn set_selected_type_index(&mut self, index: usize) -> Result<(), PolymorphicError> {
        if index >= self.types.len() {
            return Err(PolymorphicError::IndexOutOfRange {
                index,
                len: self.types.len(),
            });
        }
        if index != self.selected {
            self.selected = index;
            self.selection_change = Some(index);
        }
        Ok(())
    }

    /// Take the pending selection-change notification, if any.
    ///
    /// Dependent port-type recomputation polls this instead of subscribing
    /// to an event bus.
    pub fn take_selection_change(&mut self) -> Option<usize> {
        self.selection_change.take()
    }

    /// Push a concrete type in from the wiring logic.
    ///
    /// Only legal while `Automatic` is selected; otherwise fails with no
    /// state change.
    pub fn resolve(&mut self, data_type: TypeHandle) -> Result<(), PolymorphicError> {
        if !self.is_automatic() {
            return Err(PolymorphicError::NotAutomatic);
        }
        self.resolved = Some(data_type);
        Ok(())
    }

    /// Clear back to Automatic-unresolved. Always legal, idempotent.
    pub fn unresolve(&mut self) {
        self.resolved = None;
    }

    /// The resolved type while `Automatic` is selected: the pushed-in type,
    /// or `Automatic` if none yet. Reads as `Unknown` under a concrete
    /// selection, where resolution is irrelevant.
    pub fn resolved_type(&self) -> TypeHandle {
        if !self.is_automatic() {
            return TypeHandle::Unknown;
        }
        self.resolved.clone().unwrap_or(TypeHandle::Automatic)
    }

    /// The type this port currently behaves as
    pub fn effective_type(&self) -> TypeHandle {
        if self.is_automatic() {
            self.resolved_type()
        } else {
            self.selected_type().clone()
        }
    }

    /// Pure membership test: could this port ever carry `data_type`?
    pub fn can_connect(&self, data_type: &TypeHandle) -> bool {
        self.types.contains(data_type)
    }
}
