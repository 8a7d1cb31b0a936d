// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarations: named entities independent of node placement.

use crate::capability::Capabilities;
use crate::element::{ElementCore, ElementId, GraphElement};
use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value-identity handle to the graph asset a declaration lives in.
///
/// External references compare these by value, never by instance, so a
/// serialized reference survives its target graph being reloaded as a
/// different in-memory object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphSourceHandle(pub Uuid);

impl GraphSourceHandle {
    /// Create a new random source handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphSourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A variable declared in this graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclarationModel {
    /// Element identity and ownership
    pub core: ElementCore,
    name: String,
    data_type: TypeHandle,
    exported: bool,
}

impl VariableDeclarationModel {
    /// Create a declaration of `data_type` named `name`
    pub fn new(name: impl Into<String>, data_type: TypeHandle) -> Self {
        Self {
            core: ElementCore::new(Capabilities::declaration()),
            name: name.into(),
            data_type,
            exported: false,
        }
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the declaration
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Declared data type
    pub fn data_type(&self) -> &TypeHandle {
        &self.data_type
    }

    /// Whether the variable is visible outside its graph
    pub fn exported(&self) -> bool {
        self.exported
    }

    /// Set the exported flag
    pub fn set_exported(&mut self, exported: bool) {
        self.exported = exported;
    }
}

impl GraphElement for VariableDeclarationModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }
}

/// A reference to a variable declared in a *different* graph.
///
/// Resolution is indirect: a source handle plus the stable id of the
/// variable within that source. Two references are the same variable iff
/// both parts are equal by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalVariableDeclarationModel {
    /// Element identity and ownership
    pub core: ElementCore,
    name: String,
    data_type: TypeHandle,
    source: GraphSourceHandle,
    variable_id: ElementId,
}

impl ExternalVariableDeclarationModel {
    /// Create a reference to `variable_id` inside `source`
    pub fn new(
        name: impl Into<String>,
        data_type: TypeHandle,
        source: GraphSourceHandle,
        variable_id: ElementId,
    ) -> Self {
        Self {
            core: ElementCore::new(Capabilities::declaration()),
            name: name.into(),
            data_type,
            source,
            variable_id,
        }
    }

    /// Display name carried with the reference
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Update the carried display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Declared data type of the referenced variable
    pub fn data_type(&self) -> &TypeHandle {
        &self.data_type
    }

    /// The source graph handle
    pub fn source(&self) -> GraphSourceHandle {
        self.source
    }

    /// The referenced variable's stable id within the source
    pub fn variable_id(&self) -> ElementId {
        self.variable_id
    }

    /// True iff this reference points at `variable_id` inside `source`,
    /// both compared by value
    pub fn is_referring_to(&self, source: GraphSourceHandle, variable_id: ElementId) -> bool {
        self.source == source && self.variable_id == variable_id
    }

    /// True iff `other` points at the same underlying variable
    pub fn refers_to_same_variable_as(&self, other: &ExternalVariableDeclarationModel) -> bool {
        other.is_referring_to(self.source, self.variable_id)
    }
}

impl GraphElement for ExternalVariableDeclarationModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }
}

/// The closed set of declaration shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeclarationModel {
    /// Variable declared in this graph
    Variable(VariableDeclarationModel),
    /// Reference to a variable declared elsewhere
    External(ExternalVariableDeclarationModel),
}

impl DeclarationModel {
    /// Display name of either shape
    pub fn name(&self) -> &str {
        match self {
            Self::Variable(v) => v.name(),
            Self::External(e) => e.name(),
        }
    }

    /// Data type of either shape
    pub fn data_type(&self) -> &TypeHandle {
        match self {
            Self::Variable(v) => v.data_type(),
            Self::External(e) => e.data_type(),
        }
    }

    /// Rename either shape
    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Self::Variable(v) => v.set_name(name),
            Self::External(e) => e.set_name(name),
        }
    }

    /// The external reference, if this is one
    pub fn as_external(&self) -> Option<&ExternalVariableDeclarationModel> {
        match self {
            Self::External(e) => Some(e),
            Self::Variable(_) => None,
        }
    }
}

impl GraphElement for DeclarationModel {
    fn core(&self) -> &ElementCore {
        match self {
            Self::Variable(v) => v.core(),
            Self::External(e) => e.core(),
        }
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        match self {
            Self::Variable(v) => v.core_mut(),
            Self::External(e) => e.core_mut(),
        }
    }
}
