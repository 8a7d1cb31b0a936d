// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data model for the WireWeave editor.
//!
//! This crate is the mutable, serializable object graph behind the editor:
//! nodes, typed ports, wires, variable declarations, and state-machine
//! transitions, with stable identity and precise change tracking.
//!
//! ## Architecture
//!
//! - Every element carries an [`element::ElementCore`]: a uuid identity, a
//!   handle back to its owning graph, a serialization version, and a
//!   capability set. The [`element::GraphElement`] trait cascades ownership
//!   and identity operations through dependent sub-elements.
//! - [`graph::GraphModel`] is the aggregate root: it owns every element in
//!   id-keyed registries and is the only sanctioned membership path.
//! - Ports resolve their type statically or through a
//!   [`polymorphic::PolymorphicPortHandler`] driven by what they are wired
//!   to.
//! - Edits made inside a change batch accumulate a minimal
//!   [`change::ChangeDescription`] for incremental view updates.
//!
//! Rendering, evaluation, undo, and asset persistence live outside this
//! crate and talk to it through the hooks on [`element::GraphElement`] and
//! the registries on [`graph::GraphModel`].

pub mod capability;
pub mod change;
pub mod constant;
pub mod declaration;
pub mod element;
pub mod graph;
pub mod node;
pub mod polymorphic;
pub mod port;
pub mod transition;
pub mod types;
pub mod wire;

pub use capability::{Capabilities, Capability};
pub use change::{ChangeDescription, ChangeHint};
pub use constant::{Constant, ConstantError, Value};
pub use declaration::{
    DeclarationModel, ExternalVariableDeclarationModel, GraphSourceHandle,
    VariableDeclarationModel,
};
pub use element::{ElementId, GraphElement, GraphId, SerializationVersion};
pub use graph::{GraphModel, WireError};
pub use node::{NodeKind, NodeModel, PortDefinitionScope};
pub use polymorphic::{PolymorphicError, PolymorphicPortHandler};
pub use port::{PortDirection, PortModel, PortOrientation, PortRef, PortTypeSource};
pub use transition::{ConditionModel, TransitionModel, TransitionSupportKind};
pub use types::TypeHandle;
pub use wire::{AnchorSide, WireAnchor, WireModel};
