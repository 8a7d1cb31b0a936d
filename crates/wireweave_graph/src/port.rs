// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ports: typed connection points on nodes.

use crate::capability::Capabilities;
use crate::constant::Constant;
use crate::element::{ElementCore, ElementId, GraphElement};
use crate::polymorphic::PolymorphicPortHandler;
use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl PortDirection {
    /// The opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Which side of the node a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortOrientation {
    /// Data ports: left/right edges
    Horizontal,
    /// State-machine ports: top/bottom edges
    Vertical,
}

/// How a port's data type is determined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortTypeSource {
    /// Declared once, never changes
    Fixed(TypeHandle),
    /// Chosen from a candidate set, possibly resolved from wiring
    Polymorphic(PolymorphicPortHandler),
}

/// Reference to a port: owning node plus the port's stable id within it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: ElementId,
    /// Stable port id, unique within the node
    pub port_id: String,
}

impl PortRef {
    /// Create a port reference
    pub fn new(node: ElementId, port_id: impl Into<String>) -> Self {
        Self {
            node,
            port_id: port_id.into(),
        }
    }
}

/// A typed connection point on a node.
///
/// The stable string id is unique within the owning node and survives
/// reloads; the element ID does not need to (ports are re-created by the
/// node's port definition callback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortModel {
    /// Element identity and ownership
    pub core: ElementCore,
    unique_id: String,
    display_name: String,
    direction: PortDirection,
    orientation: PortOrientation,
    type_source: PortTypeSource,
    default_value: Option<Constant>,
}

impl PortModel {
    /// Create a port with every attribute spelled out
    pub fn new(
        unique_id: impl Into<String>,
        display_name: impl Into<String>,
        direction: PortDirection,
        orientation: PortOrientation,
        type_source: PortTypeSource,
    ) -> Self {
        Self {
            core: ElementCore::new(Capabilities::port()),
            unique_id: unique_id.into(),
            display_name: display_name.into(),
            direction,
            orientation,
            type_source,
            default_value: None,
        }
    }

    /// Create a horizontal fixed-type input port
    pub fn input(unique_id: impl Into<String>, data_type: TypeHandle) -> Self {
        let unique_id = unique_id.into();
        let display_name = unique_id.clone();
        Self::new(
            unique_id,
            display_name,
            PortDirection::Input,
            PortOrientation::Horizontal,
            PortTypeSource::Fixed(data_type),
        )
    }

    /// Create a horizontal fixed-type output port
    pub fn output(unique_id: impl Into<String>, data_type: TypeHandle) -> Self {
        let unique_id = unique_id.into();
        let display_name = unique_id.clone();
        Self::new(
            unique_id,
            display_name,
            PortDirection::Output,
            PortOrientation::Horizontal,
            PortTypeSource::Fixed(data_type),
        )
    }

    /// Switch the port to vertical orientation (state-machine side)
    pub fn vertical(mut self) -> Self {
        self.orientation = PortOrientation::Vertical;
        self
    }

    /// Attach an embedded default value; the constant's owner becomes this
    /// port
    pub fn with_default(mut self, mut value: Constant) -> Self {
        value.set_owner(Some(self.core.id));
        self.default_value = Some(value);
        self
    }

    /// Stable id, unique within the owning node
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Port direction
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Port orientation
    pub fn orientation(&self) -> PortOrientation {
        self.orientation
    }

    /// The embedded default value, if any
    pub fn default_value(&self) -> Option<&Constant> {
        self.default_value.as_ref()
    }

    /// The polymorphic handler, if this port's type is not fixed
    pub fn polymorphic(&self) -> Option<&PolymorphicPortHandler> {
        match &self.type_source {
            PortTypeSource::Polymorphic(handler) => Some(handler),
            PortTypeSource::Fixed(_) => None,
        }
    }

    /// Mutable access to the polymorphic handler, if any
    pub fn polymorphic_mut(&mut self) -> Option<&mut PolymorphicPortHandler> {
        match &mut self.type_source {
            PortTypeSource::Polymorphic(handler) => Some(handler),
            PortTypeSource::Fixed(_) => None,
        }
    }

    /// The type this port currently behaves as.
    ///
    /// Fixed ports return their declared type; polymorphic ports return the
    /// selected candidate, or the resolved type while `Automatic` is
    /// selected.
    pub fn data_type(&self) -> TypeHandle {
        match &self.type_source {
            PortTypeSource::Fixed(data_type) => data_type.clone(),
            PortTypeSource::Polymorphic(handler) => handler.effective_type(),
        }
    }
}

impl GraphElement for PortModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn on_after_deserialize(&mut self) {
        self.core.after_deserialize();
        // Raw deserialization leaves the default's owner cleared.
        if let Some(value) = &mut self.default_value {
            value.set_owner(Some(self.core.id));
        }
    }

    fn on_after_paste(&mut self) {
        self.assign_new_id();
        if let Some(value) = &mut self.default_value {
            value.set_owner(Some(self.core.id));
        }
    }
}
