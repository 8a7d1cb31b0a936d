// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node models: the closed family of node shapes in a graph.
//!
//! Rather than a deep inheritance tree, a node is one struct carrying the
//! topology every shape shares (ports, title, placement) plus a [`NodeKind`]
//! tag for the shape-specific state. Capabilities gate which operations the
//! editor may apply to each shape.

use crate::capability::Capabilities;
use crate::constant::{Constant, ConstantError, Value};
use crate::element::{ElementCore, ElementId, GraphElement};
use crate::polymorphic::{PolymorphicError, PolymorphicPortHandler};
use crate::port::{PortDirection, PortModel, PortOrientation, PortTypeSource};
use crate::types::TypeHandle;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Shape-specific state of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// General node with arbitrary input/output ports
    InputOutput,
    /// Produces a single typed literal on one output port
    Constant {
        /// The embedded literal
        value: Constant,
    },
    /// Usage of a variable declaration; one output mirroring its type
    Variable {
        /// The declaration this node reads
        declaration: ElementId,
    },
    /// Entry half of a portal: one input feeding the shared declaration
    PortalEntry {
        /// The declaration shared by the portal pair
        declaration: ElementId,
    },
    /// Exit half of a portal: one output fed by the shared declaration
    PortalExit {
        /// The declaration shared by the portal pair
        declaration: ElementId,
    },
    /// Container node owning an ordered list of block children
    Context {
        /// Child block node ids, in display order
        blocks: Vec<ElementId>,
    },
    /// Node that only exists inside a context container
    Block {
        /// The owning context node
        container: ElementId,
    },
}

/// A node in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeModel {
    /// Element identity and ownership
    pub core: ElementCore,
    title: String,
    position: [f32; 2],
    color: Option<[u8; 3]>,
    input_ports: IndexMap<String, PortModel>,
    output_ports: IndexMap<String, PortModel>,
    options: IndexMap<String, PortModel>,
    kind: NodeKind,
}

impl NodeModel {
    fn with_kind(title: impl Into<String>, kind: NodeKind, capabilities: Capabilities) -> Self {
        Self {
            core: ElementCore::new(capabilities),
            title: title.into(),
            position: [0.0, 0.0],
            color: None,
            input_ports: IndexMap::new(),
            output_ports: IndexMap::new(),
            options: IndexMap::new(),
            kind,
        }
    }

    /// Create a general input/output-ports node; ports are added through
    /// [`NodeModel::define_ports`]
    pub fn new_input_output(title: impl Into<String>) -> Self {
        Self::with_kind(title, NodeKind::InputOutput, Capabilities::node())
    }

    /// Create a state node: vertical exec ports for incoming and outgoing
    /// transitions
    pub fn new_state(title: impl Into<String>) -> Self {
        let mut node = Self::new_input_output(title);
        node.define_ports(|scope| {
            scope.add_port(PortModel::input("in", TypeHandle::Exec).vertical());
            scope.add_port(PortModel::output("out", TypeHandle::Exec).vertical());
        });
        node
    }

    /// Create a constant node producing a literal of `declared_type`
    pub fn new_constant(title: impl Into<String>, declared_type: TypeHandle) -> Self {
        let mut node = Self::with_kind(
            title,
            NodeKind::Constant {
                value: Constant::new(declared_type.clone()),
            },
            Capabilities::node(),
        );
        let id = node.core.id;
        if let NodeKind::Constant { value } = &mut node.kind {
            value.set_owner(Some(id));
        }
        node.define_ports(|scope| {
            scope.add_output_port("out", declared_type);
        });
        node
    }

    /// Create a variable usage node reading `declaration` of `data_type`
    pub fn new_variable(
        title: impl Into<String>,
        declaration: ElementId,
        data_type: TypeHandle,
    ) -> Self {
        let mut node = Self::with_kind(
            title,
            NodeKind::Variable { declaration },
            Capabilities::node(),
        );
        node.define_ports(|scope| {
            scope.add_output_port("value", data_type);
        });
        node
    }

    /// Create the entry half of a portal over `declaration`
    pub fn new_portal_entry(
        title: impl Into<String>,
        declaration: ElementId,
        data_type: TypeHandle,
    ) -> Self {
        let mut node = Self::with_kind(
            title,
            NodeKind::PortalEntry { declaration },
            Capabilities::node(),
        );
        node.define_ports(|scope| {
            scope.add_input_port("in", data_type);
        });
        node
    }

    /// Create the exit half of a portal over `declaration`
    pub fn new_portal_exit(
        title: impl Into<String>,
        declaration: ElementId,
        data_type: TypeHandle,
    ) -> Self {
        let mut node = Self::with_kind(
            title,
            NodeKind::PortalExit { declaration },
            Capabilities::node(),
        );
        node.define_ports(|scope| {
            scope.add_output_port("out", data_type);
        });
        node
    }

    /// Create a context node that will contain block children
    pub fn new_context(title: impl Into<String>) -> Self {
        Self::with_kind(
            title,
            NodeKind::Context { blocks: Vec::new() },
            Capabilities::node(),
        )
    }

    /// Create a block node. Blocks only exist inside a context; register
    /// them through [`crate::graph::GraphModel::add_block`].
    pub fn new_block(title: impl Into<String>, container: ElementId) -> Self {
        Self::with_kind(title, NodeKind::Block { container }, Capabilities::block())
    }

    /// Populate ports by declaring them against a definition scope.
    ///
    /// This is the node-definition boundary: concrete node behaviors decide
    /// what ports exist, the model decides how they participate in identity
    /// and ownership.
    pub fn define_ports(&mut self, define: impl FnOnce(&mut PortDefinitionScope<'_>)) {
        let mut scope = PortDefinitionScope { node: self };
        define(&mut scope);
    }

    /// Shape-specific state
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Node title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the node title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Position in the graph canvas
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Set the canvas position
    pub fn set_position(&mut self, position: [f32; 2]) {
        self.position = position;
    }

    /// Custom color, if any
    pub fn color(&self) -> Option<[u8; 3]> {
        self.color
    }

    /// Set or clear the custom color
    pub fn set_color(&mut self, color: Option<[u8; 3]>) {
        self.color = color;
    }

    /// Input ports in display order
    pub fn input_ports(&self) -> impl Iterator<Item = &PortModel> {
        self.input_ports.values()
    }

    /// Output ports in display order
    pub fn output_ports(&self) -> impl Iterator<Item = &PortModel> {
        self.output_ports.values()
    }

    /// Node options (inspector-only inputs) in display order
    pub fn node_options(&self) -> impl Iterator<Item = &PortModel> {
        self.options.values()
    }

    /// All ports: inputs, outputs, then options
    pub fn ports(&self) -> impl Iterator<Item = &PortModel> {
        self.input_ports
            .values()
            .chain(self.output_ports.values())
            .chain(self.options.values())
    }

    /// Look up a port by its stable id
    pub fn port(&self, unique_id: &str) -> Option<&PortModel> {
        self.input_ports
            .get(unique_id)
            .or_else(|| self.output_ports.get(unique_id))
            .or_else(|| self.options.get(unique_id))
    }

    /// Look up a port by its stable id, mutable
    pub fn port_mut(&mut self, unique_id: &str) -> Option<&mut PortModel> {
        if let Some(port) = self.input_ports.get_mut(unique_id) {
            return Some(port);
        }
        if let Some(port) = self.output_ports.get_mut(unique_id) {
            return Some(port);
        }
        self.options.get_mut(unique_id)
    }

    /// From this node's ports of the direction opposite to `other`, pick the
    /// first one (in display order) the compatibility predicate accepts.
    ///
    /// The predicate is the graph-level policy, called as
    /// `compatible(output_port, input_port)`.
    pub fn port_fit_to_connect_to(
        &self,
        other: &PortModel,
        compatible: &dyn Fn(&PortModel, &PortModel) -> bool,
    ) -> Option<&PortModel> {
        match other.direction() {
            PortDirection::Input => self
                .output_ports
                .values()
                .find(|candidate| compatible(candidate, other)),
            PortDirection::Output => self
                .input_ports
                .values()
                .find(|candidate| compatible(other, candidate)),
        }
    }

    /// The embedded literal of a constant node.
    ///
    /// Panics if this is not a constant node; callers dispatch on
    /// [`NodeModel::kind`] first.
    pub fn constant_value(&self) -> &Constant {
        match &self.kind {
            NodeKind::Constant { value } => value,
            _ => panic!("constant_value on non-constant node {:?}", self.core.id),
        }
    }

    /// Mutate the constant node's literal in place. Fails on type mismatch
    /// with no mutation.
    pub fn set_constant_value(&mut self, value: Value) -> Result<(), ConstantError> {
        match &mut self.kind {
            NodeKind::Constant { value: constant } => constant.set_value(value),
            _ => panic!("set_constant_value on non-constant node {:?}", self.core.id),
        }
    }

    /// Swap in a whole new constant, enforcing single ownership: the old
    /// value's owner is cleared before the new value is claimed. Returns the
    /// detached previous constant.
    pub fn replace_constant(&mut self, mut value: Constant) -> Result<Constant, ConstantError> {
        let id = self.core.id;
        match &mut self.kind {
            NodeKind::Constant { value: current } => {
                if value.declared_type() != current.declared_type() {
                    return Err(ConstantError::TypeMismatch {
                        declared: current.declared_type().clone(),
                        actual: value.declared_type().clone(),
                    });
                }
                current.set_owner(None);
                value.set_owner(Some(id));
                Ok(std::mem::replace(current, value))
            }
            _ => panic!("replace_constant on non-constant node {:?}", id),
        }
    }

    /// The declaration referenced by a variable or portal node
    pub fn declaration(&self) -> Option<ElementId> {
        match &self.kind {
            NodeKind::Variable { declaration }
            | NodeKind::PortalEntry { declaration }
            | NodeKind::PortalExit { declaration } => Some(*declaration),
            _ => None,
        }
    }

    /// Child block ids of a context node, in display order
    pub fn blocks(&self) -> &[ElementId] {
        match &self.kind {
            NodeKind::Context { blocks } => blocks,
            _ => &[],
        }
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<ElementId> {
        match &mut self.kind {
            NodeKind::Context { blocks } => blocks,
            _ => panic!("blocks_mut on non-context node {:?}", self.core.id),
        }
    }

    /// The container of a block node
    pub fn container(&self) -> Option<ElementId> {
        match &self.kind {
            NodeKind::Block { container } => Some(*container),
            _ => None,
        }
    }

    pub(crate) fn set_container(&mut self, container: ElementId) {
        match &mut self.kind {
            NodeKind::Block { container: current } => *current = container,
            _ => panic!("set_container on non-block node {:?}", self.core.id),
        }
    }
}

impl GraphElement for NodeModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }

    fn dependents_mut(&mut self, visit: &mut dyn FnMut(&mut dyn GraphElement)) {
        for port in self.input_ports.values_mut() {
            visit(port);
        }
        for port in self.output_ports.values_mut() {
            visit(port);
        }
        for port in self.options.values_mut() {
            visit(port);
        }
    }

    fn on_after_deserialize(&mut self) {
        self.core.after_deserialize();
        self.dependents_mut(&mut |dep| dep.on_after_deserialize());
        // Re-link the embedded value; its owner is skipped by serde.
        let id = self.core.id;
        if let NodeKind::Constant { value } = &mut self.kind {
            value.set_owner(Some(id));
        }
    }

    fn on_after_paste(&mut self) {
        self.assign_new_id();
        self.dependents_mut(&mut |dep| dep.on_after_paste());
        let id = self.core.id;
        if let NodeKind::Constant { value } = &mut self.kind {
            value.set_owner(Some(id));
        }
    }
}

/// Scope handed to a node's port definition callback
pub struct PortDefinitionScope<'a> {
    node: &'a mut NodeModel,
}

impl PortDefinitionScope<'_> {
    /// Add a fully-built port, placed by its direction.
    ///
    /// Panics if the node already has a port with the same stable id:
    /// duplicate ids are a node-definition bug, not a runtime condition.
    pub fn add_port(&mut self, port: PortModel) -> &mut PortModel {
        assert!(
            self.node.port(port.unique_id()).is_none(),
            "duplicate port id {:?} on node {:?}",
            port.unique_id(),
            self.node.core.id
        );
        let id = port.unique_id().to_owned();
        let collection = match port.direction() {
            PortDirection::Input => &mut self.node.input_ports,
            PortDirection::Output => &mut self.node.output_ports,
        };
        collection.entry(id).or_insert(port)
    }

    /// Add a horizontal fixed-type input port
    pub fn add_input_port(
        &mut self,
        unique_id: impl Into<String>,
        data_type: TypeHandle,
    ) -> &mut PortModel {
        self.add_port(PortModel::input(unique_id, data_type))
    }

    /// Add a horizontal fixed-type output port
    pub fn add_output_port(
        &mut self,
        unique_id: impl Into<String>,
        data_type: TypeHandle,
    ) -> &mut PortModel {
        self.add_port(PortModel::output(unique_id, data_type))
    }

    /// Add a polymorphic input port over `candidates`, starting Automatic
    pub fn add_polymorphic_input_port(
        &mut self,
        unique_id: impl Into<String>,
        candidates: Vec<TypeHandle>,
    ) -> Result<&mut PortModel, PolymorphicError> {
        let unique_id = unique_id.into();
        let handler = PolymorphicPortHandler::automatic(candidates)?;
        Ok(self.add_port(PortModel::new(
            unique_id.clone(),
            unique_id,
            PortDirection::Input,
            PortOrientation::Horizontal,
            PortTypeSource::Polymorphic(handler),
        )))
    }

    /// Add a node option: an inspector-only input with a default value
    pub fn add_node_option(
        &mut self,
        unique_id: impl Into<String>,
        default: Value,
    ) -> &mut PortModel {
        let unique_id = unique_id.into();
        assert!(
            self.node.port(&unique_id).is_none(),
            "duplicate port id {:?} on node {:?}",
            unique_id,
            self.node.core.id
        );
        let port = PortModel::input(unique_id.clone(), default.type_handle())
            .with_default(Constant::from_value(default));
        self.node.options.entry(unique_id).or_insert(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::GraphId;

    fn math_node() -> NodeModel {
        let mut node = NodeModel::new_input_output("Add");
        node.define_ports(|scope| {
            scope.add_input_port("a", TypeHandle::Float);
            scope.add_input_port("b", TypeHandle::Float);
            scope.add_output_port("sum", TypeHandle::Float);
            scope.add_node_option("clamp", Value::Bool(false));
        });
        node
    }

    #[test]
    fn test_ports_indexed_and_ordered() {
        let node = math_node();
        let ordered: Vec<&str> = node.input_ports().map(PortModel::unique_id).collect();
        assert_eq!(ordered, ["a", "b"]);
        assert_eq!(node.port("sum").unwrap().data_type(), TypeHandle::Float);
        assert!(node.port("missing").is_none());
        // Options are reachable by id but not listed among inputs.
        assert!(node.port("clamp").is_some());
        assert_eq!(node.input_ports().count(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate port id")]
    fn test_duplicate_port_id_panics() {
        let mut node = NodeModel::new_input_output("Bad");
        node.define_ports(|scope| {
            scope.add_input_port("x", TypeHandle::Int);
            scope.add_input_port("x", TypeHandle::Float);
        });
    }

    #[test]
    fn test_set_graph_reaches_all_ports() {
        let mut node = math_node();
        let graph = GraphId::new();
        node.set_graph(Some(graph));
        assert!(node.ports().all(|p| p.graph() == Some(graph)));
    }

    #[test]
    fn test_assign_new_ids_recursively_no_collisions() {
        let mut node = math_node();
        let mut old: Vec<ElementId> = vec![node.id()];
        old.extend(node.ports().map(GraphElement::id));

        node.assign_new_id_recursively();

        let mut fresh: Vec<ElementId> = vec![node.id()];
        fresh.extend(node.ports().map(GraphElement::id));
        for id in &fresh {
            assert!(!old.contains(id));
        }
        fresh.sort_by_key(|id| id.0);
        fresh.dedup();
        assert_eq!(fresh.len(), old.len());
    }

    #[test]
    fn test_constant_node_value_ownership() {
        let mut node = NodeModel::new_constant("Pi", TypeHandle::Float);
        assert_eq!(node.constant_value().owner(), Some(node.id()));

        node.set_constant_value(Value::Float(3.14)).unwrap();
        assert_eq!(*node.constant_value().value(), Value::Float(3.14));

        let err = node.set_constant_value(Value::Int(3)).unwrap_err();
        assert!(matches!(err, ConstantError::TypeMismatch { .. }));
        assert_eq!(*node.constant_value().value(), Value::Float(3.14));
    }

    #[test]
    fn test_replace_constant_swaps_ownership() {
        let mut node = NodeModel::new_constant("C", TypeHandle::Int);
        let replacement = Constant::from_value(Value::Int(42));

        let old = node.replace_constant(replacement).unwrap();
        assert!(old.owner().is_none());
        assert_eq!(node.constant_value().owner(), Some(node.id()));
        assert_eq!(*node.constant_value().value(), Value::Int(42));

        let wrong = Constant::from_value(Value::String("x".into()));
        assert!(node.replace_constant(wrong).is_err());
    }

    #[test]
    fn test_port_fit_to_connect_to_picks_first_compatible() {
        let mut producer = NodeModel::new_input_output("Producer");
        producer.define_ports(|scope| {
            scope.add_output_port("s", TypeHandle::String);
            scope.add_output_port("f", TypeHandle::Float);
            scope.add_output_port("g", TypeHandle::Float);
        });
        let consumer_port = PortModel::input("x", TypeHandle::Float);

        let compatible = |from: &PortModel, to: &PortModel| from.data_type() == to.data_type();
        let fit = producer
            .port_fit_to_connect_to(&consumer_port, &compatible)
            .unwrap();
        assert_eq!(fit.unique_id(), "f");

        let exotic = PortModel::input("x", TypeHandle::Entity);
        assert!(producer
            .port_fit_to_connect_to(&exotic, &compatible)
            .is_none());
    }

    #[test]
    fn test_paste_hook_repoints_constant_owner() {
        let original = NodeModel::new_constant("C", TypeHandle::Bool);
        let mut clone = original.clone();
        clone.on_after_paste();

        assert_ne!(clone.id(), original.id());
        assert_eq!(clone.constant_value().owner(), Some(clone.id()));
        assert_eq!(original.constant_value().owner(), Some(original.id()));
    }
}
