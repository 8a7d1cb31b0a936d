// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wires: connections between two compatible ports.

use crate::capability::Capabilities;
use crate::element::{ElementCore, ElementId, GraphElement};
use crate::port::PortRef;
use crate::transition::TransitionSupportKind;
use serde::{Deserialize, Serialize};

/// Which edge of a node a wire end attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorSide {
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
    /// Right edge
    Right,
}

/// Attachment point of one wire end on its node's edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireAnchor {
    /// Edge the wire attaches to
    pub side: AnchorSide,
    /// Normalized position along that edge, 0.0 to 1.0
    pub offset: f32,
}

impl WireAnchor {
    /// Anchor at the midpoint of `side`
    pub fn middle_of(side: AnchorSide) -> Self {
        Self { side, offset: 0.5 }
    }
}

/// A connection between an output port and an input port.
///
/// Transition-support wires additionally carry a kind tag and the ids of
/// their contained transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireModel {
    /// Element identity and ownership
    pub core: ElementCore,
    /// Source (output) end
    pub from: PortRef,
    /// Target (input) end
    pub to: PortRef,
    from_anchor: Option<WireAnchor>,
    to_anchor: Option<WireAnchor>,
    transition_kind: Option<TransitionSupportKind>,
    transitions: Vec<ElementId>,
}

impl WireModel {
    /// Create a wire from `from` to `to`
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self {
            core: ElementCore::new(Capabilities::wire()),
            from,
            to,
            from_anchor: None,
            to_anchor: None,
            transition_kind: None,
            transitions: Vec::new(),
        }
    }

    /// Whether either end is on `node`
    pub fn involves_node(&self, node: ElementId) -> bool {
        self.from.node == node || self.to.node == node
    }

    /// Whether either end is `port`
    pub fn involves_port(&self, port: &PortRef) -> bool {
        self.from == *port || self.to == *port
    }

    /// Anchor of the source end, if set
    pub fn from_anchor(&self) -> Option<WireAnchor> {
        self.from_anchor
    }

    /// Anchor of the target end, if set
    pub fn to_anchor(&self) -> Option<WireAnchor> {
        self.to_anchor
    }

    /// Set both anchors
    pub fn set_anchors(&mut self, from: WireAnchor, to: WireAnchor) {
        self.from_anchor = Some(from);
        self.to_anchor = Some(to);
    }

    /// The transition kind tag, if this wire is a transition support
    pub fn transition_kind(&self) -> Option<TransitionSupportKind> {
        self.transition_kind
    }

    pub(crate) fn set_transition_kind(&mut self, kind: TransitionSupportKind) {
        self.transition_kind = Some(kind);
    }

    /// Ids of the transitions carried by this wire
    pub fn transitions(&self) -> &[ElementId] {
        &self.transitions
    }

    pub(crate) fn register_transition(&mut self, transition: ElementId) {
        self.transitions.push(transition);
    }

    pub(crate) fn unregister_transition(&mut self, transition: ElementId) {
        self.transitions.retain(|t| *t != transition);
    }
}

impl GraphElement for WireModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves() {
        let a = ElementId::from_u128(1);
        let b = ElementId::from_u128(2);
        let wire = WireModel::new(PortRef::new(a, "out"), PortRef::new(b, "in"));

        assert!(wire.involves_node(a));
        assert!(wire.involves_node(b));
        assert!(!wire.involves_node(ElementId::from_u128(3)));

        assert!(wire.involves_port(&PortRef::new(a, "out")));
        assert!(!wire.involves_port(&PortRef::new(a, "in")));
    }

    #[test]
    fn test_anchors_default_unset() {
        let mut wire = WireModel::new(
            PortRef::new(ElementId::from_u128(1), "out"),
            PortRef::new(ElementId::from_u128(2), "in"),
        );
        assert!(wire.from_anchor().is_none());

        wire.set_anchors(
            WireAnchor::middle_of(AnchorSide::Bottom),
            WireAnchor::middle_of(AnchorSide::Top),
        );
        assert_eq!(wire.from_anchor().unwrap().side, AnchorSide::Bottom);
        assert_eq!(wire.to_anchor().unwrap().offset, 0.5);
    }
}
