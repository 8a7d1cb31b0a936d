// SPDX-License-Identifier: MIT OR Apache-2.0
//! State-machine transitions and conditions carried by transition-support
//! wires.

use crate::capability::Capabilities;
use crate::element::{ElementCore, ElementId, GraphElement};
use crate::port::{PortDirection, PortModel, PortOrientation};
use serde::{Deserialize, Serialize};

/// Kind of state-machine transition a wire supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionSupportKind {
    /// From one state to a different state
    StateToState,
    /// From a state back to itself
    SelfTransition,
    /// Taken when the target state is entered
    OnEnter,
    /// Taken from any state
    Global,
}

/// Decide whether a transition of `requested` kind is allowed between the
/// two ports.
///
/// The target must always be a vertical input. State-to-state and self
/// transitions additionally ride a vertical output source: state-to-state
/// needs two distinct nodes, a self transition both ends on one node.
/// On-enter and global transitions have no source state, so only the target
/// matters. `None` means "not allowed" - an expected outcome, not an error.
pub fn allowed_transition_kind(
    to_port: &PortModel,
    from_port: &PortModel,
    same_node: bool,
    requested: TransitionSupportKind,
) -> Option<TransitionSupportKind> {
    if to_port.direction() != PortDirection::Input
        || to_port.orientation() != PortOrientation::Vertical
    {
        return None;
    }
    if matches!(
        requested,
        TransitionSupportKind::OnEnter | TransitionSupportKind::Global
    ) {
        return Some(requested);
    }

    if from_port.direction() != PortDirection::Output
        || from_port.orientation() != PortOrientation::Vertical
    {
        return None;
    }
    match requested {
        TransitionSupportKind::StateToState if !same_node => Some(requested),
        TransitionSupportKind::SelfTransition if same_node => Some(requested),
        _ => None,
    }
}

/// One transition carried by a transition-support wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionModel {
    /// Element identity and ownership
    pub core: ElementCore,
    kind: TransitionSupportKind,
    label: String,
    conditions: Vec<ElementId>,
}

impl TransitionModel {
    /// Create a transition of `kind`
    pub fn new(kind: TransitionSupportKind) -> Self {
        Self {
            core: ElementCore::new(Capabilities::wire()),
            kind,
            label: String::new(),
            conditions: Vec::new(),
        }
    }

    /// The transition kind
    pub fn kind(&self) -> TransitionSupportKind {
        self.kind
    }

    /// Display label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the display label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Condition ids guarding this transition, in evaluation order
    pub fn conditions(&self) -> &[ElementId] {
        &self.conditions
    }

    /// Append a condition
    pub fn add_condition(&mut self, condition: ElementId) {
        self.conditions.push(condition);
    }

    /// Remove a condition; absent ids are ignored
    pub fn remove_condition(&mut self, condition: ElementId) {
        self.conditions.retain(|c| *c != condition);
    }
}

impl GraphElement for TransitionModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }
}

/// A named predicate guarding transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionModel {
    /// Element identity and ownership
    pub core: ElementCore,
    title: String,
    negated: bool,
}

impl ConditionModel {
    /// Create a condition named `title`
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            core: ElementCore::new(Capabilities::declaration()),
            title: title.into(),
            negated: false,
        }
    }

    /// Condition title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the condition title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Whether the predicate is negated
    pub fn negated(&self) -> bool {
        self.negated
    }

    /// Set the negation flag
    pub fn set_negated(&mut self, negated: bool) {
        self.negated = negated;
    }
}

impl GraphElement for ConditionModel {
    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ElementCore {
        &mut self.core
    }
}
