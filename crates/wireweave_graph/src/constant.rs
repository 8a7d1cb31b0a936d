// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed literal values embedded in nodes and port defaults.

use crate::element::ElementId;
use crate::types::TypeHandle;
use serde::{Deserialize, Serialize};

/// Error from assigning a constant's value
#[derive(Debug, thiserror::Error)]
pub enum ConstantError {
    /// Value's type does not match the constant's declared type
    #[error("type mismatch: constant is {declared:?}, value is {actual:?}")]
    TypeMismatch {
        /// The constant's declared type
        declared: TypeHandle,
        /// The rejected value's type
        actual: TypeHandle,
    },
}

/// A literal value that can sit in a constant node or a port default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Color
    Color([f32; 4]),
    /// String
    String(String),
}

impl Value {
    /// The type handle for this value
    pub fn type_handle(&self) -> TypeHandle {
        match self {
            Self::Bool(_) => TypeHandle::Bool,
            Self::Int(_) => TypeHandle::Int,
            Self::Float(_) => TypeHandle::Float,
            Self::Vector2(_) => TypeHandle::Vector2,
            Self::Vector3(_) => TypeHandle::Vector3,
            Self::Vector4(_) => TypeHandle::Vector4,
            Self::Color(_) => TypeHandle::Color,
            Self::String(_) => TypeHandle::String,
        }
    }

    /// A zero/empty value of the given type, if one exists
    pub fn default_for(data_type: &TypeHandle) -> Option<Self> {
        match data_type {
            TypeHandle::Bool => Some(Self::Bool(false)),
            TypeHandle::Int => Some(Self::Int(0)),
            TypeHandle::Float => Some(Self::Float(0.0)),
            TypeHandle::Vector2 => Some(Self::Vector2([0.0; 2])),
            TypeHandle::Vector3 => Some(Self::Vector3([0.0; 3])),
            TypeHandle::Vector4 => Some(Self::Vector4([0.0; 4])),
            TypeHandle::Color => Some(Self::Color([0.0, 0.0, 0.0, 1.0])),
            TypeHandle::String => Some(Self::String(String::new())),
            _ => None,
        }
    }
}

/// A typed literal owned by exactly one element at a time.
///
/// The owner back-reference is runtime-only; the owning node restores it in
/// its post-deserialize hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// The type this constant is declared to hold
    declared_type: TypeHandle,
    /// Current value
    value: Value,
    /// Handle of the owning element
    #[serde(skip)]
    owner: Option<ElementId>,
}

impl Constant {
    /// Create a constant of `declared_type` holding its default value.
    /// Falls back to `Bool(false)` for types with no literal form.
    pub fn new(declared_type: TypeHandle) -> Self {
        let value = Value::default_for(&declared_type).unwrap_or(Value::Bool(false));
        Self {
            declared_type,
            value,
            owner: None,
        }
    }

    /// Create a constant from an initial value, declaring the value's type
    pub fn from_value(value: Value) -> Self {
        Self {
            declared_type: value.type_handle(),
            value,
            owner: None,
        }
    }

    /// The declared type
    pub fn declared_type(&self) -> &TypeHandle {
        &self.declared_type
    }

    /// The current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The owning element, if attached
    pub fn owner(&self) -> Option<ElementId> {
        self.owner
    }

    /// Attach or detach the owner back-reference
    pub fn set_owner(&mut self, owner: Option<ElementId>) {
        self.owner = owner;
    }

    /// Replace the value. Fails, with no mutation, unless the value's type
    /// is exactly the declared type.
    pub fn set_value(&mut self, value: Value) -> Result<(), ConstantError> {
        let actual = value.type_handle();
        if actual != self.declared_type {
            return Err(ConstantError::TypeMismatch {
                declared: self.declared_type.clone(),
                actual,
            });
        }
        self.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value_matches_declared_type() {
        let c = Constant::new(TypeHandle::Float);
        assert_eq!(c.value().type_handle(), TypeHandle::Float);
        assert_eq!(*c.value(), Value::Float(0.0));
    }

    #[test]
    fn test_set_value_rejects_wrong_type() {
        let mut c = Constant::new(TypeHandle::Int);
        let err = c.set_value(Value::String("nope".into())).unwrap_err();
        assert!(matches!(err, ConstantError::TypeMismatch { .. }));
        // No partial mutation.
        assert_eq!(*c.value(), Value::Int(0));
    }

    #[test]
    fn test_set_value_accepts_exact_type() {
        let mut c = Constant::new(TypeHandle::Vector3);
        c.set_value(Value::Vector3([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(*c.value(), Value::Vector3([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_owner_back_reference() {
        let mut c = Constant::from_value(Value::Bool(true));
        assert!(c.owner().is_none());
        let node = ElementId::new();
        c.set_owner(Some(node));
        assert_eq!(c.owner(), Some(node));
    }
}
