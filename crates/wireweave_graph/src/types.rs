// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data types that flow through ports, and the compatibility predicate.

use serde::{Deserialize, Serialize};

/// Handle to a data type a port can carry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeHandle {
    /// Execution flow (for trigger-style ports)
    Exec,
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Entity reference
    Entity,
    /// Type chosen dynamically from what the port is wired to
    Automatic,
    /// No usable type (unresolved or unresolvable)
    Unknown,
    /// Custom/user-defined type
    Custom(String),
}

impl TypeHandle {
    /// Whether this handle is a concrete type rather than a marker
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::Automatic | Self::Unknown)
    }

    /// Check if a value of this type can flow into a port of `other`'s type.
    ///
    /// `Automatic` accepts anything concrete; `Unknown` accepts nothing.
    pub fn can_connect_to(&self, other: &TypeHandle) -> bool {
        if matches!(self, Self::Unknown) || matches!(other, Self::Unknown) {
            return false;
        }

        if matches!(self, Self::Automatic) || matches!(other, Self::Automatic) {
            return true;
        }

        if self == other {
            return true;
        }

        // Implicit conversions
        match (self, other) {
            // Numeric conversions
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            // Vector widening
            (Self::Float, Self::Vector2 | Self::Vector3 | Self::Vector4) => true,
            (Self::Vector2, Self::Vector3 | Self::Vector4) => true,
            (Self::Vector3, Self::Vector4) => true,
            // Color conversions
            (Self::Color, Self::Vector4) | (Self::Vector4, Self::Color) => true,
            // No other implicit conversions
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_types_connect() {
        assert!(TypeHandle::Float.can_connect_to(&TypeHandle::Float));
        assert!(TypeHandle::Custom("Pose".into()).can_connect_to(&TypeHandle::Custom("Pose".into())));
    }

    #[test]
    fn test_implicit_conversions() {
        assert!(TypeHandle::Int.can_connect_to(&TypeHandle::Float));
        assert!(TypeHandle::Float.can_connect_to(&TypeHandle::Vector3));
        assert!(TypeHandle::Color.can_connect_to(&TypeHandle::Vector4));
        assert!(!TypeHandle::Vector4.can_connect_to(&TypeHandle::Vector2));
        assert!(!TypeHandle::String.can_connect_to(&TypeHandle::Bool));
    }

    #[test]
    fn test_markers() {
        assert!(TypeHandle::Automatic.can_connect_to(&TypeHandle::String));
        assert!(!TypeHandle::Unknown.can_connect_to(&TypeHandle::Float));
        assert!(!TypeHandle::Float.can_connect_to(&TypeHandle::Unknown));
        assert!(!TypeHandle::Automatic.is_concrete());
        assert!(TypeHandle::Exec.is_concrete());
    }
}
