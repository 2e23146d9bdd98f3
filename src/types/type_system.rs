//! Type symbols of NESTML
//!
//! The type lattice is flat: the primitives, one type per unit, and an
//! absorbing `Error` type that marks an already reported failure.

use crate::frontend::ast::NodeId;
use crate::types::units::Unit;
use std::fmt;

/// Kind of a resolved type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Integer,
    Real,
    Boolean,
    String,
    Void,
    Unit(Unit),
    Error,
}

/// A resolved type together with its buffer flag and declaring node
#[derive(Debug, Clone)]
pub struct TypeSymbol {
    pub kind: TypeKind,
    /// Type of an input buffer (`spikes nS <- spike`)
    pub is_buffer: bool,
    /// Node that declared or produced this type, for diagnostics
    pub origin: Option<NodeId>,
}

impl TypeSymbol {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            is_buffer: false,
            origin: None,
        }
    }

    pub fn integer() -> Self {
        Self::new(TypeKind::Integer)
    }

    pub fn real() -> Self {
        Self::new(TypeKind::Real)
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn error() -> Self {
        Self::new(TypeKind::Error)
    }

    /// Unit type; dimensionless units collapse to `real`
    pub fn unit(unit: Unit) -> Self {
        if unit.is_dimensionless() {
            Self::real()
        } else {
            Self::new(TypeKind::Unit(unit))
        }
    }

    pub fn with_origin(mut self, origin: NodeId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn as_buffer(mut self) -> Self {
        self.is_buffer = true;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, TypeKind::Boolean)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Integer)
    }

    pub fn is_real(&self) -> bool {
        matches!(self.kind, TypeKind::Real)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String)
    }

    /// integer or real
    pub fn is_numeric_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Integer | TypeKind::Real)
    }

    /// integer, real or a unit type
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, TypeKind::Integer | TypeKind::Real | TypeKind::Unit(_))
    }

    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            TypeKind::Unit(u) => Some(u),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        self.as_unit().is_some()
    }

    /// Both are unit types of the same dimension with different prefixes
    pub fn differs_in_magnitude(&self, other: &TypeSymbol) -> bool {
        match (self.as_unit(), other.as_unit()) {
            (Some(a), Some(b)) => a.differs_in_magnitude(b),
            _ => false,
        }
    }

    /// Implicit conversions: unit to real, boolean to and from real,
    /// integer to and from real
    pub fn is_castable_to(&self, target: &TypeSymbol) -> bool {
        match (&self.kind, &target.kind) {
            (TypeKind::Unit(_), TypeKind::Real) => true,
            (TypeKind::Boolean, TypeKind::Real) | (TypeKind::Real, TypeKind::Boolean) => true,
            (TypeKind::Integer, TypeKind::Real) | (TypeKind::Real, TypeKind::Integer) => true,
            _ => false,
        }
    }

    /// Registry key and display name
    pub fn name(&self) -> String {
        match &self.kind {
            TypeKind::Integer => "integer".to_string(),
            TypeKind::Real => "real".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Unit(u) => u.name(),
            TypeKind::Error => "error".to_string(),
        }
    }
}

impl PartialEq for TypeSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_buffer {
            write!(f, "{} buffer", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::units::predefined_units;

    fn mv() -> TypeSymbol {
        let unit = predefined_units()
            .into_iter()
            .find(|u| u.name() == "mV")
            .expect("mV is predefined");
        TypeSymbol::unit(unit)
    }

    #[test]
    fn test_cast_relation_is_asymmetric_for_units() {
        assert!(mv().is_castable_to(&TypeSymbol::real()));
        assert!(!TypeSymbol::real().is_castable_to(&mv()));
    }

    #[test]
    fn test_cast_relation_is_symmetric_for_primitives() {
        let (b, r, i) = (TypeSymbol::boolean(), TypeSymbol::real(), TypeSymbol::integer());
        assert!(b.is_castable_to(&r) && r.is_castable_to(&b));
        assert!(i.is_castable_to(&r) && r.is_castable_to(&i));
        assert!(!b.is_castable_to(&i));
        assert!(!TypeSymbol::string().is_castable_to(&r));
        assert!(!mv().is_castable_to(&i));
    }

    #[test]
    fn test_equality_ignores_origin_and_buffer() {
        let a = mv().with_origin(NodeId(3));
        let b = mv().as_buffer();
        assert_eq!(a, b);
        assert_ne!(a, TypeSymbol::real());
    }

    #[test]
    fn test_dimensionless_unit_is_real() {
        let t = mv();
        let unit = t.as_unit().expect("unit type");
        let ratio = unit.divide(unit).expect("no overflow");
        assert!(TypeSymbol::unit(ratio).is_real());
    }
}
