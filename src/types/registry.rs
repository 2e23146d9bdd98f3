//! Unit and type registries
//!
//! Both catalogs are additive only and keyed by canonical name. They live in
//! a [`CompilationContext`] that is created once per run and passed
//! explicitly to every phase that needs it.

use crate::frontend::ast::{DataType, DataTypeKind, UnitNumerator, UnitTypeExpr, UnitTypeKind};
use crate::types::type_system::TypeSymbol;
use crate::types::units::{predefined_units, Unit};
use log::{debug, info};
use std::collections::HashMap;
use thiserror::Error;

/// Why a unit type expression has no unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Unit does not exist ({0}).")]
    Unknown(String),

    #[error("Unit '{0}' is out of range: exponent overflow.")]
    Overflow(String),
}

/// Catalog of known units
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    by_name: HashMap<String, usize>,
}

impl UnitRegistry {
    pub fn with_predefined() -> Self {
        let mut registry = Self::default();
        for unit in predefined_units() {
            registry.register(unit);
        }
        registry
    }

    pub fn lookup(&self, name: &str) -> Option<&Unit> {
        self.by_name.get(name).map(|&i| &self.units[i])
    }

    /// Register `unit` under its canonical name unless present.
    /// Returns whether a new entry was created.
    pub fn register(&mut self, unit: Unit) -> bool {
        let name = unit.name();
        if self.by_name.contains_key(&name) {
            return false;
        }
        self.by_name.insert(name, self.units.len());
        self.units.push(unit);
        true
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }
}

/// Catalog of known types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeSymbol>,
    by_name: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn with_primitives() -> Self {
        let mut registry = Self::default();
        for ty in [
            TypeSymbol::integer(),
            TypeSymbol::real(),
            TypeSymbol::boolean(),
            TypeSymbol::string(),
            TypeSymbol::void(),
        ] {
            registry.register(ty);
        }
        registry
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeSymbol> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Idempotent registration keyed by the type's name
    pub fn register(&mut self, ty: TypeSymbol) -> bool {
        let name = ty.name();
        if self.by_name.contains_key(&name) {
            return false;
        }
        let ty = TypeSymbol { origin: None, is_buffer: false, ..ty };
        self.by_name.insert(name, self.types.len());
        self.types.push(ty);
        true
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Shared state of one compiler run
#[derive(Debug)]
pub struct CompilationContext {
    units: UnitRegistry,
    types: TypeRegistry,
    /// Derived types registered since the last drain
    new_types: Vec<String>,
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilationContext {
    pub fn new() -> Self {
        let units = UnitRegistry::with_predefined();
        let mut types = TypeRegistry::with_primitives();
        for unit in units.iter() {
            types.register(TypeSymbol::unit(unit.clone()));
        }
        debug!(
            "compilation context ready: {} units, {} types",
            units.len(),
            types.len()
        );
        Self {
            units,
            types,
            new_types: Vec::new(),
        }
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Predefined or previously derived unit by name
    pub fn lookup_unit(&self, name: &str) -> Option<Unit> {
        self.units.lookup(name).cloned()
    }

    /// The type of `unit`, registering unit and type if they are new
    pub fn unit_type(&mut self, unit: Unit) -> TypeSymbol {
        if unit.is_dimensionless() {
            return TypeSymbol::real();
        }
        let name = unit.name();
        if self.units.register(unit.clone()) {
            info!("New type registered '{}'", name);
            self.new_types.push(name.clone());
        }
        let ty = TypeSymbol::unit(unit);
        self.types.register(ty.clone());
        ty
    }

    /// `None` when the product is not representable
    pub fn multiply(&mut self, a: &Unit, b: &Unit) -> Option<TypeSymbol> {
        a.multiply(b).map(|unit| self.unit_type(unit))
    }

    pub fn divide(&mut self, a: &Unit, b: &Unit) -> Option<TypeSymbol> {
        a.divide(b).map(|unit| self.unit_type(unit))
    }

    pub fn power(&mut self, a: &Unit, exponent: i32) -> Option<TypeSymbol> {
        a.power(exponent).map(|unit| self.unit_type(unit))
    }

    /// Evaluate a unit type expression. A numeric numerator is kept as `1`;
    /// its value is checked separately.
    pub fn resolve_unit_expr(&mut self, expr: &UnitTypeExpr) -> Result<Unit, UnitError> {
        let overflow = || UnitError::Overflow(expr.to_string());
        let unit = match &expr.kind {
            UnitTypeKind::Simple(name) => self
                .lookup_unit(name)
                .ok_or_else(|| UnitError::Unknown(name.clone()))?,
            UnitTypeKind::Encapsulated(inner) => self.resolve_unit_expr(inner)?,
            UnitTypeKind::Pow { base, exponent } => self
                .resolve_unit_expr(base)?
                .power(*exponent)
                .ok_or_else(overflow)?,
            UnitTypeKind::Mul { lhs, rhs } => {
                let lhs = self.resolve_unit_expr(lhs)?;
                lhs.multiply(&self.resolve_unit_expr(rhs)?).ok_or_else(overflow)?
            }
            UnitTypeKind::Div { lhs, rhs } => {
                let lhs = match lhs {
                    UnitNumerator::Number(_) => Unit::one(),
                    UnitNumerator::Unit(u) => self.resolve_unit_expr(u)?,
                };
                lhs.divide(&self.resolve_unit_expr(rhs)?).ok_or_else(overflow)?
            }
        };
        Ok(unit)
    }

    /// Resolve a declared data type, registering derived unit types
    pub fn resolve_data_type(&mut self, data_type: &DataType) -> Result<TypeSymbol, UnitError> {
        let ty = match &data_type.kind {
            DataTypeKind::Integer => TypeSymbol::integer(),
            DataTypeKind::Real => TypeSymbol::real(),
            DataTypeKind::Boolean => TypeSymbol::boolean(),
            DataTypeKind::String => TypeSymbol::string(),
            DataTypeKind::Void => TypeSymbol::void(),
            DataTypeKind::Unit(expr) => {
                let unit = self.resolve_unit_expr(expr)?;
                self.unit_type(unit)
            }
        };
        Ok(ty.with_origin(data_type.id))
    }

    /// Names of the types registered since the last call
    pub fn drain_new_types(&mut self) -> Vec<String> {
        std::mem::take(&mut self.new_types)
    }
}
