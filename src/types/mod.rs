//! Types module - unit algebra, type symbols and registries

pub mod registry;
pub mod type_system;
pub mod units;

pub use registry::CompilationContext;
pub use type_system::TypeSymbol;
pub use units::Unit;
