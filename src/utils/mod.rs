//! Utility module

mod position;
mod error;

pub use position::SourcePosition;
pub use error::{Error, Result};
