//! Hard errors of the NESTML front end
//!
//! Findings about a model (unresolved symbols, type mismatches, coco
//! violations) are diagnostics, not errors. This type only covers failures
//! that stop a phase outright: unreadable input and malformed syntax.

use crate::utils::SourcePosition;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Front-end error
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ==================== Lexer Errors ====================

    #[error("Unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: SourcePosition },

    #[error("Unterminated string literal")]
    UnterminatedString { pos: SourcePosition },

    #[error("Invalid numeric literal '{text}'")]
    InvalidNumber { text: String, pos: SourcePosition },

    // ==================== Parser Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        pos: SourcePosition,
    },

    #[error("Expected {0}")]
    Expected(String, SourcePosition),

    #[error("Expected identifier")]
    ExpectedIdent { pos: SourcePosition },

    #[error("Expected data type")]
    ExpectedType { pos: SourcePosition },

    #[error("Expected expression")]
    ExpectedExpr { pos: SourcePosition },

    #[error("Unit exponent must be an integer literal")]
    InvalidExponent { pos: SourcePosition },

    // ==================== I/O ====================

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Get the position associated with this error
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Self::UnexpectedChar { pos, .. } => Some(*pos),
            Self::UnterminatedString { pos } => Some(*pos),
            Self::InvalidNumber { pos, .. } => Some(*pos),
            Self::UnexpectedToken { pos, .. } => Some(*pos),
            Self::Expected(_, pos) => Some(*pos),
            Self::ExpectedIdent { pos } => Some(*pos),
            Self::ExpectedType { pos } => Some(*pos),
            Self::ExpectedExpr { pos } => Some(*pos),
            Self::InvalidExponent { pos } => Some(*pos),
            Self::Io(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
