//! Source location tracking

use serde::Serialize;
use std::fmt;

/// A region of the model source, 1-based lines and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourcePosition {
    /// Create a new position
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self { start_line, start_column, end_line, end_column }
    }

    /// Position used for predefined (built-in) elements that have no source text
    pub fn predefined() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn is_predefined(&self) -> bool {
        self.start_line == 0 && self.end_line == 0
    }

    /// Merge two positions into the region spanning both
    pub fn merge(&self, other: &SourcePosition) -> SourcePosition {
        let (start_line, start_column) = (self.start_line, self.start_column)
            .min((other.start_line, other.start_column));
        let (end_line, end_column) = (self.end_line, self.end_column)
            .max((other.end_line, other.end_column));
        SourcePosition { start_line, start_column, end_line, end_column }
    }

    /// Whether this position starts textually before `other`
    pub fn before(&self, other: &SourcePosition) -> bool {
        (self.start_line, self.start_column) < (other.start_line, other.start_column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::predefined()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{};{}:{}]",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_compares_line_then_column() {
        let a = SourcePosition::new(3, 5, 3, 9);
        let b = SourcePosition::new(3, 7, 3, 8);
        let c = SourcePosition::new(4, 1, 4, 2);
        assert!(a.before(&b));
        assert!(b.before(&c));
        assert!(!c.before(&a));
        assert!(!a.before(&a));
    }

    #[test]
    fn test_merge_spans_both() {
        let a = SourcePosition::new(2, 4, 2, 10);
        let b = SourcePosition::new(1, 8, 2, 6);
        assert_eq!(a.merge(&b), SourcePosition::new(1, 8, 2, 10));
    }
}
