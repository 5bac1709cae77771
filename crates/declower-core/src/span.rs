//! Source location tracking for declarations and diagnostics.
//!
//! Provides [`Span`], the position a declaration or parameter was written at.
//! Spans also define declaration order: captured locals are threaded in the
//! order their spans sort.

use std::fmt;

/// A span of source code, represented by its starting position.
///
/// Field order matters: the derived `Ord` compares line, then column, then
/// length, which is source order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// A span for synthesized declarations that have no source position.
    pub const SYNTHETIC: Span = Span {
        line: 0,
        col: 0,
        len: 0,
    };

    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this span was invented by the compiler.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Whether this span starts strictly before `other`.
    #[inline]
    pub fn precedes(&self, other: &Span) -> bool {
        (self.line, self.col) < (other.line, other.col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(1, 5, 10);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::point(1, 5).is_empty());
    }

    #[test]
    fn span_display() {
        assert_eq!(format!("{}", Span::new(3, 15, 5)), "3:15");
        assert_eq!(format!("{}", Span::SYNTHETIC), "<synthetic>");
    }

    #[test]
    fn span_order_is_source_order() {
        let a = Span::new(2, 9, 1);
        let b = Span::new(3, 1, 1);
        let c = Span::new(3, 4, 1);
        assert!(a.precedes(&b));
        assert!(b.precedes(&c));
        assert!(!c.precedes(&a));

        let mut spans = vec![c, a, b];
        spans.sort();
        assert_eq!(spans, vec![a, b, c]);
    }

    #[test]
    fn same_position_does_not_precede() {
        let a = Span::new(4, 2, 1);
        let b = Span::new(4, 2, 7);
        assert!(!a.precedes(&b));
        assert!(!b.precedes(&a));
    }
}
