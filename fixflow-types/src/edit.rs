use serde::{Deserialize, Serialize};

/// Byte range inside a unit's UTF-8 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Span covering `start..end`. `end` before `start` yields an empty span at `start`.
    pub fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end.saturating_sub(start),
        }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, len: 0 }
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end()
    }

    /// Whether two edits over these spans would rewrite or reorder the same bytes.
    ///
    /// Non-empty spans overlap when they share at least one byte. Two insertions at the
    /// same offset overlap (their order would be ambiguous), and an insertion strictly
    /// inside a replaced range overlaps it. An insertion at the boundary of a replaced
    /// range does not.
    pub fn overlaps(&self, other: &Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end(),
            (false, true) => self.start < other.start && other.start < self.end(),
            (false, false) => self.start < other.end() && other.start < self.end(),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// A single text replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self::new(Span::between(start, end), replacement)
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(Span::empty(at), text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(Span::between(start, end), String::new())
    }

    pub fn conflicts_with(&self, other: &Edit) -> bool {
        self.span.overlaps(&other.span)
    }

    /// Whether applying this edit to `text` would change nothing.
    pub fn is_noop_for(&self, text: &str) -> bool {
        text.get(self.span.start..self.span.end())
            .is_some_and(|current| current == self.replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_ranges_conflict() {
        let a = Span::between(10, 15);
        let b = Span::between(12, 20);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn adjacent_ranges_do_not_conflict() {
        let a = Span::between(0, 5);
        let b = Span::between(5, 9);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn insertions_at_same_offset_conflict() {
        assert!(Span::empty(4).overlaps(&Span::empty(4)));
        assert!(!Span::empty(4).overlaps(&Span::empty(5)));
    }

    #[test]
    fn insertion_inside_replacement_conflicts_but_not_at_boundary() {
        let replaced = Span::between(3, 8);
        assert!(Span::empty(5).overlaps(&replaced));
        assert!(replaced.overlaps(&Span::empty(5)));
        assert!(!Span::empty(3).overlaps(&replaced));
        assert!(!Span::empty(8).overlaps(&replaced));
    }

    #[test]
    fn between_clamps_reversed_bounds() {
        let s = Span::between(9, 4);
        assert_eq!(s.start, 9);
        assert!(s.is_empty());
    }

    #[test]
    fn noop_detection_compares_current_text() {
        let text = "hello world";
        assert!(Edit::replace(0, 5, "hello").is_noop_for(text));
        assert!(!Edit::replace(0, 5, "HELLO").is_noop_for(text));
        assert!(!Edit::replace(0, 50, "x").is_noop_for(text));
    }
}
