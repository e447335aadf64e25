//! Cursor and selection types that move along with operations.
//!
//! A [`Range`] is an `(anchor, head)` pair of char offsets. The anchor is the
//! fixed end, the head is where the cursor sits; equal ends mean a caret.
//! A [`Selection`] is the ordered set of ranges one collaborator has in a
//! document (multiple cursors are allowed).

use serde::{Deserialize, Serialize};

use crate::operation::{Op, TextOperation, char_len};

/// A span or caret in a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Fixed end of the range.
    pub anchor: usize,
    /// Moving end of the range (the cursor).
    pub head: usize,
}

impl Range {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A caret at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Whether this is a caret rather than a span.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Re-project the range through `op`.
    ///
    /// A caret is mapped once and stays a caret. Otherwise each end maps on
    /// its own, so a span may collapse (or not) depending on the edit.
    pub fn transform(&self, op: &TextOperation) -> Range {
        let anchor = transform_index(self.anchor, op);
        if self.is_empty() {
            return Range::caret(anchor);
        }
        Range::new(anchor, transform_index(self.head, op))
    }
}

/// Walk `op` and shift `index` by everything inserted or deleted before it.
fn transform_index(index: usize, op: &TextOperation) -> usize {
    let mut remaining = index;
    let mut new_index = index;
    for step in op.ops() {
        match step {
            Op::Retain(n) => {
                if *n > remaining {
                    break;
                }
                remaining -= n;
            }
            Op::Insert(text) => new_index += char_len(text),
            Op::Delete(n) => {
                new_index -= remaining.min(*n);
                if *n > remaining {
                    break;
                }
                remaining -= n;
            }
        }
    }
    new_index
}

/// Every range one collaborator has in a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SelectionRepr")]
pub struct Selection {
    pub ranges: Vec<Range>,
}

/// Accepted wire shapes: `{ "ranges": [...] }` or a bare array of ranges.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Object { ranges: Vec<Range> },
    Bare(Vec<Range>),
}

impl From<SelectionRepr> for Selection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Object { ranges } | SelectionRepr::Bare(ranges) => Self { ranges },
        }
    }
}

impl Selection {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// A selection holding a single caret.
    pub fn cursor(offset: usize) -> Self {
        Self::new(vec![Range::caret(offset)])
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether any range spans at least one char.
    pub fn something_selected(&self) -> bool {
        self.ranges.iter().any(|range| !range.is_empty())
    }

    /// Combine with a later selection. Selections do not merge: the later
    /// one wins.
    pub fn compose(&self, other: &Selection) -> Selection {
        other.clone()
    }

    /// Re-project every range through `op`, keeping their order.
    pub fn transform(&self, op: &TextOperation) -> Selection {
        Selection::new(self.ranges.iter().map(|range| range.transform(op)).collect())
    }
}

impl From<Range> for Selection {
    fn from(range: Range) -> Self {
        Self::new(vec![range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_shifts_after_insert() {
        let op = TextOperation::new().insert("XY").retain(5);
        assert_eq!(Range::caret(2).transform(&op), Range::caret(4));
    }

    #[test]
    fn test_caret_collapses_into_delete() {
        let op = TextOperation::new().delete(2).retain(3);
        assert_eq!(Range::caret(2).transform(&op), Range::caret(0));
        assert_eq!(Range::caret(1).transform(&op), Range::caret(0));
        assert_eq!(Range::caret(4).transform(&op), Range::caret(2));
    }

    #[test]
    fn test_insert_at_index_pushes_it_forward() {
        let op = TextOperation::new().retain(3).insert("ab").retain(2);
        assert_eq!(Range::caret(3).transform(&op), Range::caret(5));
        assert_eq!(Range::caret(2).transform(&op), Range::caret(2));
    }

    #[test]
    fn test_span_maps_each_end() {
        // "abcdef", select "bcd", then delete "cde".
        let op = TextOperation::new().retain(2).delete(3).retain(1);
        let range = Range::new(1, 4).transform(&op);
        assert_eq!(range, Range::new(1, 2));
        assert!(!range.is_empty());

        // A span inside the deleted text collapses.
        let inside = Range::new(3, 4).transform(&op);
        assert_eq!(inside, Range::new(2, 2));
        assert!(inside.is_empty());
    }

    #[test]
    fn test_backwards_span_keeps_direction() {
        let op = TextOperation::new().insert("__").retain(6);
        assert_eq!(Range::new(5, 1).transform(&op), Range::new(7, 3));
    }

    #[test]
    fn test_selection_transform_keeps_order() {
        let sel = Selection::new(vec![Range::caret(0), Range::new(2, 4), Range::caret(6)]);
        let op = TextOperation::new().retain(1).insert("zz").retain(5);
        assert_eq!(
            sel.transform(&op),
            Selection::new(vec![Range::caret(0), Range::new(4, 6), Range::caret(8)])
        );
    }

    #[test]
    fn test_compose_takes_later_selection() {
        let earlier = Selection::cursor(3);
        let later = Selection::new(vec![Range::new(0, 2)]);
        assert_eq!(earlier.compose(&later), later);
    }

    #[test]
    fn test_something_selected() {
        assert!(!Selection::cursor(3).something_selected());
        assert!(Selection::new(vec![Range::caret(1), Range::new(1, 2)]).something_selected());
    }

    #[test]
    fn test_wire_shapes() {
        let sel = Selection::new(vec![Range::new(1, 3), Range::caret(5)]);
        let json = serde_json::to_string(&sel).unwrap();
        insta::assert_snapshot!(json, @r#"{"ranges":[{"anchor":1,"head":3},{"anchor":5,"head":5}]}"#);

        let from_object: Selection = serde_json::from_str(&json).unwrap();
        let from_bare: Selection =
            serde_json::from_str(r#"[{"anchor":1,"head":3},{"anchor":5,"head":5}]"#).unwrap();
        assert_eq!(from_object, sel);
        assert_eq!(from_bare, sel);
    }
}
