//! Widget abstraction for the adapter.
//!
//! The `Widget` trait is everything the adapter needs from a concrete text
//! editing component (a native text view, a terminal editor, a browser
//! code editor). Positions on the widget side are `(line, ch)` pairs;
//! the adapter converts between them and the char offsets operations use.

use ropey::Rope;
use serde::{Deserialize, Serialize};

use crate::decoration::CursorWidget;

/// A position in the widget's native representation.
///
/// Ordered by line, then by char within the line.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    /// Zero-based line number.
    pub line: usize,
    /// Char offset within the line.
    pub ch: usize,
}

impl Pos {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// One edit inside a batch reported by the widget.
///
/// `from` and `to` are in the coordinates of the document right before this
/// edit, so later edits of a batch refer to text already changed by earlier
/// ones. Inserted and removed text are split on `\n`; an empty insertion is
/// `[""]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeChange {
    pub from: Pos,
    pub to: Pos,
    pub text: Vec<String>,
    pub removed: Vec<String>,
}

impl NativeChange {
    /// Char count of the inserted text, newlines included.
    pub fn inserted_len(&self) -> usize {
        joined_len(&self.text)
    }

    /// Char count of the removed text, newlines included.
    pub fn removed_len(&self) -> usize {
        joined_len(&self.removed)
    }
}

/// Char length of `lines` joined with `\n`.
pub(crate) fn joined_len(lines: &[String]) -> usize {
    if lines.is_empty() {
        return 0;
    }
    let chars: usize = lines.iter().map(|line| line.chars().count()).sum();
    chars + lines.len() - 1
}

/// Notifications a widget delivers, in the order it fired them.
///
/// For a batch of edits a widget fires one `Change` per edit, then
/// `CursorActivity`, then a single `Changes` carrying the whole batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetEvent {
    /// An edit happened; the batch it belongs to is still open.
    Change,
    /// A batch of edits was committed.
    ///
    /// `after` is the document right after the batch. Events may be drained
    /// long after later batches changed the widget, so positions in
    /// `changes` are resolved against it rather than the live text.
    Changes {
        changes: Vec<NativeChange>,
        after: Rope,
    },
    /// The cursor or selection moved (or content changed under it).
    CursorActivity,
    Focus,
    Blur,
    /// The user asked the widget to undo.
    Undo,
    /// The user asked the widget to redo.
    Redo,
}

/// Handle for a decoration rendered by the widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// A live text-editing component the adapter can drive.
///
/// All offsets are in chars (Unicode scalar values), not bytes or UTF-16.
pub trait Widget {
    /// Full current text.
    fn value(&self) -> String;

    /// Total length in chars.
    fn len_chars(&self) -> usize;

    /// Convert a char offset to a native position.
    fn pos_from_index(&self, index: usize) -> Pos;

    /// Convert a native position to a char offset.
    fn index_from_pos(&self, pos: Pos) -> usize;

    /// Every selection as `(anchor, head)` native positions.
    fn list_selections(&self) -> Vec<(Pos, Pos)>;

    /// Whether any selection spans text.
    fn something_selected(&self) -> bool {
        self.list_selections()
            .iter()
            .any(|(anchor, head)| anchor != head)
    }

    /// Replace the text between `from` and `to` with `text`.
    fn replace_range(&mut self, text: &str, from: Pos, to: Pos);

    /// Run `edits` as one atomic batch: the widget reports a single
    /// `Changes` for everything done inside.
    fn transaction<F>(&mut self, edits: F)
    where
        F: FnOnce(&mut Self),
        Self: Sized;

    /// Take the notifications fired since the last call.
    fn drain_events(&mut self) -> Vec<WidgetEvent>;

    /// Render a zero-width marker at `pos`.
    fn set_bookmark(&mut self, pos: Pos, widget: CursorWidget) -> MarkerId;

    /// Style the text between `from` and `to` with `class_name`.
    fn mark_text(&mut self, from: Pos, to: Pos, class_name: &str) -> MarkerId;

    /// Remove a marker. Unknown ids are ignored.
    fn clear_marker(&mut self, id: MarkerId);

    /// Make sure the style rule `rule` is installed. Installing the same
    /// rule twice has no effect.
    fn ensure_style_rule(&mut self, rule: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_ordering() {
        assert!(Pos::new(0, 9) < Pos::new(1, 0));
        assert!(Pos::new(2, 1) < Pos::new(2, 3));
        assert_eq!(Pos::new(1, 1).max(Pos::new(0, 5)), Pos::new(1, 1));
    }

    #[test]
    fn test_joined_len() {
        assert_eq!(joined_len(&[]), 0);
        assert_eq!(joined_len(&["".to_string()]), 0);
        assert_eq!(joined_len(&["ab".to_string(), "c".to_string()]), 4);
        assert_eq!(joined_len(&["".to_string(), "".to_string()]), 1);
    }
}
