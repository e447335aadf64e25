//! In-memory widget backed by a rope.
//!
//! `MemoryWidget` behaves like a real editing component without any UI: it
//! keeps the text, the user's selections and rendered decorations, and fires
//! the same notifications a live editor would. Hosts without a native view
//! (the CLI, tests, headless replicas) drive the adapter with it.

use std::collections::BTreeMap;

use ropey::Rope;

use crate::decoration::CursorWidget;
use crate::widget::{MarkerId, NativeChange, Pos, Widget, WidgetEvent};

/// A decoration held by a [`MemoryWidget`], in char offsets.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoration {
    Bookmark { at: usize, widget: CursorWidget },
    Mark {
        from: usize,
        to: usize,
        class_name: String,
    },
}

#[derive(Debug, Default)]
struct Batch {
    changes: Vec<NativeChange>,
    selection_moved: bool,
}

/// Rope-backed widget with no rendering.
#[derive(Debug)]
pub struct MemoryWidget {
    rope: Rope,
    /// `(anchor, head)` char offsets.
    selections: Vec<(usize, usize)>,
    markers: BTreeMap<MarkerId, Decoration>,
    style_rules: Vec<String>,
    events: Vec<WidgetEvent>,
    batch: Option<Batch>,
    next_marker: u64,
}

impl Default for MemoryWidget {
    fn default() -> Self {
        Self {
            rope: Rope::new(),
            selections: vec![(0, 0)],
            markers: BTreeMap::new(),
            style_rules: Vec::new(),
            events: Vec::new(),
            batch: None,
            next_marker: 0,
        }
    }
}

impl MemoryWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial text and a caret at the start.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            ..Self::default()
        }
    }

    /// The underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Replace a char range, the way a user edit would.
    pub fn replace_chars(&mut self, range: std::ops::Range<usize>, text: &str) {
        let from = self.pos_from_index(range.start);
        let to = self.pos_from_index(range.end);
        self.replace_range(text, from, to);
    }

    /// Replace all selections with `(anchor, head)` char offsets.
    pub fn set_selections(&mut self, selections: Vec<(usize, usize)>) {
        let len = self.rope.len_chars();
        self.selections = selections
            .into_iter()
            .map(|(anchor, head)| (anchor.min(len), head.min(len)))
            .collect();
        match self.batch.as_mut() {
            Some(batch) => batch.selection_moved = true,
            None => self.events.push(WidgetEvent::CursorActivity),
        }
    }

    /// Collapse the selection to a caret at `index`.
    pub fn set_cursor(&mut self, index: usize) {
        self.set_selections(vec![(index, index)]);
    }

    pub fn focus(&mut self) {
        self.events.push(WidgetEvent::Focus);
    }

    pub fn blur(&mut self) {
        self.events.push(WidgetEvent::Blur);
    }

    /// Simulate the user pressing the undo key binding.
    pub fn request_undo(&mut self) {
        self.events.push(WidgetEvent::Undo);
    }

    /// Simulate the user pressing the redo key binding.
    pub fn request_redo(&mut self) {
        self.events.push(WidgetEvent::Redo);
    }

    /// Rendered decorations by id.
    pub fn markers(&self) -> &BTreeMap<MarkerId, Decoration> {
        &self.markers
    }

    /// Installed style rules, in installation order.
    pub fn style_rules(&self) -> &[String] {
        &self.style_rules
    }

    fn splice(&mut self, text: &str, from: Pos, to: Pos) {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let start = self.index_from_pos(from);
        let end = self.index_from_pos(to);
        let removed = self.rope.slice(start..end).to_string();
        let change = NativeChange {
            from: self.pos_from_index(start),
            to: self.pos_from_index(end),
            text: text.split('\n').map(String::from).collect(),
            removed: removed.split('\n').map(String::from).collect(),
        };

        self.rope.remove(start..end);
        self.rope.insert(start, text);

        let removed_len = end - start;
        let inserted_len = text.chars().count();
        let map = |index: usize| map_index(index, start, removed_len, inserted_len);
        for (anchor, head) in &mut self.selections {
            *anchor = map(*anchor);
            *head = map(*head);
        }
        for decoration in self.markers.values_mut() {
            match decoration {
                Decoration::Bookmark { at, .. } => *at = map(*at),
                Decoration::Mark { from, to, .. } => {
                    *from = map(*from);
                    *to = map(*to);
                }
            }
        }

        self.events.push(WidgetEvent::Change);
        if let Some(batch) = self.batch.as_mut() {
            batch.changes.push(change);
        }
    }

    #[cfg(test)]
    pub(crate) fn push_event(&mut self, event: WidgetEvent) {
        self.events.push(event);
    }

    fn next_id(&mut self) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        id
    }
}

impl From<&str> for MemoryWidget {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

/// Char length of `line` without its trailing newline.
fn line_len(rope: &Rope, line: usize) -> usize {
    let slice = rope.line(line);
    let len = slice.len_chars();
    if len > 0 && slice.char(len - 1) == '\n' {
        len - 1
    } else {
        len
    }
}

/// Line and char of `index` in `rope`, clamped to its end.
pub(crate) fn rope_pos(rope: &Rope, index: usize) -> Pos {
    let index = index.min(rope.len_chars());
    let line = rope.char_to_line(index);
    Pos::new(line, index - rope.line_to_char(line))
}

/// Char offset of `pos` in `rope`. Past-the-end lines and columns clamp.
pub(crate) fn rope_index(rope: &Rope, pos: Pos) -> usize {
    if pos.line >= rope.len_lines() {
        return rope.len_chars();
    }
    rope.line_to_char(pos.line) + pos.ch.min(line_len(rope, pos.line))
}

/// Where `index` lands after `removed` chars at `from` are replaced by
/// `inserted` chars. Offsets inside the removed text move to the end of the
/// insertion.
fn map_index(index: usize, from: usize, removed: usize, inserted: usize) -> usize {
    if index <= from {
        index
    } else if index >= from + removed {
        index - removed + inserted
    } else {
        from + inserted
    }
}

impl Widget for MemoryWidget {
    fn value(&self) -> String {
        self.rope.to_string()
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn pos_from_index(&self, index: usize) -> Pos {
        rope_pos(&self.rope, index)
    }

    fn index_from_pos(&self, pos: Pos) -> usize {
        rope_index(&self.rope, pos)
    }

    fn list_selections(&self) -> Vec<(Pos, Pos)> {
        self.selections
            .iter()
            .map(|&(anchor, head)| (self.pos_from_index(anchor), self.pos_from_index(head)))
            .collect()
    }

    fn replace_range(&mut self, text: &str, from: Pos, to: Pos) {
        self.transaction(|widget| widget.splice(text, from, to));
    }

    fn transaction<F>(&mut self, edits: F)
    where
        F: FnOnce(&mut Self),
    {
        let opened = self.batch.is_none();
        if opened {
            self.batch = Some(Batch::default());
        }
        edits(self);
        if !opened {
            return;
        }
        if let Some(batch) = self.batch.take() {
            if !batch.changes.is_empty() || batch.selection_moved {
                self.events.push(WidgetEvent::CursorActivity);
            }
            if !batch.changes.is_empty() {
                // Cloning a rope shares its nodes.
                self.events.push(WidgetEvent::Changes {
                    changes: batch.changes,
                    after: self.rope.clone(),
                });
            }
        }
    }

    fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_bookmark(&mut self, pos: Pos, widget: CursorWidget) -> MarkerId {
        let id = self.next_id();
        let at = self.index_from_pos(pos);
        self.markers.insert(id, Decoration::Bookmark { at, widget });
        id
    }

    fn mark_text(&mut self, from: Pos, to: Pos, class_name: &str) -> MarkerId {
        let id = self.next_id();
        let (from, to) = (self.index_from_pos(from), self.index_from_pos(to));
        self.markers.insert(
            id,
            Decoration::Mark {
                from: from.min(to),
                to: from.max(to),
                class_name: class_name.to_string(),
            },
        );
        id
    }

    fn clear_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn ensure_style_rule(&mut self, rule: &str) {
        if !self.style_rules.iter().any(|r| r == rule) {
            self.style_rules.push(rule.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_round_trip() {
        let widget = MemoryWidget::from_str("ab\ncde\n\nf");
        assert_eq!(widget.pos_from_index(0), Pos::new(0, 0));
        assert_eq!(widget.pos_from_index(2), Pos::new(0, 2));
        assert_eq!(widget.pos_from_index(3), Pos::new(1, 0));
        assert_eq!(widget.pos_from_index(7), Pos::new(2, 0));
        assert_eq!(widget.pos_from_index(9), Pos::new(3, 1));
        for index in 0..=widget.len_chars() {
            assert_eq!(widget.index_from_pos(widget.pos_from_index(index)), index);
        }
    }

    #[test]
    fn test_index_from_pos_clamps() {
        let widget = MemoryWidget::from_str("ab\ncd");
        assert_eq!(widget.index_from_pos(Pos::new(0, 10)), 2);
        assert_eq!(widget.index_from_pos(Pos::new(9, 0)), 5);
        assert_eq!(widget.pos_from_index(99), Pos::new(1, 2));
    }

    #[test]
    fn test_carriage_return_is_not_a_line_break() {
        let widget = MemoryWidget::from_str("a\r\nb\rc");
        assert_eq!(widget.pos_from_index(3), Pos::new(1, 0));
        assert_eq!(widget.pos_from_index(5), Pos::new(1, 2));
    }

    #[test]
    fn test_single_edit_fires_batch() {
        let mut widget = MemoryWidget::from_str("hello");
        widget.replace_chars(5..5, " world");
        assert_eq!(widget.value(), "hello world");

        let events = widget.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], WidgetEvent::Change);
        assert_eq!(events[1], WidgetEvent::CursorActivity);
        let WidgetEvent::Changes { changes, after } = &events[2] else {
            panic!("expected a committed batch, got {:?}", events[2]);
        };
        assert_eq!(after.to_string(), "hello world");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from, Pos::new(0, 5));
        assert_eq!(changes[0].text, vec![" world".to_string()]);
        assert_eq!(changes[0].removed, vec![String::new()]);
        assert!(widget.drain_events().is_empty());
    }

    #[test]
    fn test_transaction_groups_edits() {
        let mut widget = MemoryWidget::from_str("hello world");
        widget.transaction(|w| {
            w.replace_chars(0..2, "Hi");
            w.replace_chars(5..6, "!");
            w.set_cursor(6);
        });
        assert_eq!(widget.value(), "Hillo!world");

        let events = widget.drain_events();
        assert_eq!(
            &events[..3],
            &[
                WidgetEvent::Change,
                WidgetEvent::Change,
                WidgetEvent::CursorActivity
            ]
        );
        match &events[3] {
            WidgetEvent::Changes { changes, .. } => assert_eq!(changes.len(), 2),
            other => panic!("expected a committed batch, got {other:?}"),
        }
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_batch_snapshot_is_not_affected_by_later_edits() {
        let mut widget = MemoryWidget::from_str("hello");
        widget.replace_chars(5..5, "!");
        widget.replace_chars(0..0, ">");
        assert_eq!(widget.value(), ">hello!");

        let snapshots: Vec<String> = widget
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                WidgetEvent::Changes { after, .. } => Some(after.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots, vec!["hello!", ">hello!"]);
    }

    #[test]
    fn test_multiline_change_shape() {
        let mut widget = MemoryWidget::from_str("ab\ncd");
        widget.replace_chars(1..4, "X\nY\n");
        assert_eq!(widget.value(), "aX\nY\nd");

        let events = widget.drain_events();
        let Some(WidgetEvent::Changes { changes, .. }) = events.last() else {
            panic!("expected a committed batch");
        };
        assert_eq!(changes[0].from, Pos::new(0, 1));
        assert_eq!(changes[0].to, Pos::new(1, 1));
        assert_eq!(changes[0].text, vec!["X", "Y", ""]);
        assert_eq!(changes[0].removed, vec!["b", "c"]);
    }

    #[test]
    fn test_selections_and_markers_follow_edits() {
        let mut widget = MemoryWidget::from_str("abcdef");
        widget.set_selections(vec![(1, 4)]);
        let mark = widget.mark_text(Pos::new(0, 4), Pos::new(0, 6), "selection-ff0000");
        widget.replace_chars(0..0, "__");
        assert_eq!(widget.list_selections(), vec![(Pos::new(0, 3), Pos::new(0, 6))]);
        assert_eq!(
            widget.markers()[&mark],
            Decoration::Mark {
                from: 6,
                to: 8,
                class_name: "selection-ff0000".into()
            }
        );

        // Deleting across the selection's head moves it to the edit point.
        widget.replace_chars(4..7, "");
        assert_eq!(widget.list_selections(), vec![(Pos::new(0, 3), Pos::new(0, 4))]);
    }

    #[test]
    fn test_style_rules_dedupe() {
        let mut widget = MemoryWidget::new();
        widget.ensure_style_rule(".a { }");
        widget.ensure_style_rule(".b { }");
        widget.ensure_style_rule(".a { }");
        assert_eq!(widget.style_rules(), &[".a { }", ".b { }"]);
    }

    #[test]
    fn test_clear_unknown_marker_is_ignored() {
        let mut widget = MemoryWidget::from_str("x");
        let id = widget.mark_text(Pos::new(0, 0), Pos::new(0, 1), "c");
        widget.clear_marker(MarkerId(99));
        assert_eq!(widget.markers().len(), 1);
        widget.clear_marker(id);
        assert!(widget.markers().is_empty());
    }
}
