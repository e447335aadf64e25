//! Deriving operations from native change batches.
//!
//! A widget reports each edit of a batch in the coordinates of the document
//! right before that edit. Only the document after the batch is available
//! to query, so positions are resolved by replaying the batch backwards: a
//! position in the coordinates before edit `i` is pushed forward through
//! edits `i..` until it reaches final coordinates, then looked up in that
//! document, and the length changes of the edits it crossed are undone on
//! the way back. This is quadratic in the batch size, which stays small (the edits
//! between two flushes).

use ropey::Rope;
use tandem_ot::{Op, OtError, TextOperation};

use crate::memory::rope_index;
use crate::widget::{NativeChange, Pos, Widget};

/// Convert a committed batch into `(operation, inverse)`.
///
/// `after` is the document right after the batch, as carried by
/// [`WidgetEvent::Changes`](crate::widget::WidgetEvent::Changes). The
/// operation maps the pre-batch document to it; the inverse maps back.
pub fn operation_from_changes(
    changes: &[NativeChange],
    after: &Rope,
) -> Result<(TextOperation, TextOperation), OtError> {
    let mut doc_end_len = after.len_chars();
    let mut operation = TextOperation::new().retain(doc_end_len);
    let mut inverse = TextOperation::new().retain(doc_end_len);

    for (i, change) in changes.iter().enumerate().rev() {
        let from_index = index_before(after, &changes[i..], change.from);
        let inserted_len = change.inserted_len();
        let removed_len = change.removed_len();
        let rest_len = doc_end_len
            .checked_sub(from_index + inserted_len)
            .ok_or(OtError::OutOfRange {
                position: from_index + inserted_len,
                len: doc_end_len,
            })?;

        let local = TextOperation::new()
            .retain(from_index)
            .delete(removed_len)
            .insert(&change.text.join("\n"))
            .retain(rest_len);
        operation = local.compose(&operation)?;

        let local_inverse = TextOperation::new()
            .retain(from_index)
            .delete(inserted_len)
            .insert(&change.removed.join("\n"))
            .retain(rest_len);
        inverse = inverse.compose(&local_inverse)?;

        tracing::trace!(
            edit = i,
            from_index,
            inserted_len,
            removed_len,
            "operation_from_changes: folded edit"
        );

        doc_end_len = doc_end_len + removed_len - inserted_len;
    }

    Ok((operation, inverse))
}

/// Replay `operation` on `widget` step by step.
///
/// The caller checks the base length and wraps this in a transaction.
pub fn apply_to_widget<W: Widget>(operation: &TextOperation, widget: &mut W) {
    let mut index = 0;
    for op in operation.ops() {
        match op {
            Op::Retain(n) => index += n,
            Op::Insert(text) => {
                let pos = widget.pos_from_index(index);
                widget.replace_range(text, pos, pos);
                index += text.chars().count();
            }
            Op::Delete(n) => {
                let from = widget.pos_from_index(index);
                let to = widget.pos_from_index(index + n);
                widget.replace_range("", from, to);
            }
        }
    }
}

/// Char index of `pos`, given in the coordinates right before `later[0]`,
/// within the document as it was at that point.
///
/// `later` holds that edit and every edit after it in the batch.
fn index_before(after: &Rope, later: &[NativeChange], pos: Pos) -> usize {
    let Some((change, rest)) = later.split_first() else {
        return rope_index(after, pos);
    };

    if pos <= change.from {
        return index_before(after, rest, pos);
    }

    if change.to <= pos {
        let text_lines = change.text.len().max(1);
        let line = pos.line - (change.to.line - change.from.line) + (text_lines - 1);
        let ch = if change.to.line < pos.line {
            pos.ch
        } else if text_lines == 1 {
            pos.ch - change.to.ch + change.from.ch + change.inserted_len()
        } else {
            pos.ch - change.to.ch + change.text.last().map_or(0, |l| l.chars().count())
        };
        let index = index_before(after, rest, Pos::new(line, ch));
        return (index + change.removed_len()).saturating_sub(change.inserted_len());
    }

    // Inside the replaced span: count into the removed text.
    let start = index_before(after, rest, change.from);
    if change.from.line == pos.line {
        return start + pos.ch - change.from.ch;
    }
    let lines_before = change
        .removed
        .get(..pos.line - change.from.line)
        .unwrap_or(&change.removed);
    start + crate::widget::joined_len(lines_before) + 1 + pos.ch
}
