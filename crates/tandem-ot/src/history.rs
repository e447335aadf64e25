//! Undo/redo over operations in a collaborative document.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo state queries
//! - `UndoStack` - stacks of inverse operations that stay valid while
//!   concurrent remote operations arrive

use std::collections::VecDeque;

use crate::error::OtError;
use crate::operation::TextOperation;

/// Trait for querying and resetting undo/redo state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum UndoState {
    #[default]
    Normal,
    Undoing,
    Redoing,
}

/// Stacks of inverse operations for local undo/redo.
///
/// Push the inverse of every local operation with [`UndoStack::add`], and
/// rebase the stacks over every remote operation with
/// [`UndoStack::transform`], so that undoing only reverts the local user's
/// own edits.
#[derive(Clone, Debug)]
pub struct UndoStack {
    undo_stack: VecDeque<TextOperation>,
    redo_stack: Vec<TextOperation>,
    max_items: usize,
    state: UndoState,
    dont_compose: bool,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(50)
    }
}

impl UndoStack {
    /// Create an empty stack keeping at most `max_items` undo entries.
    pub fn new(max_items: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_items,
            state: UndoState::Normal,
            dont_compose: false,
        }
    }

    /// Record the inverse of an operation.
    ///
    /// With `compose`, the inverse is merged into the most recent undo entry
    /// so both revert in one step (for example consecutive keystrokes).
    /// During `perform_undo` the entry goes to the redo stack instead, and
    /// during `perform_redo` to the undo stack.
    pub fn add(&mut self, inverse: TextOperation, compose: bool) -> Result<(), OtError> {
        match self.state {
            UndoState::Undoing => {
                self.redo_stack.push(inverse);
                self.dont_compose = true;
            }
            UndoState::Redoing => {
                self.undo_stack.push_back(inverse);
                self.dont_compose = true;
            }
            UndoState::Normal => {
                match self.undo_stack.back_mut() {
                    // The entry is only replaced once composing succeeded.
                    Some(last) if !self.dont_compose && compose => *last = inverse.compose(last)?,
                    _ => {
                        self.undo_stack.push_back(inverse);
                        while self.undo_stack.len() > self.max_items {
                            self.undo_stack.pop_front();
                        }
                    }
                }
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Rebase both stacks over a concurrent remote operation.
    pub fn transform(&mut self, remote: &TextOperation) -> Result<(), OtError> {
        let undo = transform_stack(self.undo_stack.iter(), remote)?;
        self.undo_stack = undo.into();
        self.redo_stack = transform_stack(self.redo_stack.iter(), remote)?;
        tracing::trace!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "rebased history over remote operation"
        );
        Ok(())
    }

    /// Pop the latest undo entry and hand it to `apply`.
    ///
    /// `apply` performs the operation on the document and returns its
    /// inverse, which lands on the redo stack. Returns `false` when there is
    /// nothing to undo. If `apply` fails the entry stays on the stack.
    pub fn perform_undo<F>(&mut self, apply: F) -> Result<bool, OtError>
    where
        F: FnOnce(&TextOperation) -> Result<TextOperation, OtError>,
    {
        let Some(op) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        self.state = UndoState::Undoing;
        let result = match apply(&op) {
            Ok(inverse) => self.add(inverse, false),
            Err(err) => {
                self.undo_stack.push_back(op);
                Err(err)
            }
        };
        self.state = UndoState::Normal;
        result.map(|()| true)
    }

    /// Pop the latest redo entry and hand it to `apply`. See `perform_undo`.
    pub fn perform_redo<F>(&mut self, apply: F) -> Result<bool, OtError>
    where
        F: FnOnce(&TextOperation) -> Result<TextOperation, OtError>,
    {
        let Some(op) = self.redo_stack.pop() else {
            return Ok(false);
        };
        self.state = UndoState::Redoing;
        let result = match apply(&op) {
            Ok(inverse) => self.add(inverse, false),
            Err(err) => {
                self.redo_stack.push(op);
                Err(err)
            }
        };
        self.state = UndoState::Normal;
        result.map(|()| true)
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    /// Number of undo entries.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
}

impl UndoManager for UndoStack {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Transform a stack (oldest first) against `remote`, newest entry first.
///
/// Entries that become no-ops are dropped.
fn transform_stack<'a>(
    stack: impl DoubleEndedIterator<Item = &'a TextOperation>,
    remote: &TextOperation,
) -> Result<Vec<TextOperation>, OtError> {
    let mut remote = remote.clone();
    let mut rebased = Vec::new();
    for entry in stack.rev() {
        let (entry_prime, remote_prime) = TextOperation::transform(entry, &remote)?;
        if !entry_prime.is_noop() {
            rebased.push(entry_prime);
        }
        remote = remote_prime;
    }
    rebased.reverse();
    Ok(rebased)
}
