//! Bridge between a live widget and the OT client.
//!
//! The adapter turns the widget's batches of local edits into operations for
//! the client, applies remote operations to the widget without reporting
//! them back, and forwards selection and focus changes.
//!
//! Events are pulled: the host calls [`EditorAdapter::pump`] after it lets
//! the widget process input, and the adapter dispatches whatever the widget
//! fired since the last call.

use tandem_ot::{OtError, Range, Selection, TextOperation};
use tracing::{debug, trace, warn};

use crate::changes::{apply_to_widget, operation_from_changes};
use crate::config::EditorConfig;
use crate::widget::{Widget, WidgetEvent};

type ChangeHandler = Box<dyn FnMut(&TextOperation, &TextOperation)>;
type SelectionHandler = Box<dyn FnMut(&Selection)>;
type Handler = Box<dyn FnMut()>;

/// Handlers the client installs on the adapter.
///
/// Each is optional; events without a handler are dropped.
#[derive(Default)]
pub struct AdapterCallbacks {
    change: Option<ChangeHandler>,
    selection_change: Option<SelectionHandler>,
    blur: Option<Handler>,
}

impl AdapterCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(operation, inverse)` for every batch of local edits.
    pub fn on_change(mut self, f: impl FnMut(&TextOperation, &TextOperation) + 'static) -> Self {
        self.change = Some(Box::new(f));
        self
    }

    /// Called with the local selection whenever it moves.
    pub fn on_selection_change(mut self, f: impl FnMut(&Selection) + 'static) -> Self {
        self.selection_change = Some(Box::new(f));
        self
    }

    /// Called when the widget loses focus with nothing selected.
    pub fn on_blur(mut self, f: impl FnMut() + 'static) -> Self {
        self.blur = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for AdapterCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterCallbacks")
            .field("change", &self.change.is_some())
            .field("selection_change", &self.selection_change.is_some())
            .field("blur", &self.blur.is_some())
            .finish()
    }
}

/// Owns a widget and keeps it in step with the collaborative document.
///
/// Remote edits only reach the widget through [`apply_operation`], which
/// keeps them from being reported as local changes.
///
/// [`apply_operation`]: EditorAdapter::apply_operation
pub struct EditorAdapter<W: Widget> {
    pub(crate) widget: W,
    pub(crate) config: EditorConfig,
    callbacks: AdapterCallbacks,
    undo: Option<Handler>,
    redo: Option<Handler>,
    /// The next committed batch is our own remote application.
    ignore_next_change: bool,
    /// A batch is open on the widget.
    change_in_progress: bool,
    /// The selection moved while a batch was open.
    selection_changed: bool,
}

impl<W: Widget> EditorAdapter<W> {
    pub fn new(widget: W) -> Self {
        Self::with_config(widget, EditorConfig::default())
    }

    pub fn with_config(widget: W, config: EditorConfig) -> Self {
        Self {
            widget,
            config,
            callbacks: AdapterCallbacks::default(),
            undo: None,
            redo: None,
            ignore_next_change: false,
            change_in_progress: false,
            selection_changed: false,
        }
    }

    /// Install handlers, replacing any set before.
    pub fn register_callbacks(&mut self, callbacks: AdapterCallbacks) {
        self.callbacks = callbacks;
    }

    /// Run `f` when the user asks the widget to undo.
    pub fn register_undo(&mut self, f: impl FnMut() + 'static) {
        self.undo = Some(Box::new(f));
    }

    /// Run `f` when the user asks the widget to redo.
    pub fn register_redo(&mut self, f: impl FnMut() + 'static) {
        self.redo = Some(Box::new(f));
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    /// Mutable access for delivering user input to the widget. Edits made
    /// here are local edits; call [`EditorAdapter::pump`] afterwards.
    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    /// Current document text.
    pub fn value(&self) -> String {
        self.widget.value()
    }

    /// The local user's selection in char offsets.
    pub fn selection(&self) -> Selection {
        Selection::new(
            self.widget
                .list_selections()
                .into_iter()
                .map(|(anchor, head)| {
                    Range::new(
                        self.widget.index_from_pos(anchor),
                        self.widget.index_from_pos(head),
                    )
                })
                .collect(),
        )
    }

    /// Dispatch every event the widget fired since the last call.
    ///
    /// All events are handled even if one fails; the first error is
    /// returned.
    pub fn pump(&mut self) -> Result<(), OtError> {
        let mut first_error = None;
        for event in self.widget.drain_events() {
            if let Err(err) = self.handle_event(event) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Handle one widget notification.
    pub fn handle_event(&mut self, event: WidgetEvent) -> Result<(), OtError> {
        match event {
            WidgetEvent::Change => {
                self.change_in_progress = true;
                Ok(())
            }
            WidgetEvent::Changes { changes, after } => {
                let result = if self.ignore_next_change {
                    debug!(edits = changes.len(), "skipping echo of remote operation");
                    Ok(())
                } else {
                    operation_from_changes(&changes, &after)
                        .map(|(operation, inverse)| self.trigger_change(&operation, &inverse))
                };
                if let Err(err) = &result {
                    warn!(error = %err, edits = changes.len(), "could not derive operation");
                }
                if self.selection_changed {
                    self.trigger_selection_change();
                }
                self.change_in_progress = false;
                self.selection_changed = false;
                self.ignore_next_change = false;
                result
            }
            WidgetEvent::CursorActivity | WidgetEvent::Focus => {
                if self.change_in_progress {
                    trace!("selection moved mid-batch, reporting after commit");
                    self.selection_changed = true;
                } else {
                    self.trigger_selection_change();
                }
                Ok(())
            }
            WidgetEvent::Blur => {
                if !self.widget.something_selected() {
                    if let Some(blur) = self.callbacks.blur.as_mut() {
                        blur();
                    }
                }
                Ok(())
            }
            WidgetEvent::Undo => {
                if let Some(undo) = self.undo.as_mut() {
                    undo();
                }
                Ok(())
            }
            WidgetEvent::Redo => {
                if let Some(redo) = self.redo.as_mut() {
                    redo();
                }
                Ok(())
            }
        }
    }

    /// Apply a remote operation to the widget.
    ///
    /// Pending local events are dispatched first. A local batch that fails
    /// to convert is logged and does not stop the remote operation; errors
    /// returned here are about `operation` only. The widget content is left
    /// untouched if the operation does not fit it, and the edit is never
    /// reported back through the change handler.
    pub fn apply_operation(&mut self, operation: &TextOperation) -> Result<(), OtError> {
        if let Err(err) = self.pump() {
            warn!(error = %err, "dropped pending local events before remote operation");
        }

        let len = self.widget.len_chars();
        if operation.base_len() != len {
            warn!(
                expected = operation.base_len(),
                actual = len,
                "remote operation does not fit the document"
            );
            return Err(OtError::LengthMismatch {
                expected: operation.base_len(),
                actual: len,
            });
        }

        self.ignore_next_change = true;
        self.widget
            .transaction(|widget| apply_to_widget(operation, widget));
        let result = self.pump();
        self.ignore_next_change = false;
        trace!(%operation, "applied remote operation");
        result
    }

    /// Stop listening and hand the widget back.
    pub fn detach(self) -> W {
        debug!("adapter detached");
        self.widget
    }

    fn trigger_change(&mut self, operation: &TextOperation, inverse: &TextOperation) {
        trace!(%operation, "local change");
        if let Some(change) = self.callbacks.change.as_mut() {
            change(operation, inverse);
        }
    }

    fn trigger_selection_change(&mut self) {
        if self.callbacks.selection_change.is_none() {
            return;
        }
        let selection = self.selection();
        if let Some(selection_change) = self.callbacks.selection_change.as_mut() {
            selection_change(&selection);
        }
    }
}

impl<W: Widget + std::fmt::Debug> std::fmt::Debug for EditorAdapter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorAdapter")
            .field("widget", &self.widget)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .field("ignore_next_change", &self.ignore_next_change)
            .field("change_in_progress", &self.change_in_progress)
            .field("selection_changed", &self.selection_changed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ropey::Rope;

    use super::*;
    use crate::memory::MemoryWidget;
    use crate::widget::{NativeChange, Pos};

    #[test]
    fn test_bad_local_batch_does_not_block_remote_operation() {
        let mut adapter = EditorAdapter::new(MemoryWidget::from_str("a"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        adapter.register_callbacks(
            AdapterCallbacks::new().on_change(move |op, _| sink.borrow_mut().push(op.clone())),
        );

        // Claims three inserted chars in a one-char document.
        adapter.widget_mut().push_event(WidgetEvent::Changes {
            changes: vec![NativeChange {
                from: Pos::new(0, 0),
                to: Pos::new(0, 0),
                text: vec!["xyz".into()],
                removed: vec![String::new()],
            }],
            after: Rope::from_str("a"),
        });

        let remote = TextOperation::new().retain(1).insert("b");
        adapter.apply_operation(&remote).unwrap();
        assert_eq!(adapter.value(), "ab");
        assert!(seen.borrow().is_empty());

        adapter.widget_mut().replace_chars(0..0, ">");
        adapter.pump().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![TextOperation::new().insert(">").retain(2)]
        );
    }

    #[test]
    fn test_mismatched_remote_operation_reports_its_own_error() {
        let mut adapter = EditorAdapter::new(MemoryWidget::from_str("abc"));
        adapter.widget_mut().push_event(WidgetEvent::Changes {
            changes: vec![NativeChange {
                from: Pos::new(0, 0),
                to: Pos::new(0, 0),
                text: vec!["wxyz".into()],
                removed: vec![String::new()],
            }],
            after: Rope::from_str("abc"),
        });

        let remote = TextOperation::new().retain(7);
        assert!(matches!(
            adapter.apply_operation(&remote),
            Err(OtError::LengthMismatch {
                expected: 7,
                actual: 3
            })
        ));
        assert_eq!(adapter.value(), "abc");
    }
}
