//! Scripted editing sessions.
//!
//! A script starts from a document and plays a list of steps against an
//! `EditorAdapter<MemoryWidget>`: local edits and cursor moves as the user
//! would make them, remote operations and selections as a server would
//! deliver them, and undo/redo key presses. Local edits feed an `UndoStack`
//! that is rebased over every remote operation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tandem_editor::{
    AdapterCallbacks, EditorAdapter, EditorConfig, MemoryWidget, OtherSelection, Widget,
};
use tandem_ot::{OtError, Selection, TextOperation, UndoStack};

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub text: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Local edits committed as one batch.
    Edit(Vec<Edit>),
    /// Move the local selection.
    Select(Selection),
    /// A remote operation from the server.
    Remote(TextOperation),
    /// A collaborator's selection, replacing the one shown before.
    RemoteSelection {
        client: String,
        color: String,
        selection: Selection,
    },
    Focus,
    Blur,
    Undo,
    Redo,
}

/// Replace chars `from..to` with `text`.
#[derive(Debug, Deserialize)]
pub struct Edit {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub text: String,
}

/// What the session reports, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Change {
        operation: TextOperation,
        inverse: TextOperation,
    },
    Selection(Selection),
    Blur,
    Remote(TextOperation),
    Rejected {
        operation: TextOperation,
        error: String,
    },
    Decorations {
        client: String,
        markers: usize,
    },
    Undo(TextOperation),
    Redo(TextOperation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Undo,
    Redo,
}

/// Final state of a replayed session.
#[derive(Debug)]
pub struct Replay {
    pub events: Vec<Event>,
    pub text: String,
}

struct Session {
    adapter: EditorAdapter<MemoryWidget>,
    undo: UndoStack,
    reported: Rc<RefCell<Vec<Event>>>,
    requests: Rc<RefCell<Vec<Request>>>,
    remote_selections: BTreeMap<String, OtherSelection>,
    events: Vec<Event>,
}

pub fn run(script: Script, config: EditorConfig) -> Result<Replay, OtError> {
    let mut session = Session::new(&script.text, config);
    for (index, step) in script.steps.into_iter().enumerate() {
        tracing::debug!(index, ?step, "replay step");
        session.step(step)?;
    }
    Ok(Replay {
        events: session.events,
        text: session.adapter.value(),
    })
}

impl Session {
    fn new(text: &str, config: EditorConfig) -> Self {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let requests = Rc::new(RefCell::new(Vec::new()));
        let mut adapter = EditorAdapter::with_config(MemoryWidget::from_str(text), config);

        let (on_change, on_selection, on_blur) =
            (reported.clone(), reported.clone(), reported.clone());
        adapter.register_callbacks(
            AdapterCallbacks::new()
                .on_change(move |operation, inverse| {
                    on_change.borrow_mut().push(Event::Change {
                        operation: operation.clone(),
                        inverse: inverse.clone(),
                    })
                })
                .on_selection_change(move |selection| {
                    on_selection
                        .borrow_mut()
                        .push(Event::Selection(selection.clone()))
                })
                .on_blur(move || on_blur.borrow_mut().push(Event::Blur)),
        );
        let (on_undo, on_redo) = (requests.clone(), requests.clone());
        adapter.register_undo(move || on_undo.borrow_mut().push(Request::Undo));
        adapter.register_redo(move || on_redo.borrow_mut().push(Request::Redo));

        Self {
            adapter,
            undo: UndoStack::default(),
            reported,
            requests,
            remote_selections: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    fn step(&mut self, step: Step) -> Result<(), OtError> {
        match step {
            Step::Edit(edits) => {
                self.adapter.widget_mut().transaction(|widget| {
                    for edit in &edits {
                        widget.replace_chars(edit.from..edit.to, &edit.text);
                    }
                });
            }
            Step::Select(selection) => {
                let ranges = selection
                    .ranges
                    .iter()
                    .map(|range| (range.anchor, range.head))
                    .collect();
                self.adapter.widget_mut().set_selections(ranges);
            }
            Step::Remote(operation) => {
                match self.adapter.apply_operation(&operation) {
                    Ok(()) => {
                        self.undo.transform(&operation)?;
                        self.collect()?;
                        self.events.push(Event::Remote(operation));
                    }
                    Err(err) => {
                        self.collect()?;
                        self.events.push(Event::Rejected {
                            operation,
                            error: err.to_string(),
                        });
                    }
                }
                return Ok(());
            }
            Step::RemoteSelection {
                client,
                color,
                selection,
            } => {
                if let Some(previous) = self.remote_selections.remove(&client) {
                    previous.clear(&mut self.adapter);
                }
                let rendered = self
                    .adapter
                    .set_other_selection(&selection, &color, &client)?;
                self.events.push(Event::Decorations {
                    client: client.clone(),
                    markers: rendered.markers().len(),
                });
                self.remote_selections.insert(client, rendered);
            }
            Step::Focus => self.adapter.widget_mut().focus(),
            Step::Blur => self.adapter.widget_mut().blur(),
            Step::Undo => self.adapter.widget_mut().request_undo(),
            Step::Redo => self.adapter.widget_mut().request_redo(),
        }
        self.adapter.pump()?;
        self.collect()?;
        self.perform_requests()
    }

    /// Move what the callbacks reported into the event log, recording the
    /// inverse of every local change for undo.
    fn collect(&mut self) -> Result<(), OtError> {
        let reported: Vec<Event> = self.reported.borrow_mut().drain(..).collect();
        for event in reported {
            if let Event::Change { inverse, .. } = &event {
                self.undo.add(inverse.clone(), false)?;
            }
            self.events.push(event);
        }
        Ok(())
    }

    fn perform_requests(&mut self) -> Result<(), OtError> {
        let requests: Vec<Request> = self.requests.borrow_mut().drain(..).collect();
        for request in requests {
            let adapter = &mut self.adapter;
            let mut applied = None;
            let apply = |operation: &TextOperation| -> Result<TextOperation, OtError> {
                let inverse = operation.invert(&adapter.value());
                adapter.apply_operation(operation)?;
                applied = Some(operation.clone());
                Ok(inverse)
            };
            let performed = match request {
                Request::Undo => self.undo.perform_undo(apply)?,
                Request::Redo => self.undo.perform_redo(apply)?,
            };
            if !performed {
                tracing::info!(?request, "history is empty, request ignored");
            }
            self.collect()?;
            if let Some(operation) = applied {
                self.events.push(match request {
                    Request::Undo => Event::Undo(operation),
                    Request::Redo => Event::Redo(operation),
                });
            }
        }
        Ok(())
    }
}
