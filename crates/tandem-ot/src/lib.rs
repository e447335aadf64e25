//! tandem-ot: operational transformation for plain-text documents.
//!
//! This crate provides:
//! - `TextOperation` - retain/insert/delete edits with apply, invert,
//!   compose and transform
//! - `Range` / `Selection` - cursors and selections that move with edits
//! - `UndoStack` - undo/redo of local edits that survives remote edits
//! - `OtError` - the error taxonomy shared by all of the above
//!
//! Everything here is pure and synchronous. Sequencing operations between
//! collaborators is left to the caller.

pub mod error;
pub mod history;
pub mod operation;
pub mod selection;

pub use error::OtError;
pub use history::{UndoManager, UndoStack};
pub use operation::{Op, TextOperation};
pub use selection::{Range, Selection};
