//! tandem-editor: keeps a live text-editing widget in step with a
//! collaborative document.
//!
//! This crate provides:
//! - `Widget` trait for the editing component the adapter drives
//! - `EditorAdapter<W>` - turns local edit batches into operations and
//!   applies remote operations without echoing them
//! - Remote cursor and selection decorations
//! - `MemoryWidget` - rope-backed widget for headless hosts and tests
//! - `EditorConfig` - decoration settings, loadable from JSON or TOML

pub mod adapter;
pub mod changes;
pub mod config;
pub mod decoration;
pub mod memory;
pub mod widget;

pub use adapter::{AdapterCallbacks, EditorAdapter};
pub use changes::{apply_to_widget, operation_from_changes};
pub use config::{ConfigError, EditorConfig};
pub use decoration::{CursorWidget, HexColor, Marker, OtherSelection};
pub use memory::{Decoration, MemoryWidget};
pub use widget::{MarkerId, NativeChange, Pos, Widget, WidgetEvent};
