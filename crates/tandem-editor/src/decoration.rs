//! Remote cursor and selection decorations.
//!
//! Collaborators' carets render as zero-width bookmarks with a colored left
//! border; their selections render as highlighted ranges styled by a
//! per-color rule the widget installs on demand.

use std::fmt;
use std::str::FromStr;

use tandem_ot::{OtError, Range, Selection};

use crate::adapter::EditorAdapter;
use crate::widget::{MarkerId, Widget};

/// A `#RRGGBB` color, packed as `0xRRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HexColor(u32);

impl HexColor {
    /// Parse exactly `#` followed by six hex digits.
    pub fn parse(color: &str) -> Result<Self, OtError> {
        let invalid = || OtError::InvalidColor(color.to_string());
        let digits = color
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(invalid)?;
        u32::from_str_radix(digits, 16).map(Self).map_err(|_| invalid())
    }

    /// Six lowercase hex digits, no `#`.
    pub fn hex_digits(self) -> String {
        format!("{:06x}", self.0)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl FromStr for HexColor {
    type Err = OtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What a widget draws for a remote caret.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorWidget {
    pub class_name: String,
    pub color: HexColor,
    /// Left border width in pixels.
    pub border_px: u32,
    /// Marker height as a fraction of the line height.
    pub height_ratio: f64,
    /// Collaborator the caret belongs to.
    pub client_id: String,
}

impl CursorWidget {
    /// Inline style for the marker, minus the height (the widget knows its
    /// line height).
    pub fn style(&self) -> String {
        format!(
            "display: inline-block; padding: 0; margin-left: -1px; margin-right: -1px; \
             border-left: {}px solid {}; z-index: 0",
            self.border_px, self.color
        )
    }
}

/// A single rendered decoration.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a marker leaves the decoration rendered"]
pub struct Marker(MarkerId);

impl Marker {
    pub fn id(&self) -> MarkerId {
        self.0
    }

    /// Remove the decoration from the widget.
    pub fn clear<W: Widget>(self, adapter: &mut EditorAdapter<W>) {
        adapter.widget.clear_marker(self.0);
    }
}

/// All decorations rendered for one collaborator's selection.
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use = "dropping the handle leaves the decorations rendered"]
pub struct OtherSelection {
    markers: Vec<Marker>,
}

impl OtherSelection {
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Remove every decoration of the selection together.
    pub fn clear<W: Widget>(self, adapter: &mut EditorAdapter<W>) {
        for marker in self.markers {
            marker.clear(adapter);
        }
    }
}

impl<W: Widget> EditorAdapter<W> {
    /// Render a collaborator's caret at `position`.
    pub fn set_other_cursor(
        &mut self,
        position: usize,
        color: &str,
        client_id: &str,
    ) -> Result<Marker, OtError> {
        let color = HexColor::parse(color)?;
        let pos = self.widget.pos_from_index(position);
        let cursor = CursorWidget {
            class_name: self.config.cursor_class.clone(),
            color,
            border_px: self.config.cursor_border_px,
            height_ratio: self.config.cursor_height_ratio,
            client_id: client_id.to_string(),
        };
        Ok(Marker(self.widget.set_bookmark(pos, cursor)))
    }

    /// Highlight a collaborator's non-empty range.
    pub fn set_other_selection_range(
        &mut self,
        range: Range,
        color: &str,
    ) -> Result<Marker, OtError> {
        let color = HexColor::parse(color)?;
        let class_name = format!(
            "{}{}",
            self.config.selection_class_prefix,
            color.hex_digits()
        );
        self.widget
            .ensure_style_rule(&format!(".{class_name} {{ background: {color}; }}"));

        let from = self.widget.pos_from_index(range.start());
        let to = self.widget.pos_from_index(range.end());
        Ok(Marker(self.widget.mark_text(from, to, &class_name)))
    }

    /// Render every range of a collaborator's selection.
    ///
    /// Carets render at their head, spans as highlights. The color is
    /// checked up front so an invalid one renders nothing.
    pub fn set_other_selection(
        &mut self,
        selection: &Selection,
        color: &str,
        client_id: &str,
    ) -> Result<OtherSelection, OtError> {
        HexColor::parse(color)?;
        let markers = selection
            .ranges
            .iter()
            .map(|range| {
                if range.is_empty() {
                    self.set_other_cursor(range.head, color, client_id)
                } else {
                    self.set_other_selection_range(*range, color)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::trace!(
            client_id,
            ranges = markers.len(),
            "set_other_selection: rendered"
        );
        Ok(OtherSelection { markers })
    }
}
