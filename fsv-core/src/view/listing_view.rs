//! src/view/listing_view.rs
//! ============================================================================
//! # Listing view
//!
//! The editable, line-oriented surface bound to one URL. Its content is
//! always the output of the last render; the view keeps no entry state of
//! its own beyond what is needed to map lines back to entries.

use compact_str::CompactString;

use crate::{
    error::{CoreError, CoreResult},
    model::url::Url,
    view::table::{RenderedListing, RenderedRow, StyleSpan},
};

pub type ViewId = u64;

/// Row and byte column, both zero based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

/// Virtual text shown beside a row (e.g. where a trashed entry came from).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub row: usize,
    pub text: CompactString,
}

#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub url: Url,
    pub lines: Vec<String>,
    pub spans: Vec<StyleSpan>,
    pub rows: Vec<RenderedRow>,
    pub annotations: Vec<Annotation>,
    pub cursor: Cursor,
    /// Text edited since the last render or save.
    pub modified: bool,
    pub visible: bool,
    /// Needs a render the next time it becomes visible.
    pub dirty: bool,
    /// A fetch for this view is in flight.
    pub loading: bool,
    /// Whether the adapter behind the URL accepts edits.
    pub adapter_mutable: bool,
    pub locked: bool,
    pub last_error: Option<CompactString>,
    /// Number of completed renders, intermediate ones included.
    pub renders: u64,
}

impl View {
    #[must_use]
    pub fn new(id: ViewId, url: Url) -> Self {
        Self {
            id,
            url,
            lines: Vec::new(),
            spans: Vec::new(),
            rows: Vec::new(),
            annotations: Vec::new(),
            cursor: Cursor::default(),
            modified: false,
            visible: true,
            dirty: false,
            loading: false,
            adapter_mutable: true,
            locked: false,
            last_error: None,
            renders: 0,
        }
    }

    /// Replace the content with a fresh render.
    pub fn apply_listing(&mut self, listing: RenderedListing) {
        self.lines = listing.lines;
        self.spans = listing.spans;
        self.rows = listing.rows;
        self.modified = false;
        self.dirty = false;
        self.last_error = None;
        self.renders += 1;
        self.clamp_cursor();
    }

    /// Replace the content with an error message.
    pub fn show_error(&mut self, message: &str) {
        self.lines = message.lines().map(str::to_owned).collect();
        self.spans.clear();
        self.rows.clear();
        self.annotations.clear();
        self.modified = false;
        self.last_error = Some(CompactString::new(message));
        self.clamp_cursor();
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.clamp_cursor();
    }

    #[must_use]
    pub fn current_line(&self) -> Option<&str> {
        self.lines.get(self.cursor.row).map(String::as_str)
    }

    #[must_use]
    pub const fn is_modifiable(&self) -> bool {
        self.adapter_mutable && !self.locked && self.last_error.is_none()
    }

    /// Host-side edit of one line. Refused while the view is read-only.
    pub fn edit_line(&mut self, row: usize, text: impl Into<String>) -> CoreResult<()> {
        if !self.is_modifiable() {
            return Err(CoreError::ViewLocked(self.id));
        }

        let text = text.into();
        match self.lines.get_mut(row) {
            Some(line) => *line = text,
            None => self.lines.push(text),
        }
        self.modified = true;
        Ok(())
    }

    /// The host persisted the edits elsewhere.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    fn clamp_cursor(&mut self) {
        let last = self.lines.len().saturating_sub(1);
        self.cursor.row = self.cursor.row.min(last);
        let len = self.lines.get(self.cursor.row).map_or(0, String::len);
        self.cursor.col = self.cursor.col.min(len);
    }
}
