//! src/controller/cursor.rs
//! ============================================================================
//! # Cursor tracking and constraint
//!
//! The tracker remembers, per URL, the name of the entry the cursor was last
//! on. A render that asks for a jump consumes that name once: the cursor
//! lands on the matching row, or the name is dropped when the entry is gone.
//!
//! The constraint keeps the cursor out of the identity token (and, in
//! `Editable` mode, out of read-only columns).

use std::sync::Arc;

use ahash::AHashMap;
use compact_str::CompactString;
use tracing::{debug, trace};

use crate::{
    config::ConstrainMode,
    model::url::Url,
    view::{
        columns::Column,
        listing_view::{Cursor, View},
        parse::parse_line,
    },
};

#[derive(Debug, Default)]
pub struct CursorTracker {
    last_entry: AHashMap<Url, CompactString>,
}

impl CursorTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the cursor in a view of `url` sits on `name`.
    pub fn remember(&mut self, url: &Url, name: impl Into<CompactString>) {
        let name = name.into();
        trace!(marker = "CURSOR", url = %url, name = %name, "Remembering cursor entry");
        self.last_entry.insert(url.clone(), name);
    }

    #[must_use]
    pub fn remembered(&self, url: &Url) -> Option<&str> {
        self.last_entry.get(url).map(CompactString::as_str)
    }

    /// Place the cursor after a render. Returns `true` if it moved.
    ///
    /// The remembered name is consumed whether or not it is found.
    pub fn restore(&mut self, view: &mut View, jump_first: bool) -> bool {
        if let Some(name) = self.last_entry.remove(&view.url) {
            if let Some(row_idx) = view.rows.iter().position(|row| row.name == name) {
                let col = view.rows[row_idx].name_col;
                view.set_cursor(Cursor { row: row_idx, col });

                debug!(
                    marker = "CURSOR",
                    url = %view.url,
                    name = %name,
                    row = row_idx,
                    "Cursor restored to remembered entry"
                );
                return true;
            }

            debug!(
                marker = "CURSOR",
                url = %view.url,
                name = %name,
                "Remembered entry no longer listed"
            );
        }

        match view.rows.first() {
            Some(first) if jump_first => {
                let col = first.name_col;
                view.set_cursor(Cursor { row: 0, col });
                true
            }
            _ => false,
        }
    }
}

/// Column the cursor must be moved to, if it sits left of what `mode`
/// allows on `line`.
#[must_use]
pub fn constrain_cursor(
    mode: ConstrainMode,
    line: &str,
    columns: &[Arc<dyn Column>],
    cursor_col: usize,
) -> Option<usize> {
    let min_col = match mode {
        ConstrainMode::Off => return None,
        ConstrainMode::Name => parse_line(line, columns)?.name.start,
        ConstrainMode::Editable => parse_line(line, columns)?.first_editable(),
    };

    (cursor_col < min_col).then_some(min_col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{
        columns::{PermissionsColumn, SizeColumn},
        table::{RenderedListing, RenderedRow},
    };

    fn view_with(names: &[&str]) -> View {
        let mut view = View::new(1, Url::parse("dir://a/").expect("url"));
        let rows: Vec<RenderedRow> = names
            .iter()
            .enumerate()
            .map(|(i, name)| RenderedRow {
                id: i as u64 + 1,
                name: CompactString::new(name),
                name_col: 5,
            })
            .collect();
        let lines = rows
            .iter()
            .map(|r| format!("/{:03} {}", r.id, r.name))
            .collect();
        view.apply_listing(RenderedListing {
            lines,
            spans: Vec::new(),
            rows,
        });
        view
    }

    #[test]
    fn test_restore_lands_on_remembered_entry_once() {
        let mut view = view_with(&["a", "b", "c"]);
        let mut tracker = CursorTracker::new();
        tracker.remember(&view.url, "c");

        assert!(tracker.restore(&mut view, false));
        assert_eq!(view.cursor, Cursor { row: 2, col: 5 });
        assert_eq!(tracker.remembered(&view.url), None);

        view.set_cursor(Cursor { row: 0, col: 0 });
        assert!(!tracker.restore(&mut view, false));
        assert_eq!(view.cursor.row, 0);
    }

    #[test]
    fn test_missing_entry_clears_memory_and_falls_back() {
        let mut view = view_with(&["a", "b"]);
        view.set_cursor(Cursor { row: 1, col: 0 });
        let mut tracker = CursorTracker::new();
        tracker.remember(&view.url, "gone");

        assert!(!tracker.restore(&mut view, false));
        assert_eq!(view.cursor.row, 1);
        assert_eq!(tracker.remembered(&view.url), None);

        tracker.remember(&view.url, "gone");
        assert!(tracker.restore(&mut view, true));
        assert_eq!(view.cursor, Cursor { row: 0, col: 5 });
    }

    #[test]
    fn test_constraint_modes() {
        let columns: Vec<Arc<dyn Column>> = vec![Arc::new(SizeColumn), Arc::new(PermissionsColumn)];
        let line = "/007 12B rw-r--r-- notes.md";

        assert_eq!(constrain_cursor(ConstrainMode::Off, line, &columns, 0), None);
        assert_eq!(constrain_cursor(ConstrainMode::Name, line, &columns, 2), Some(19));
        assert_eq!(constrain_cursor(ConstrainMode::Editable, line, &columns, 2), Some(9));
        assert_eq!(constrain_cursor(ConstrainMode::Editable, line, &columns, 12), None);
    }

    #[test]
    fn test_unparsable_line_is_left_alone() {
        assert_eq!(constrain_cursor(ConstrainMode::Name, "free text", &[], 0), None);
    }
}
