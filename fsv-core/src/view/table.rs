//! src/view/table.rs
//! ============================================================================
//! # Render table
//!
//! Collects formatted rows, tracks the widest cell of every column, then
//! flushes everything into padded text lines plus a parallel list of style
//! spans. A table lives for exactly one render.

use compact_str::CompactString;

use crate::{model::entry::EntryId, view::format::FormattedRow};

/// Highlight for a byte range of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpan {
    pub row: usize,
    pub start: usize,
    pub end: usize,
    pub style: CompactString,
}

/// What a line of the view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: EntryId,
    pub name: CompactString,
    /// Byte offset where the name starts.
    pub name_col: usize,
}

/// Output of one render, ready to be written into a view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedListing {
    pub lines: Vec<String>,
    pub spans: Vec<StyleSpan>,
    pub rows: Vec<RenderedRow>,
}

impl RenderedListing {
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Row index of the entry called `name`.
    #[must_use]
    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.name == name)
    }
}

#[derive(Debug, Default)]
pub struct RenderTable {
    rows: Vec<FormattedRow>,
    widths: Vec<usize>,
}

impl RenderTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: Vec::with_capacity(rows),
            widths: Vec::new(),
        }
    }

    pub fn push(&mut self, row: FormattedRow) {
        if self.widths.len() < row.columns.len() {
            self.widths.resize(row.columns.len(), 0);
        }

        for (width, chunk) in self.widths.iter_mut().zip(&row.columns) {
            *width = (*width).max(chunk.width());
        }

        self.rows.push(row);
    }

    /// Widest cell seen so far in each column.
    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Pad, join and emit lines and spans.
    #[must_use]
    pub fn finish(self) -> RenderedListing {
        let mut listing = RenderedListing {
            lines: Vec::with_capacity(self.rows.len()),
            spans: Vec::new(),
            rows: Vec::with_capacity(self.rows.len()),
        };

        for (row_idx, row) in self.rows.into_iter().enumerate() {
            let mut line = String::with_capacity(64);

            for (col_idx, chunk) in row.columns.iter().enumerate() {
                let start = line.len();
                line.push_str(&chunk.text);
                if let Some(style) = &chunk.style {
                    listing.spans.push(StyleSpan {
                        row: row_idx,
                        start,
                        end: line.len(),
                        style: style.clone(),
                    });
                }

                let pad = self.widths[col_idx].saturating_sub(chunk.width());
                line.extend(std::iter::repeat_n(' ', pad));
                line.push(' ');
            }

            let name_col = line.len();
            for (idx, chunk) in row.name_chunks.iter().enumerate() {
                if idx > 0 {
                    line.push(' ');
                }
                let start = line.len();
                line.push_str(&chunk.text);
                if let Some(style) = &chunk.style {
                    listing.spans.push(StyleSpan {
                        row: row_idx,
                        start,
                        end: line.len(),
                        style: style.clone(),
                    });
                }
            }

            listing.lines.push(line);
            listing.rows.push(RenderedRow {
                id: row.id,
                name: row.name,
                name_col,
            });
        }

        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::columns::Chunk;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    fn row(id: EntryId, cells: &[&str], name: &str) -> FormattedRow {
        FormattedRow {
            id,
            name: CompactString::new(name),
            columns: cells.iter().map(|c| Chunk::plain(*c)).collect(),
            name_chunks: smallvec![Chunk::styled(name, "file")],
        }
    }

    #[test]
    fn test_columns_are_padded_to_widest_cell() {
        let mut table = RenderTable::new();
        table.push(row(1, &["/001", "12B"], "a"));
        table.push(row(22, &["/022", "1.5KiB"], "bb"));
        assert_eq!(table.widths(), [4, 6]);

        let listing = table.finish();
        assert_eq!(listing.lines, ["/001 12B    a", "/022 1.5KiB bb"]);
        assert_eq!(listing.rows[0].name_col, 12);
        assert_eq!(listing.rows[1].name_col, 12);
    }

    #[test]
    fn test_spans_cover_styled_chunks() {
        let mut table = RenderTable::new();
        table.push(FormattedRow {
            id: 3,
            name: CompactString::new("l"),
            columns: smallvec![Chunk::plain("/003"), Chunk::styled("rw-", "permissions")],
            name_chunks: smallvec![
                Chunk::styled("l", "link"),
                Chunk::plain("->"),
                Chunk::styled("t", "link_target"),
            ],
        });

        let listing = table.finish();
        assert_eq!(listing.lines[0], "/003 rw- l -> t");

        let spans: Vec<(usize, usize, &str)> = listing
            .spans
            .iter()
            .map(|s| (s.start, s.end, s.style.as_str()))
            .collect();
        assert_eq!(
            spans,
            [(5, 8, "permissions"), (9, 10, "link"), (14, 15, "link_target")]
        );
    }

    #[test]
    fn test_wide_characters_pad_by_display_width() {
        let mut table = RenderTable::new();
        table.push(row(1, &["/001", "日本"], "x"));
        table.push(row(2, &["/002", "ab"], "y"));

        let listing = table.finish();
        assert_eq!(listing.lines[1], "/002 ab   y");
        assert_eq!(listing.find_name("y"), Some(1));
    }
}
