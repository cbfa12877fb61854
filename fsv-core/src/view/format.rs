//! src/view/format.rs
//! ============================================================================
//! # Listing line formatter
//!
//! Turns entries into rows of display chunks:
//!
//! ```text
//! /012 rw-r--r-- 1.2KiB notes.md
//! /013 rwxr-xr-x -      docs/
//! /014 rwxrwxrwx -      latest/ -> releases/v2/
//! ```
//!
//! The leading `/NNN` token is the entry id; it is the only thing needed to
//! map a line back to its entry, so it always comes first and is always
//! followed by a single space.

use std::sync::Arc;

use compact_str::{CompactString, format_compact};
use smallvec::SmallVec;

use crate::{
    model::{
        entry::{Entry, EntryId, EntryType},
        hidden::HiddenFilter,
        sort::Comparator,
    },
    view::{
        columns::{Chunk, Column},
        table::{RenderTable, RenderedListing},
    },
};

pub const ID_PREFIX: char = '/';

/// Minimum number of digits in the identity token.
const ID_DIGITS: usize = 3;

pub const DIR_SEPARATOR: char = '/';

pub const LINK_ARROW: &str = "->";

pub const STYLE_DIR: &str = "dir";
pub const STYLE_FILE: &str = "file";
pub const STYLE_LINK: &str = "link";
pub const STYLE_LINK_TARGET: &str = "link_target";
pub const STYLE_SOCKET: &str = "socket";

/// Appended to the name style of hidden entries that are displayed.
pub const HIDDEN_STYLE_SUFFIX: &str = "_hidden";

/// `/` followed by the id, zero padded to three digits.
#[must_use]
pub fn format_id(id: EntryId) -> CompactString {
    format_compact!("{ID_PREFIX}{id:0ID_DIGITS$}")
}

/// Read the identity token at the start of `line`.
///
/// Returns the id and the byte offset just past the digits.
#[must_use]
pub fn parse_id(line: &str) -> Option<(EntryId, usize)> {
    let digits = line.strip_prefix(ID_PREFIX)?;
    let len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }

    // Token must end the line or be followed by a space
    if digits.as_bytes().get(len).is_some_and(|&b| b != b' ') {
        return None;
    }

    let id = digits[..len].parse::<EntryId>().ok()?;
    Some((id, ID_PREFIX.len_utf8() + len))
}

/// One entry split into aligned column chunks and a free-width name region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedRow {
    pub id: EntryId,
    pub name: CompactString,
    /// Identity token followed by one chunk per configured column.
    pub columns: SmallVec<[Chunk; 8]>,
    /// Name, plus the arrow and target for links.
    pub name_chunks: SmallVec<[Chunk; 3]>,
}

#[must_use]
pub fn format_entry(entry: &Entry, columns: &[Arc<dyn Column>], hidden: bool) -> FormattedRow {
    let mut cells: SmallVec<[Chunk; 8]> = SmallVec::with_capacity(columns.len() + 1);
    cells.push(Chunk::plain(format_id(entry.id)));
    cells.extend(columns.iter().map(|column| column.render(entry)));

    let style = |base: &str| -> CompactString {
        if hidden {
            format_compact!("{base}{HIDDEN_STYLE_SUFFIX}")
        } else {
            CompactString::new(base)
        }
    };

    let mut name_chunks: SmallVec<[Chunk; 3]> = SmallVec::new();
    match entry.entry_type {
        EntryType::Directory => {
            name_chunks.push(Chunk::styled(
                format_compact!("{}{DIR_SEPARATOR}", entry.name),
                style(STYLE_DIR),
            ));
        }

        EntryType::File => name_chunks.push(Chunk::styled(entry.name.clone(), style(STYLE_FILE))),

        EntryType::Socket => {
            name_chunks.push(Chunk::styled(entry.name.clone(), style(STYLE_SOCKET)));
        }

        EntryType::Link => {
            let to_dir = entry.is_directory_like();
            let suffix = if to_dir { "/" } else { "" };
            name_chunks.push(Chunk::styled(
                format_compact!("{}{suffix}", entry.name),
                style(STYLE_LINK),
            ));

            if let Some(target) = &entry.meta.link {
                let target_text = if to_dir && !target.ends_with(DIR_SEPARATOR) {
                    format_compact!("{target}{DIR_SEPARATOR}")
                } else {
                    target.clone()
                };
                name_chunks.push(Chunk::plain(LINK_ARROW));
                name_chunks.push(Chunk::styled(target_text, STYLE_LINK_TARGET));
            }
        }
    }

    FormattedRow {
        id: entry.id,
        name: entry.name.clone(),
        columns: cells,
        name_chunks,
    }
}

/// Filter, sort and format a URL's entries into final lines.
///
/// The `..` row goes first when the filter lets it through.
pub fn build_listing<'a, I>(
    entries: I,
    columns: &[Arc<dyn Column>],
    comparator: &Comparator,
    filter: &HiddenFilter,
) -> RenderedListing
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut visible: Vec<(&Entry, bool)> = entries
        .into_iter()
        .filter_map(|entry: &Entry| {
            let vis = filter.should_display(entry);
            vis.display.then_some((entry, vis.hidden))
        })
        .collect();

    visible.sort_by(|(a, _), (b, _)| comparator.compare(a, b));

    let mut table = RenderTable::with_capacity(visible.len() + 1);

    let parent = Entry::parent_placeholder();
    let parent_vis = filter.should_display(&parent);
    if parent_vis.display {
        table.push(format_entry(&parent, columns, false));
    }

    for (entry, hidden) in visible {
        table.push(format_entry(entry, columns, hidden));
    }

    table.finish()
}
